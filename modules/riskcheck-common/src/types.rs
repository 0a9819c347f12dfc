use serde::{Deserialize, Serialize};

/// The three accumulated score categories reported by the consultation backend.
/// Stored exactly as received; display code clamps on its own.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskScores {
    pub risk: f64,
    pub neutral: f64,
    pub irrelevant: f64,
}

/// A passage that contributed to the risk assessment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskSentence {
    pub text: String,
    pub score: f64,
}

/// Reference URLs grouped by source category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskLinks {
    pub web: Vec<String>,
    pub social: Vec<String>,
    pub government: Vec<String>,
    pub media: Vec<String>,
}

impl RiskLinks {
    pub fn is_empty(&self) -> bool {
        self.web.is_empty()
            && self.social.is_empty()
            && self.government.is_empty()
            && self.media.is_empty()
    }
}

/// Strictly-typed result of one consultation. Every field is always populated,
/// and every number is finite.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRiskResult {
    /// Narrative as received, including any reasoning block.
    pub raw_report: String,
    /// Narrative with the reasoning block removed.
    pub public_report: String,
    /// Content of the reasoning block, hidden by default.
    pub hidden_reasoning: Option<String>,
    pub scores: RiskScores,
    pub sentences: Vec<RiskSentence>,
    pub total_sentence_count: usize,
    pub links: RiskLinks,
}

impl NormalizedRiskResult {
    /// A result carrying only a public notice, everything else defaulted.
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            public_report: message.into(),
            ..Self::default()
        }
    }
}
