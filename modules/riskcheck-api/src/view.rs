use riskcheck_common::{detail_section, NormalizedRiskResult};
use serde::Serialize;

/// How many risk sentences the results table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "usize")]
pub enum TopN {
    #[default]
    Three,
    Five,
    Ten,
}

impl TopN {
    /// Anything other than 3, 5 or 10 falls back to the default.
    pub fn from_requested(requested: Option<usize>) -> Self {
        match requested {
            Some(5) => TopN::Five,
            Some(10) => TopN::Ten,
            _ => TopN::Three,
        }
    }

    pub fn count(self) -> usize {
        match self {
            TopN::Three => 3,
            TopN::Five => 5,
            TopN::Ten => 10,
        }
    }
}

impl From<TopN> for usize {
    fn from(top: TopN) -> usize {
        top.count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub label: &'static str,
    pub value: f64,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentenceRow {
    pub rank: usize,
    pub text: String,
    pub score: f64,
    /// Score as a percentage bar width, clamped to 0..=100.
    pub percent: f64,
    pub percent_display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkCard {
    pub kind: &'static str,
    pub title: &'static str,
    pub count: usize,
    pub items: Vec<String>,
}

/// What the query screen renders for a result. The hidden reasoning block is
/// never part of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub scores: Vec<ScoreCard>,
    pub top: TopN,
    pub sentences: Vec<SentenceRow>,
    pub total_sentences: usize,
    pub report: String,
    pub links: Vec<LinkCard>,
}

impl ResultView {
    pub fn build(result: &NormalizedRiskResult, top: TopN) -> Self {
        let scores = [
            ("Riesgo", result.scores.risk),
            ("Neutral", result.scores.neutral),
            ("Irrelevante", result.scores.irrelevant),
        ]
        .into_iter()
        .map(|(label, value)| ScoreCard {
            label,
            value,
            display: format!("{value:.2}"),
        })
        .collect();

        let sentences = result
            .sentences
            .iter()
            .take(top.count())
            .enumerate()
            .map(|(i, s)| {
                let percent = score_percent(s.score);
                SentenceRow {
                    rank: i + 1,
                    text: s.text.clone(),
                    score: s.score,
                    percent,
                    percent_display: format!("{percent:.1}%"),
                }
            })
            .collect();

        let links = [
            ("web", "Fuentes Web", &result.links.web),
            ("social", "Redes Sociales", &result.links.social),
            ("gov", "Gobierno", &result.links.government),
            ("media", "Medios", &result.links.media),
        ]
        .into_iter()
        .filter(|(_, _, items)| !items.is_empty())
        .map(|(kind, title, items)| LinkCard {
            kind,
            title,
            count: items.len(),
            items: items.clone(),
        })
        .collect();

        Self {
            scores,
            top,
            sentences,
            total_sentences: result.total_sentence_count,
            report: detail_section(&result.public_report).to_string(),
            links,
        }
    }
}

/// Display-only clamp; the stored score is left alone.
pub fn score_percent(score: f64) -> f64 {
    (score * 100.0).clamp(0.0, 100.0)
}
