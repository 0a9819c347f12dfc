//! Turns the loosely-shaped consultation payload into a [`NormalizedRiskResult`].
//!
//! Nothing in here fails. Missing sections degrade to defaults, and malformed
//! values are defaulted too but recorded as [`CoercionWarning`]s so upstream
//! contract drift stays visible in the logs.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::types::{NormalizedRiskResult, RiskLinks, RiskScores, RiskSentence};

// Wire contract of the consultation backend.
const KEY_REPORT: &str = "informe";
const KEY_REPORT_PUBLIC: &str = "informe_publico";
const KEY_RISK_LEVEL: &str = "nivel_riesgo";
const KEY_SCORES: &str = "score_acumulado";
const KEY_SCORE_RISK: &str = "Riesgo";
const KEY_SCORE_NEUTRAL: &str = "Neutral";
const KEY_SCORE_IRRELEVANT: &str = "Irrelevante";
const KEY_SENTENCES: &str = "oraciones_riesgo";
const KEY_SENTENCE_COUNT: &str = "total_oraciones";
const KEY_LINKS: &str = "enlaces";

/// Where the payload may sit inside the response body, in priority order.
const PAYLOAD_PATHS: &[&[&str]] = &[&[], &["data"], &["result"]];

const MAX_FOUND_LEN: usize = 80;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>\s*(.*?)\s*</think>").expect("valid regex"));

/// An opening tag whose block was cut off before the closing tag.
static THINK_UNTERMINATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>\s*(.*)\z").expect("valid regex"));

/// Narrative split into what may be shown and the hidden reasoning block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningSplit {
    pub public_text: String,
    pub hidden: Option<String>,
}

/// A malformed value that was replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoercionWarning {
    /// Dotted path of the offending value, e.g. `nivel_riesgo.oraciones_riesgo[2].score`.
    pub field: String,
    /// Compact rendering of what was found, truncated.
    pub found: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationReport {
    pub result: NormalizedRiskResult,
    pub warnings: Vec<CoercionWarning>,
}

/// Separate the `<think>` block from the narrative.
///
/// A closed block is cut out wherever it sits; an unterminated one swallows the
/// rest of the text. Text without any marker is returned untouched.
pub fn split_reasoning(text: Option<&str>) -> ReasoningSplit {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => {
            return ReasoningSplit {
                public_text: String::new(),
                hidden: None,
            }
        }
    };

    if let Some(caps) = THINK_BLOCK.captures(text) {
        return ReasoningSplit {
            public_text: THINK_BLOCK.replacen(text, 1, "").trim().to_string(),
            hidden: Some(caps[1].trim().to_string()),
        };
    }

    if let Some(caps) = THINK_UNTERMINATED.captures(text) {
        let start = caps.get(0).map_or(0, |m| m.start());
        return ReasoningSplit {
            public_text: text[..start].trim().to_string(),
            hidden: Some(caps[1].trim().to_string()),
        };
    }

    ReasoningSplit {
        public_text: text.to_string(),
        hidden: None,
    }
}

/// Locate the payload inside a response body that may wrap it under `data` or `result`.
pub fn extract_payload(body: &Value) -> &Value {
    let candidates = move || PAYLOAD_PATHS.iter().filter_map(move |path| resolve(body, path));

    candidates()
        .find(|candidate| looks_like_payload(candidate))
        .or_else(|| candidates().skip(1).find(|candidate| candidate.is_object()))
        .unwrap_or(body)
}

/// Normalize a response body, logging any defaulted malformed values.
pub fn normalize_response(body: &Value) -> NormalizedRiskResult {
    let report = normalize_response_with_diagnostics(body);
    for warning in &report.warnings {
        tracing::warn!(
            field = %warning.field,
            found = %warning.found,
            "Defaulted malformed value in consultation payload"
        );
    }
    report.result
}

/// Normalize a response body and return the diagnostics alongside the result.
pub fn normalize_response_with_diagnostics(body: &Value) -> NormalizationReport {
    let payload = extract_payload(body);
    let mut normalizer = Normalizer::default();
    let result = normalizer.normalize(payload);
    NormalizationReport {
        result,
        warnings: normalizer.warnings,
    }
}

/// Normalize a bare risk-sentence list: `[text, score]` pairs, `{text, score}`
/// records, or anything else as text with score 0. Non-lists yield nothing.
pub fn normalize_sentences(value: &Value) -> Vec<RiskSentence> {
    Normalizer::default().sentences(Some(value))
}

fn resolve<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |value, key| value.get(key))
}

fn looks_like_payload(value: &Value) -> bool {
    value.is_object()
        && (value.get(KEY_REPORT).is_some_and(is_truthy)
            || value.get(KEY_RISK_LEVEL).is_some_and(is_truthy))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Outcome of reading a number out of an arbitrary JSON value.
enum NumberRead {
    Absent,
    Finite(f64),
    Malformed,
}

fn read_number(value: Option<&Value>) -> NumberRead {
    match value {
        None | Some(Value::Null) => NumberRead::Absent,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.is_finite() => NumberRead::Finite(f),
            _ => NumberRead::Malformed,
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return NumberRead::Finite(0.0);
            }
            match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => NumberRead::Finite(f),
                _ => NumberRead::Malformed,
            }
        }
        Some(Value::Bool(b)) => NumberRead::Finite(if *b { 1.0 } else { 0.0 }),
        Some(_) => NumberRead::Malformed,
    }
}

fn render_found(value: &Value) -> String {
    let rendered = value.to_string();
    match rendered.char_indices().nth(MAX_FOUND_LEN) {
        Some((cut, _)) => format!("{}...", &rendered[..cut]),
        None => rendered,
    }
}

#[derive(Default)]
struct Normalizer {
    warnings: Vec<CoercionWarning>,
}

impl Normalizer {
    fn normalize(&mut self, payload: &Value) -> NormalizedRiskResult {
        let narrative = self.narrative(payload);
        let split = split_reasoning(narrative.as_deref());

        let risk_level = payload.get(KEY_RISK_LEVEL);
        let scores = self.scores(risk_level.and_then(|r| r.get(KEY_SCORES)));
        let sentences = self.sentences(risk_level.and_then(|r| r.get(KEY_SENTENCES)));
        let total_sentence_count = self.sentence_count(
            risk_level.and_then(|r| r.get(KEY_SENTENCE_COUNT)),
            sentences.len(),
        );
        let links = self.links(payload.get(KEY_LINKS));

        NormalizedRiskResult {
            raw_report: narrative.unwrap_or_default(),
            public_report: split.public_text,
            hidden_reasoning: split.hidden,
            scores,
            sentences,
            total_sentence_count,
            links,
        }
    }

    fn warn(&mut self, field: impl Into<String>, found: &Value) {
        self.warnings.push(CoercionWarning {
            field: field.into(),
            found: render_found(found),
        });
    }

    /// `informe`, falling back to `informe_publico` as used by stored fixtures.
    fn narrative(&mut self, payload: &Value) -> Option<String> {
        for key in [KEY_REPORT, KEY_REPORT_PUBLIC] {
            match payload.get(key) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) => return Some(s.clone()),
                Some(other) => self.warn(key, other),
            }
        }
        None
    }

    fn number(&mut self, field: impl Into<String>, value: Option<&Value>) -> f64 {
        match read_number(value) {
            NumberRead::Absent => 0.0,
            NumberRead::Finite(f) => f,
            NumberRead::Malformed => {
                if let Some(found) = value {
                    self.warn(field, found);
                }
                0.0
            }
        }
    }

    fn text(&mut self, field: impl Into<String>, value: Option<&Value>) -> String {
        let text = match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => {
                self.warn(field, other);
                other.to_string()
            }
        };
        text.trim().to_string()
    }

    fn scores(&mut self, value: Option<&Value>) -> RiskScores {
        let field = |key: &str| format!("{KEY_RISK_LEVEL}.{KEY_SCORES}.{key}");
        RiskScores {
            risk: self.number(field(KEY_SCORE_RISK), value.and_then(|v| v.get(KEY_SCORE_RISK))),
            neutral: self.number(
                field(KEY_SCORE_NEUTRAL),
                value.and_then(|v| v.get(KEY_SCORE_NEUTRAL)),
            ),
            irrelevant: self.number(
                field(KEY_SCORE_IRRELEVANT),
                value.and_then(|v| v.get(KEY_SCORE_IRRELEVANT)),
            ),
        }
    }

    fn sentences(&mut self, value: Option<&Value>) -> Vec<RiskSentence> {
        let items = match value {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => return Vec::new(),
            Some(other) => {
                self.warn(format!("{KEY_RISK_LEVEL}.{KEY_SENTENCES}"), other);
                return Vec::new();
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let field = format!("{KEY_RISK_LEVEL}.{KEY_SENTENCES}[{i}]");
                match item {
                    Value::Array(pair) => RiskSentence {
                        text: self.text(format!("{field}[0]"), pair.first()),
                        score: self.number(format!("{field}[1]"), pair.get(1)),
                    },
                    Value::Object(record) => RiskSentence {
                        text: self.text(format!("{field}.text"), record.get("text")),
                        score: self.number(format!("{field}.score"), record.get("score")),
                    },
                    other => RiskSentence {
                        text: self.text(field, Some(other)),
                        score: 0.0,
                    },
                }
            })
            .collect()
    }

    fn sentence_count(&mut self, value: Option<&Value>, fallback: usize) -> usize {
        match read_number(value) {
            NumberRead::Absent => fallback,
            NumberRead::Finite(f) if f >= 0.0 => f as usize,
            _ => {
                if let Some(found) = value {
                    self.warn(format!("{KEY_RISK_LEVEL}.{KEY_SENTENCE_COUNT}"), found);
                }
                fallback
            }
        }
    }

    fn links(&mut self, value: Option<&Value>) -> RiskLinks {
        RiskLinks {
            web: self.link_list(value, "web"),
            social: self.link_list(value, "social"),
            government: self.link_list(value, "gov"),
            media: self.link_list(value, "media"),
        }
    }

    fn link_list(&mut self, links: Option<&Value>, key: &str) -> Vec<String> {
        let field = format!("{KEY_LINKS}.{key}");
        match links.and_then(|l| l.get(key)) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(url) => url.clone(),
                    other => self.text(format!("{field}[{i}]"), Some(other)),
                })
                .collect(),
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                self.warn(field, other);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // --- split_reasoning ---

    #[test]
    fn closed_block_is_cut_out() {
        let split = split_reasoning(Some("A<think>secret</think>B"));
        assert_eq!(split.public_text, "AB");
        assert_eq!(split.hidden.as_deref(), Some("secret"));
    }

    #[test]
    fn text_without_marker_is_untouched() {
        let split = split_reasoning(Some("  no marker here \n"));
        assert_eq!(split.public_text, "  no marker here \n");
        assert_eq!(split.hidden, None);
    }

    #[test]
    fn unterminated_block_runs_to_end() {
        let split = split_reasoning(Some("start<think>open ended"));
        assert_eq!(split.public_text, "start");
        assert_eq!(split.hidden.as_deref(), Some("open ended"));
    }

    #[test]
    fn tags_match_case_insensitively_across_lines() {
        let split = split_reasoning(Some("<THINK>\n  step one\n  step two\n</Think>\n\n# Informe\nBody"));
        assert_eq!(split.public_text, "# Informe\nBody");
        assert_eq!(split.hidden.as_deref(), Some("step one\n  step two"));
    }

    #[test]
    fn only_first_closed_block_is_removed() {
        let split = split_reasoning(Some("a<think>x</think>b<think>y</think>c"));
        assert_eq!(split.public_text, "ab<think>y</think>c");
        assert_eq!(split.hidden.as_deref(), Some("x"));
    }

    #[test]
    fn stray_closing_tag_is_not_a_block() {
        let split = split_reasoning(Some("text</think>"));
        assert_eq!(split.public_text, "text</think>");
        assert_eq!(split.hidden, None);
    }

    #[test]
    fn absent_or_empty_narrative_is_empty_public_text() {
        for input in [None, Some("")] {
            let split = split_reasoning(input);
            assert_eq!(split.public_text, "");
            assert_eq!(split.hidden, None);
        }
    }

    // --- extract_payload ---

    #[test]
    fn direct_payload_is_used_as_is() {
        let body = json!({"informe": "x", "data": {"informe": "y"}});
        assert_eq!(extract_payload(&body)["informe"], "x");
    }

    #[test]
    fn data_and_result_wrappers_are_unwrapped() {
        let body = json!({"data": {"informe": "from data"}});
        assert_eq!(extract_payload(&body)["informe"], "from data");

        let body = json!({"result": {"nivel_riesgo": {}}, "status": "ok"});
        assert!(extract_payload(&body).get("nivel_riesgo").is_some());
    }

    #[test]
    fn data_wins_over_result_when_both_carry_payloads() {
        let body = json!({"data": {"informe": "d"}, "result": {"informe": "r"}});
        assert_eq!(extract_payload(&body)["informe"], "d");
    }

    #[test]
    fn unrecognized_body_falls_back_to_root() {
        let body = json!({"something": "else"});
        assert_eq!(extract_payload(&body), &body);
    }

    #[test]
    fn scalar_wrapper_is_not_a_payload() {
        let body = json!({"data": "ok", "enlaces": {"web": ["https://x"]}});
        assert_eq!(extract_payload(&body), &body);
        assert_eq!(normalize_response(&body).links.web, vec!["https://x"]);
    }

    #[test]
    fn object_wrapper_without_payload_keys_is_still_unwrapped() {
        let body = json!({"data": "ok", "result": {"enlaces": {"media": ["https://m"]}}});
        assert_eq!(normalize_response(&body).links.media, vec!["https://m"]);
    }

    // --- normalize_response ---

    #[test]
    fn empty_object_is_fully_defaulted() {
        let result = normalize_response(&json!({}));
        assert_eq!(result.scores, RiskScores::default());
        assert!(result.sentences.is_empty());
        assert_eq!(result.total_sentence_count, 0);
        assert_eq!(result.links, RiskLinks::default());
        assert!(result.links.is_empty());
        assert_eq!(result.hidden_reasoning, None);
        assert_eq!(result.public_report, "");
        assert_eq!(result.raw_report, "");
    }

    #[test]
    fn non_object_bodies_are_fully_defaulted() {
        for body in [json!(null), json!([1, 2]), json!("informe"), json!(42)] {
            assert_eq!(normalize_response(&body), NormalizedRiskResult::default());
        }
    }

    #[test]
    fn mixed_sentence_shapes_keep_order_and_coerce_scores() {
        let body = json!({
            "nivel_riesgo": {
                "oraciones_riesgo": [["alpha", 0.7], {"text": "beta", "score": "0.3"}]
            }
        });
        let result = normalize_response(&body);
        assert_eq!(
            result.sentences,
            vec![
                RiskSentence { text: "alpha".into(), score: 0.7 },
                RiskSentence { text: "beta".into(), score: 0.3 },
            ]
        );
        assert_eq!(result.total_sentence_count, 2);
    }

    #[test]
    fn odd_sentence_items_degrade_without_failing() {
        let body = json!({
            "nivel_riesgo": {
                "oraciones_riesgo": [
                    "bare sentence",
                    [42],
                    {"score": 0.5},
                    ["  padded  ", "not a number"],
                    null,
                    [true, false]
                ]
            }
        });
        let report = normalize_response_with_diagnostics(&body);
        let sentences = &report.result.sentences;

        assert_eq!(sentences.len(), 6);
        assert_eq!(sentences[0], RiskSentence { text: "bare sentence".into(), score: 0.0 });
        assert_eq!(sentences[1], RiskSentence { text: "42".into(), score: 0.0 });
        assert_eq!(sentences[2], RiskSentence { text: String::new(), score: 0.5 });
        assert_eq!(sentences[3], RiskSentence { text: "padded".into(), score: 0.0 });
        assert_eq!(sentences[4], RiskSentence { text: String::new(), score: 0.0 });
        assert_eq!(sentences[5], RiskSentence { text: "true".into(), score: 0.0 });

        assert_eq!(
            report.warnings,
            vec![CoercionWarning {
                field: "nivel_riesgo.oraciones_riesgo[3][1]".into(),
                found: "\"not a number\"".into(),
            }]
        );
    }

    #[test]
    fn bare_sentence_list_normalizes_on_its_own() {
        let sentences = normalize_sentences(&json!([["alpha", 0.7], {"text": "beta", "score": "0.3"}]));
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1].score, 0.3);
        assert!(normalize_sentences(&json!("alpha")).is_empty());
    }

    #[test]
    fn non_list_sentences_become_empty() {
        let body = json!({"nivel_riesgo": {"oraciones_riesgo": {"text": "x"}}});
        let report = normalize_response_with_diagnostics(&body);
        assert!(report.result.sentences.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn scores_are_coerced_and_never_nan() {
        let body = json!({
            "nivel_riesgo": {
                "score_acumulado": {"Riesgo": "0.42", "Neutral": "NaN", "Irrelevante": {"v": 1}}
            }
        });
        let report = normalize_response_with_diagnostics(&body);
        let scores = report.result.scores;
        assert_eq!(scores.risk, 0.42);
        assert_eq!(scores.neutral, 0.0);
        assert_eq!(scores.irrelevant, 0.0);
        assert!(scores.risk.is_finite() && scores.neutral.is_finite() && scores.irrelevant.is_finite());

        let fields: Vec<_> = report.warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "nivel_riesgo.score_acumulado.Neutral",
                "nivel_riesgo.score_acumulado.Irrelevante"
            ]
        );
    }

    #[test]
    fn scores_are_not_clamped() {
        let body = json!({"nivel_riesgo": {"score_acumulado": {"Riesgo": 3.5, "Neutral": -1}}});
        let scores = normalize_response(&body).scores;
        assert_eq!(scores.risk, 3.5);
        assert_eq!(scores.neutral, -1.0);
    }

    #[test]
    fn explicit_sentence_count_wins_over_list_length() {
        let body = json!({
            "nivel_riesgo": {"oraciones_riesgo": [["a", 1]], "total_oraciones": "57"}
        });
        assert_eq!(normalize_response(&body).total_sentence_count, 57);

        let body = json!({
            "nivel_riesgo": {"oraciones_riesgo": [["a", 1]], "total_oraciones": "many"}
        });
        assert_eq!(normalize_response(&body).total_sentence_count, 1);
    }

    #[test]
    fn links_are_kept_as_is_and_default_to_empty() {
        let body = json!({
            "enlaces": {
                "web": ["https://a.example", "https://a.example", "not a url"],
                "gov": ["https://gov.example"],
                "media": "https://media.example"
            }
        });
        let links = normalize_response(&body).links;
        assert_eq!(links.web, vec!["https://a.example", "https://a.example", "not a url"]);
        assert!(links.social.is_empty());
        assert_eq!(links.government, vec!["https://gov.example"]);
        assert!(links.media.is_empty());
    }

    #[test]
    fn narrative_reasoning_is_kept_out_of_public_report() {
        let body = json!({
            "data": {
                "informe": "<think>weighing sources</think>\n# Informe Detallado\nSin hallazgos."
            }
        });
        let result = normalize_response(&body);
        assert_eq!(result.public_report, "# Informe Detallado\nSin hallazgos.");
        assert_eq!(result.hidden_reasoning.as_deref(), Some("weighing sources"));
        assert!(result.raw_report.starts_with("<think>"));
        assert!(!result.public_report.contains("weighing"));
    }

    #[test]
    fn public_report_key_is_a_fallback_narrative() {
        let body = json!({"informe_publico": "stored report"});
        assert_eq!(normalize_response(&body).public_report, "stored report");

        let body = json!({"informe": "live", "informe_publico": "stored"});
        assert_eq!(normalize_response(&body).public_report, "live");
    }

    #[test]
    fn long_found_values_are_truncated() {
        let long = "x".repeat(500);
        let body = json!({"nivel_riesgo": {"score_acumulado": {"Riesgo": long}}});
        let report = normalize_response_with_diagnostics(&body);
        assert!(report.warnings[0].found.len() < 100);
        assert!(report.warnings[0].found.ends_with("..."));
    }
}
