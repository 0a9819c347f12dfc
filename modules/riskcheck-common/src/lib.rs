pub mod config;
pub mod error;
pub mod name;
pub mod report;
pub mod response;
pub mod types;

pub use config::Config;
pub use error::RiskCheckError;
pub use name::{
    is_submittable, normalize_final, normalize_for_editing, normalize_name, NormalizedKey, TrimMode,
    MIN_QUERY_LEN,
};
pub use report::{detail_section, DETAIL_HEADING};
pub use response::{
    extract_payload, normalize_response, normalize_response_with_diagnostics, normalize_sentences,
    split_reasoning,
    CoercionWarning, NormalizationReport, ReasoningSplit,
};
pub use types::*;
