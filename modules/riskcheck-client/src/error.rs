use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConsultaError>;

/// Shown to the user for every failed consultation, whatever the cause.
pub const GENERIC_FAILURE_MESSAGE: &str = "No se pudo completar la consulta. Intenta de nuevo.";

/// Transport-level failures talking to the consultation backend.
#[derive(Debug, Error)]
pub enum ConsultaError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ConsultaError {
    fn from(err: reqwest::Error) -> Self {
        ConsultaError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ConsultaError {
    fn from(err: serde_json::Error) -> Self {
        ConsultaError::Parse(err.to_string())
    }
}

/// Failures of a whole query, from raw input to normalized result.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query key is too short to submit")]
    InvalidInput,

    #[error(transparent)]
    Consulta(#[from] ConsultaError),

    #[error("Fixture error: {0}")]
    Fixture(String),
}

impl QueryError {
    /// The localized message the user sees. Causes are deliberately not distinguished.
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}
