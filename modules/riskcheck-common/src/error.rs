use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskCheckError {
    #[error("Configuration error: {0}")]
    Config(String),
}
