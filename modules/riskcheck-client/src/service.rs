use std::path::PathBuf;
use std::sync::Arc;

use riskcheck_common::{
    is_submittable, normalize_final, normalize_response, Config, NormalizedKey,
    NormalizedRiskResult,
};
use tracing::{debug, info, warn};

use crate::backend::RiskBackend;
use crate::error::QueryError;

/// Known demo identity answered from the local fixture instead of the backend.
pub const DEMO_IDENTITY: &str = "GUSTAVO BOLIVAR";

const MOCK_NOTICE: &str = "Mock desactivado. Configura RISKCHECK_USE_MOCK=false para backend real.";

/// Runs one consultation: validation, then the demo fixture, mock mode, or the backend.
pub struct RiskQueryService {
    backend: Arc<dyn RiskBackend>,
    mock_mode: bool,
    fixture_path: PathBuf,
}

impl RiskQueryService {
    pub fn new(backend: Arc<dyn RiskBackend>, config: &Config) -> Self {
        Self {
            backend,
            mock_mode: config.mock_mode,
            fixture_path: config.fixture_path.clone(),
        }
    }

    /// Normalize raw input and run the consultation. Input too short to submit is
    /// rejected with `QueryError::InvalidInput` before anything else happens.
    pub async fn query(&self, raw_name: &str) -> Result<NormalizedRiskResult, QueryError> {
        let key = normalize_final(raw_name);
        if !is_submittable(key.as_str()) {
            return Err(QueryError::InvalidInput);
        }
        self.query_key(&key).await
    }

    /// Run the consultation for an already-normalized key.
    pub async fn query_key(&self, key: &NormalizedKey) -> Result<NormalizedRiskResult, QueryError> {
        if key.as_str() == DEMO_IDENTITY {
            info!(path = %self.fixture_path.display(), "Serving demo identity from fixture");
            return self.load_fixture().await;
        }

        if self.mock_mode {
            debug!("Mock mode enabled, skipping backend");
            return Ok(NormalizedRiskResult::notice(MOCK_NOTICE));
        }

        info!(key_len = key.as_str().len(), "Submitting risk consultation");
        match self.backend.consult(key).await {
            Ok(body) => {
                let result = normalize_response(&body);
                info!(
                    sentences = result.sentences.len(),
                    total = result.total_sentence_count,
                    has_reasoning = result.hidden_reasoning.is_some(),
                    "Risk consultation completed"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, "Risk consultation failed");
                Err(e.into())
            }
        }
    }

    async fn load_fixture(&self) -> Result<NormalizedRiskResult, QueryError> {
        let text = tokio::fs::read_to_string(&self.fixture_path)
            .await
            .map_err(|e| fixture_error(&self.fixture_path, e))?;
        let body: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| fixture_error(&self.fixture_path, e))?;
        Ok(normalize_response(&body))
    }
}

fn fixture_error(path: &std::path::Path, err: impl std::fmt::Display) -> QueryError {
    let err = QueryError::Fixture(format!("{}: {err}", path.display()));
    warn!(error = %err, "Could not load demo fixture");
    err
}
