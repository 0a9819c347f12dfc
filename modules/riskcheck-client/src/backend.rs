use async_trait::async_trait;
use riskcheck_common::NormalizedKey;
use serde_json::Value;

use crate::{ConsultaClient, Result};

/// Anything that can answer a risk consultation with a raw JSON body.
#[async_trait]
pub trait RiskBackend: Send + Sync {
    async fn consult(&self, key: &NormalizedKey) -> Result<Value>;
}

#[async_trait]
impl RiskBackend for ConsultaClient {
    async fn consult(&self, key: &NormalizedKey) -> Result<Value> {
        ConsultaClient::consult(self, key).await
    }
}
