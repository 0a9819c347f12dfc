pub mod backend;
pub mod error;
pub mod service;
pub mod session;
pub mod types;

#[cfg(test)]
mod test_support;

pub use backend::RiskBackend;
pub use error::{ConsultaError, QueryError, Result, GENERIC_FAILURE_MESSAGE};
pub use service::{RiskQueryService, DEMO_IDENTITY};
pub use session::{QueryOutcome, QuerySession, QueryState};
pub use types::ConsultaRequest;

use std::time::Duration;

use riskcheck_common::NormalizedKey;
use serde_json::Value;

pub struct ConsultaClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ConsultaClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the key to the consultation endpoint and return the raw JSON body.
    /// Shape checking is left to the response normalizer.
    pub async fn consult(&self, key: &NormalizedKey) -> Result<Value> {
        let body = ConsultaRequest {
            consulta: key.as_str(),
        };

        tracing::debug!(endpoint = %self.endpoint, "Sending risk consultation");

        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        tracing::debug!(status = status.as_u16(), "Consultation responded");

        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ConsultaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
