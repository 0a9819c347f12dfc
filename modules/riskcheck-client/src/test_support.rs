use std::sync::Mutex;

use async_trait::async_trait;
use riskcheck_common::NormalizedKey;
use serde_json::{json, Value};

use crate::{ConsultaError, Result, RiskBackend};

/// In-memory backend that records every key it is asked about.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    /// Consultations for this key never resolve.
    hold: Option<String>,
    /// Consultations for this key fail with a 500.
    fail: Option<String>,
}

impl FakeBackend {
    pub fn holding(key: &str) -> Self {
        Self {
            hold: Some(key.to_string()),
            ..Self::default()
        }
    }

    pub fn failing(key: &str) -> Self {
        Self {
            fail: Some(key.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RiskBackend for FakeBackend {
    async fn consult(&self, key: &NormalizedKey) -> Result<Value> {
        self.calls.lock().unwrap().push(key.to_string());

        if self.hold.as_deref() == Some(key.as_str()) {
            std::future::pending::<()>().await;
        }
        if self.fail.as_deref() == Some(key.as_str()) {
            return Err(ConsultaError::Api {
                status: 500,
                message: "upstream exploded".to_string(),
            });
        }

        Ok(json!({
            "data": {
                "informe": format!("<think>checking {key}</think>Informe de {key}"),
                "nivel_riesgo": {
                    "score_acumulado": {"Riesgo": 0.25, "Neutral": 0.5, "Irrelevante": 0.25},
                    "oraciones_riesgo": [[format!("sentence about {key}"), 0.9]]
                },
                "enlaces": {"web": ["https://example.org"]}
            }
        }))
    }
}
