//! Per-user query lifecycle with last-request-wins semantics.
//!
//! Every accepted submission gets a new generation number. Starting a new
//! generation cancels the in-flight one (its future is dropped mid-request),
//! and a finished query installs its result only if it is still the latest.
//! A latest query whose future is dropped before finishing returns the session
//! to `Idle`.

use std::sync::{Arc, Mutex, MutexGuard};

use riskcheck_common::{is_submittable, normalize_final, NormalizedRiskResult};
use tokio::sync::watch;
use tracing::debug;

use crate::service::RiskQueryService;

/// What the user currently sees.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    Idle,
    Loading,
    Ready(Arc<NormalizedRiskResult>),
    /// Generic user-facing failure message. Any previous result is gone.
    Failed(String),
}

/// How a single `submit` call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Completed(Arc<NormalizedRiskResult>),
    Failed(String),
    /// A newer submission took over before this one finished.
    Superseded,
    /// Input was not submittable; nothing happened.
    Ignored,
}

struct Inner {
    generation: u64,
    state: QueryState,
}

/// Resets `Loading` to `Idle` if the owning query is dropped while still the latest.
struct PendingQuery<'a> {
    inner: &'a Mutex<Inner>,
    generation: u64,
    armed: bool,
}

impl PendingQuery<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingQuery<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = lock(self.inner);
        if inner.generation == self.generation && inner.state == QueryState::Loading {
            debug!(generation = self.generation, "Query dropped before finishing");
            inner.state = QueryState::Idle;
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct QuerySession {
    service: Arc<RiskQueryService>,
    inner: Mutex<Inner>,
    latest: watch::Sender<u64>,
}

impl QuerySession {
    pub fn new(service: Arc<RiskQueryService>) -> Self {
        let (latest, _) = watch::channel(0);
        Self {
            service,
            inner: Mutex::new(Inner {
                generation: 0,
                state: QueryState::Idle,
            }),
            latest,
        }
    }

    pub async fn state(&self) -> QueryState {
        lock(&self.inner).state.clone()
    }

    pub async fn is_loading(&self) -> bool {
        matches!(lock(&self.inner).state, QueryState::Loading)
    }

    /// Submit raw user input. Resolves once this query finishes or is superseded.
    pub async fn submit(&self, raw_name: &str) -> QueryOutcome {
        let key = normalize_final(raw_name);
        if !is_submittable(key.as_str()) {
            return QueryOutcome::Ignored;
        }

        let (generation, mut latest) = {
            let mut inner = lock(&self.inner);
            inner.generation += 1;
            inner.state = QueryState::Loading;
            self.latest.send_replace(inner.generation);
            (inner.generation, self.latest.subscribe())
        };
        debug!(generation, "Query started");
        let mut pending = PendingQuery {
            inner: &self.inner,
            generation,
            armed: true,
        };

        let superseded = async {
            loop {
                if *latest.borrow_and_update() != generation {
                    return;
                }
                if latest.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };

        let result = tokio::select! {
            result = self.service.query_key(&key) => result,
            _ = superseded => {
                debug!(generation, "Query superseded, request dropped");
                return QueryOutcome::Superseded;
            }
        };

        pending.disarm();
        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "Discarding stale result");
            return QueryOutcome::Superseded;
        }

        match result {
            Ok(result) => {
                let result = Arc::new(result);
                inner.state = QueryState::Ready(result.clone());
                QueryOutcome::Completed(result)
            }
            Err(e) => {
                let message = e.user_message().to_string();
                inner.state = QueryState::Failed(message.clone());
                QueryOutcome::Failed(message)
            }
        }
    }
}
