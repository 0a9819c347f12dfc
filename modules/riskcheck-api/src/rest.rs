use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use riskcheck_client::{QueryOutcome, QuerySession, QueryState};
use riskcheck_common::{is_submittable, normalize_name, NormalizedKey, TrimMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::view::{ResultView, TopN};
use crate::AppState;

/// Header identifying the user session a query belongs to.
pub const SESSION_HEADER: &str = "x-riskcheck-session";

/// Session map size above which idle sessions are pruned.
const MAX_SESSIONS: usize = 1000;

#[derive(Deserialize)]
pub struct NormalizeRequest {
    valor: String,
    #[serde(default, rename = "final")]
    final_form: bool,
}

#[derive(Serialize)]
pub struct NormalizeResponse {
    valor: NormalizedKey,
    valido: bool,
}

/// Live-edit feedback: the input as the name field would show it, and whether it may be submitted.
pub async fn api_normalize_name(Json(body): Json<NormalizeRequest>) -> Json<NormalizeResponse> {
    let mode = if body.final_form {
        TrimMode::Final
    } else {
        TrimMode::Editing
    };
    let valor = normalize_name(&body.valor, mode);
    let valido = is_submittable(valor.as_str());
    Json(NormalizeResponse { valor, valido })
}

#[derive(Deserialize)]
pub struct ConsultaRiesgoRequest {
    nombre: String,
    top: Option<usize>,
}

pub async fn api_consulta_riesgo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ConsultaRiesgoRequest>,
) -> Response {
    let session = session_for(&state, &headers).await;
    let top = TopN::from_requested(body.top);

    match session.submit(&body.nombre).await {
        QueryOutcome::Completed(result) => Json(ResultView::build(&result, top)).into_response(),
        QueryOutcome::Failed(message) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response(),
        QueryOutcome::Superseded => {
            debug!("Consultation superseded by a newer one");
            (
                StatusCode::CONFLICT,
                Json(serde_json::json!({ "error": "superseded" })),
            )
                .into_response()
        }
        QueryOutcome::Ignored => StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    }
}

#[derive(Deserialize)]
pub struct CurrentQuery {
    top: Option<usize>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CurrentResponse {
    Idle,
    Loading,
    Ready { resultado: ResultView },
    Failed { error: String },
}

/// Current state of the caller's session.
pub async fn api_consulta_actual(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CurrentQuery>,
) -> Json<CurrentResponse> {
    let existing = match session_id(&headers) {
        Some(id) => state.sessions.lock().await.get(id).cloned(),
        None => None,
    };
    let Some(session) = existing else {
        return Json(CurrentResponse::Idle);
    };

    let response = match session.state().await {
        QueryState::Idle => CurrentResponse::Idle,
        QueryState::Loading => CurrentResponse::Loading,
        QueryState::Ready(result) => CurrentResponse::Ready {
            resultado: ResultView::build(&result, TopN::from_requested(params.top)),
        },
        QueryState::Failed(error) => CurrentResponse::Failed { error },
    };
    Json(response)
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Look up or create the caller's session. Requests without a session header get a
/// throwaway session, so they still run but cannot supersede anything.
async fn session_for(state: &AppState, headers: &HeaderMap) -> Arc<QuerySession> {
    let Some(id) = session_id(headers) else {
        return Arc::new(QuerySession::new(state.service.clone()));
    };

    let mut sessions = state.sessions.lock().await;
    if sessions.len() > MAX_SESSIONS {
        prune_idle_sessions(&mut sessions);
    }
    sessions
        .entry(id.to_string())
        .or_insert_with(|| {
            info!("Opening query session");
            Arc::new(QuerySession::new(state.service.clone()))
        })
        .clone()
}

/// Drop sessions nobody is currently waiting on.
///
/// A finished session goes too, result included, so its owner sees `idle` on
/// the next `/actual` read and has to submit again.
pub fn prune_idle_sessions(sessions: &mut HashMap<String, Arc<QuerySession>>) {
    sessions.retain(|_, session| Arc::strong_count(session) > 1);
}
