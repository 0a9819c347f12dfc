use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use riskcheck_client::{ConsultaClient, QuerySession, RiskQueryService};
use riskcheck_common::Config;

mod rest;
mod view;

pub struct AppState {
    pub service: Arc<RiskQueryService>,
    pub sessions: Mutex<HashMap<String, Arc<QuerySession>>>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // REST API
        .route("/api/nombre/normalizar", post(rest::api_normalize_name))
        .route("/api/consulta-riesgo", post(rest::api_consulta_riesgo))
        .route("/api/consulta-riesgo/actual", get(rest::api_consulta_actual))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Names and reports are personal data: never cache
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        // Logging layer: method + path + status + latency only (no bodies)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("riskcheck=info".parse()?))
        .init();

    let config = Config::from_env()?;

    let client = ConsultaClient::new(&config.backend_url, config.request_timeout)?;
    info!(
        backend = %client.endpoint(),
        mock_mode = config.mock_mode,
        fixture = %config.fixture_path.display(),
        "Risk consultation backend configured"
    );

    let service = RiskQueryService::new(Arc::new(client), &config);
    let state = Arc::new(AppState {
        service: Arc::new(service),
        sessions: Mutex::new(HashMap::new()),
    });

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Risk check API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
