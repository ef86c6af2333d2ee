// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregator::Aggregator;
use crate::collectors::CollectionContext;
use crate::config::AppConfig;
use crate::error::MonitorError;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) aggregator: Aggregator,
    /// Shared by one-shot requests so container CPU has a baseline between polls.
    /// Each WebSocket stream gets its own.
    pub(crate) ctx: Arc<CollectionContext>,
    pub(crate) config: AppConfig,
}

pub fn app(aggregator: Aggregator, config: AppConfig) -> Router {
    let state = AppState {
        aggregator,
        ctx: Arc::new(CollectionContext::new()),
        config,
    };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/all", get(http::all_handler)) // GET /api/all?top=N
        .route("/api/docker/{id}", get(http::container_handler)) // GET /api/docker/{id}
        .route("/api/{domain}", get(http::domain_handler)) // GET /api/cpu, /api/process?top=N, ...
        .route("/ws", get(ws::ws_stream)) // WS /ws?interval=S&top=N
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = match &self {
            MonitorError::Configuration(_) => StatusCode::BAD_REQUEST,
            MonitorError::SourceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            MonitorError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
