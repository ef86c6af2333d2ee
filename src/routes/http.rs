// GET handlers: version, one domain, all domains, one container

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::error::MonitorError;
use crate::models::Domain;

#[derive(Debug, Deserialize)]
pub(super) struct TopQuery {
    top: Option<usize>,
}

impl TopQuery {
    /// Requested top-N, or the configured default; out-of-range is a 400.
    fn resolve(&self, state: &AppState) -> Result<usize, MonitorError> {
        let max = state.config.monitoring.max_top_n;
        match self.top {
            None => Ok(state.config.monitoring.default_top_n),
            Some(n) if (1..=max).contains(&n) => Ok(n),
            Some(n) => Err(MonitorError::Configuration(format!(
                "top must be between 1 and {}, got {}",
                max, n
            ))),
        }
    }
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/all: every domain in one composite snapshot.
pub(super) async fn all_handler(
    State(state): State<AppState>,
    Query(q): Query<TopQuery>,
) -> Result<Response, MonitorError> {
    let top_n = q.resolve(&state)?;
    let snapshot = state.aggregator.collect_all(&state.ctx, top_n).await;
    Ok(Json(snapshot).into_response())
}

/// GET /api/{domain}
pub(super) async fn domain_handler(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(q): Query<TopQuery>,
) -> Result<Response, MonitorError> {
    let Ok(domain) = domain.parse::<Domain>() else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown domain: {}", domain) })),
        )
            .into_response());
    };
    let top_n = q.resolve(&state)?;
    let snapshot = state
        .aggregator
        .collect_domain(&state.ctx, domain, top_n)
        .await?;
    Ok(Json(snapshot).into_response())
}

/// GET /api/docker/{id}: full id or any unique-enough prefix.
pub(super) async fn container_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, MonitorError> {
    match state.aggregator.container_detail(&state.ctx, &id).await? {
        Some(container) => Ok(Json(container).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("no container matches {}", id) })),
        )
            .into_response()),
    }
}
