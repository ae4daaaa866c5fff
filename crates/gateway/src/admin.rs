//! Admin HTTP surface: a small `axum` API for approvals and cache
//! inspection, bound on its own port separate from the agent-facing
//! JSON-RPC front door. Guarded by the `MUX_ADMIN_TOKEN` environment
//! variable; unset or empty means dev mode (no auth).

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use mux_domain::model::ApproverType;
use mux_downstream::DownstreamManager;
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/approvals/pending", get(list_pending_approvals))
        .route("/v1/approvals/:id/resolve", post(resolve_approval))
        .route("/v1/cache/stats", get(cache_stats))
        .route("/v1/cache/flush", post(cache_flush))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Constant-time comparison against `MUX_ADMIN_TOKEN`. No token configured
/// means dev mode: every request is allowed through.
fn check_admin_token(headers: &HeaderMap) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    let expected = match std::env::var("MUX_ADMIN_TOKEN") {
        Ok(t) if !t.is_empty() => t,
        _ => return Ok(()),
    };
    let provided = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    if provided.len() != expected.len() {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid admin token" }))));
    }
    let equal = provided
        .as_bytes()
        .iter()
        .zip(expected.as_bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    if equal != 0 {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid admin token" }))));
    }
    Ok(())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "downstream_servers": state.downstream.server_count(),
        "downstream_tools": state.downstream.tool_count(),
    }))
}

async fn list_pending_approvals(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(rejection) = check_admin_token(&headers) {
        return rejection.into_response();
    }
    Json(state.approval_store.list_pending()).into_response()
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    approved: bool,
    reason: Option<String>,
}

async fn resolve_approval(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ResolveRequest>,
) -> impl IntoResponse {
    if let Err(rejection) = check_admin_token(&headers) {
        return rejection.into_response();
    }
    match state
        .approvals
        .resolve(&id, "dashboard", ApproverType::Dashboard, body.approved, body.reason)
    {
        Ok(()) => Json(json!({ "resolved": true })).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

async fn cache_stats(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(rejection) = check_admin_token(&headers) {
        return rejection.into_response();
    }
    let stats = state.cache.stats();
    Json(json!({
        "hits": stats.hits,
        "misses": stats.misses,
        "evictions": stats.evictions,
        "size": stats.size,
        "hit_rate": stats.hit_rate(),
    }))
    .into_response()
}

async fn cache_flush(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(rejection) = check_admin_token(&headers) {
        return rejection.into_response();
    }
    state.cache.flush();
    Json(json!({ "flushed": true })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
        headers
    }

    #[test]
    fn no_token_configured_allows_every_request() {
        std::env::remove_var("MUX_ADMIN_TOKEN");
        assert!(check_admin_token(&HeaderMap::new()).is_ok());
    }

    #[test]
    fn matching_token_is_accepted() {
        std::env::set_var("MUX_ADMIN_TOKEN", "secret-token");
        assert!(check_admin_token(&headers_with_bearer("secret-token")).is_ok());
        std::env::remove_var("MUX_ADMIN_TOKEN");
    }

    #[test]
    fn wrong_token_is_rejected() {
        std::env::set_var("MUX_ADMIN_TOKEN", "secret-token");
        assert!(check_admin_token(&headers_with_bearer("nope")).is_err());
        std::env::remove_var("MUX_ADMIN_TOKEN");
    }

    #[test]
    fn missing_header_is_rejected_when_token_configured() {
        std::env::set_var("MUX_ADMIN_TOKEN", "secret-token");
        assert!(check_admin_token(&HeaderMap::new()).is_err());
        std::env::remove_var("MUX_ADMIN_TOKEN");
    }
}
