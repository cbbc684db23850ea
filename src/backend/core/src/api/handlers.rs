//! HTTP handlers.

use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};

use super::AppState;
use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// Health
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Capability Probe
// ═══════════════════════════════════════════════════════════════════════════════

/// `true` when the caller satisfies the admin predicate.
pub async fn editable_workflows(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<bool>> {
    let principal = state.gate.resolve(&headers).await?;
    Ok(Json(principal.satisfies(&state.admin)))
}
