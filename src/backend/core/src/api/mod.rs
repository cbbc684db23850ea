//! Side endpoints served next to the proxied APIs.
//!
//! - `GET /health` - liveness
//! - `GET /editableworkflows` - whether the caller may edit workflow
//!   definitions, as a JSON boolean
//!
//! # Example
//!
//! ```rust,ignore
//! let state = AppState::new(gate, AccessPredicate::admin("OWNER", "network-admin"));
//! let app = build_router(state);
//! ```

mod handlers;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::access::{AccessGate, AccessPredicate};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: AccessGate,
    /// Predicate deciding whether the caller may edit workflow definitions.
    pub admin: AccessPredicate,
}

impl AppState {
    pub fn new(gate: AccessGate, admin: AccessPredicate) -> Self {
        Self { gate, admin }
    }
}

/// Build the router for the side endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/editableworkflows", get(handlers::editable_workflows))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{StaticDirectory, TENANT_HEADER, USER_EMAIL_HEADER};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let directory = StaticDirectory::new("USER")
            .with_user(Some("acme"), "owner@acme.io", "OWNER", Vec::<String>::new())
            .with_user(None, "netops@acme.io", "USER", ["network-admin"]);
        let gate = AccessGate::with_directory(Arc::new(directory));
        build_router(AppState::new(gate, AccessPredicate::admin("OWNER", "network-admin")))
    }

    async fn probe(tenant: Option<&str>, from: &str) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().uri("/editableworkflows").header(USER_EMAIL_HEADER, from);
        if let Some(tenant) = tenant {
            request = request.header(TENANT_HEADER, tenant);
        }
        let response = app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_editable_workflows() {
        assert_eq!(probe(Some("acme"), "owner@acme.io").await, (StatusCode::OK, serde_json::json!(true)));
        assert_eq!(probe(Some("acme"), "netops@acme.io").await, (StatusCode::OK, serde_json::json!(true)));
        assert_eq!(probe(Some("acme"), "someone@acme.io").await, (StatusCode::OK, serde_json::json!(false)));
        // the owner entry is scoped to its tenant
        assert_eq!(probe(Some("other"), "owner@acme.io").await, (StatusCode::OK, serde_json::json!(false)));
    }

    #[tokio::test]
    async fn test_editable_workflows_header_errors() {
        let (status, body) = probe(None, "owner@acme.io").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_HEADER");

        let (status, body) = probe(Some("GLOBAL"), "owner@acme.io").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "RESERVED_TENANT_ID");
    }
}
