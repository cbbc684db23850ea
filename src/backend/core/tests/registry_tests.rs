//! End-to-end tests driving the registries the way a dispatcher does.
//!
//! Tests cover:
//! - Header validation before any transform runs
//! - Admin and general predicates
//! - Request rewriting and body re-encoding
//! - Response rewriting and list filtering
//! - Ownership requirements for id-addressed mutations

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, Method};
use conductor_tenancy::access::{AccessGate, StaticDirectory, TENANT_HEADER, USER_EMAIL_HEADER};
use conductor_tenancy::config::AccessConfig;
use conductor_tenancy::error::{ErrorKind, ProxyError, Result};
use conductor_tenancy::transform::{
    decode_body, encode_body, verify_workflow_owner, Ownership, ProxyRequest, Registry, ResourceKind,
};
use conductor_tenancy::workflow::TaskPolicy;
use serde_json::{json, Value};

// ============================================================================
// Harness
// ============================================================================

fn gate() -> AccessGate {
    let directory = StaticDirectory::new("USER")
        .with_user(Some("acme"), "owner@acme.io", "OWNER", Vec::<String>::new())
        .with_user(Some("acme"), "dev@acme.io", "USER", ["network"]);
    AccessGate::with_directory(Arc::new(directory))
}

fn headers(tenant: &str, from: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(TENANT_HEADER, HeaderValue::from_str(tenant).unwrap());
    headers.insert(USER_EMAIL_HEADER, HeaderValue::from_str(from).unwrap());
    headers
}

fn full() -> Registry {
    Registry::full(Arc::new(TaskPolicy::default()), &AccessConfig::default())
}

fn rbac() -> Registry {
    Registry::rbac(Arc::new(TaskPolicy::default()))
}

/// Run the request half of a proxied call and return the forwarded request.
async fn forward(
    registry: &Registry,
    headers: &HeaderMap,
    request: ProxyRequest,
) -> Result<ProxyRequest> {
    let matched = registry
        .lookup(&request.method, &request.path)
        .ok_or_else(|| ProxyError::unrecognized("no route"))?;
    let principal = gate().enforce(registry.predicate(), headers).await?;
    let ctx = registry.context(principal, &matched);
    matched.endpoint.transform_request(&ctx, request)
}

/// Run the response half of a proxied call.
async fn respond(
    registry: &Registry,
    headers: &HeaderMap,
    method: Method,
    path: &str,
    backend_body: Value,
) -> Result<Value> {
    let matched = registry
        .lookup(&method, path)
        .ok_or_else(|| ProxyError::unrecognized("no route"))?;
    let principal = gate().enforce(registry.predicate(), headers).await?;
    let ctx = registry.context(principal, &matched);
    matched.endpoint.transform_response(&ctx, backend_body)
}

// ============================================================================
// Access Tests
// ============================================================================

#[tokio::test]
async fn test_missing_tenant_header_fails_before_transform() {
    let mut headers = HeaderMap::new();
    headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("owner@acme.io"));

    let request = ProxyRequest::new(Method::POST, "/api/metadata/taskdefs").with_body(json!([{"name": "x"}]));
    let err = forward(&full(), &headers, request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingHeader);
}

#[tokio::test]
async fn test_global_tenant_rejected() {
    let request = ProxyRequest::new(Method::GET, "/api/metadata/taskdefs");
    let err = forward(&full(), &headers("GLOBAL", "owner@acme.io"), request)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReservedTenantId);
}

#[tokio::test]
async fn test_full_registry_requires_admin() {
    let request = ProxyRequest::new(Method::GET, "/api/metadata/taskdefs");
    let err = forward(&full(), &headers("acme", "dev@acme.io"), request.clone())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);

    assert!(forward(&full(), &headers("acme", "owner@acme.io"), request).await.is_ok());
}

#[tokio::test]
async fn test_rbac_registry_open_to_all() {
    let request = ProxyRequest::new(Method::GET, "/api/workflow/search");
    let forwarded = forward(&rbac(), &headers("acme", "dev@acme.io"), request)
        .await
        .unwrap();
    assert!(forwarded.query.unwrap().contains("correlationId"));
}

#[test]
fn test_rbac_has_no_write_access_to_definitions() {
    let rbac = rbac();
    assert!(rbac.lookup(&Method::POST, "/api/metadata/workflow").is_none());
    assert!(rbac.lookup(&Method::POST, "/schedule").is_none());
    assert!(rbac.lookup(&Method::GET, "/api/metadata/workflow").is_some());
}

// ============================================================================
// Request Path Tests
// ============================================================================

#[tokio::test]
async fn test_workflowdef_create_is_validated_and_encoded() {
    let body = json!({
        "name": "provision",
        "tasks": [{"name": "call", "taskReferenceName": "call", "type": "HTTP"}]
    });
    let request = ProxyRequest::new(Method::POST, "/api/metadata/workflow").with_body(body);
    let forwarded = forward(&full(), &headers("acme", "owner@acme.io"), request)
        .await
        .unwrap();

    let (bytes, length) = encode_body(forwarded.body.as_ref().unwrap()).unwrap();
    assert_eq!(length, bytes.len());
    let sent = decode_body(&bytes).unwrap().unwrap();
    assert_eq!(sent["name"], "acme___provision");
    assert_eq!(sent["tasks"][0]["type"], "HTTP");
}

#[tokio::test]
async fn test_workflowdef_create_rejects_tenant_workers() {
    let body = json!({
        "name": "provision",
        "tasks": [{"name": "my_worker", "taskReferenceName": "w", "type": "SIMPLE"}]
    });
    let request = ProxyRequest::new(Method::POST, "/api/metadata/workflow").with_body(body);
    let err = forward(&full(), &headers("acme", "owner@acme.io"), request)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisallowedTaskType);
}

#[tokio::test]
async fn test_schedule_path_rewritten() {
    let request = ProxyRequest::new(Method::DELETE, "/schedule/nightly");
    let forwarded = forward(&full(), &headers("acme", "owner@acme.io"), request)
        .await
        .unwrap();
    assert_eq!(forwarded.path, "/schedule/acme___nightly");
}

#[tokio::test]
async fn test_search_query_constrained() {
    let request = ProxyRequest::new(Method::GET, "/api/workflow/search").with_query("query=status%3DRUNNING");
    let forwarded = forward(&full(), &headers("acme", "owner@acme.io"), request)
        .await
        .unwrap();
    assert_eq!(
        forwarded.query.unwrap(),
        "query=workflowType+STARTS_WITH+%27acme___%27+AND+%28status%3DRUNNING%29"
    );
}

// ============================================================================
// Response Path Tests
// ============================================================================

#[tokio::test]
async fn test_taskdef_list_filtered_and_stripped() {
    let backend = json!([
        {"name": "acme___resize"},
        {"name": "GLOBAL___js"},
        {"name": "other___resize"}
    ]);
    let body = respond(
        &full(),
        &headers("acme", "owner@acme.io"),
        Method::GET,
        "/api/metadata/taskdefs",
        backend,
    )
    .await
    .unwrap();
    assert_eq!(body, json!([{"name": "resize"}, {"name": "GLOBAL___js"}]));
}

#[tokio::test]
async fn test_foreign_workflow_rejected() {
    let err = respond(
        &full(),
        &headers("acme", "owner@acme.io"),
        Method::GET,
        "/api/workflow/wf-9",
        json!({"workflowId": "wf-9", "workflowType": "other___flow"}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TenantMismatch);
    assert_eq!(err.http_status(), axum::http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_own_workflow_with_caller_data_readable() {
    let backend = json!({
        "workflowId": "wf-1",
        "workflowType": "acme___flow",
        "correlationId": "dev@acme.io",
        "input": {"subWorkflowParam": {"name": "caller data"}},
        "tasks": []
    });
    for (registry, from) in [(full(), "owner@acme.io"), (rbac(), "dev@acme.io")] {
        let body = respond(
            &registry,
            &headers("acme", from),
            Method::GET,
            "/api/workflow/wf-1",
            backend.clone(),
        )
        .await
        .unwrap();
        assert_eq!(body["workflowType"], "flow");
        assert_eq!(body["input"]["subWorkflowParam"]["name"], "caller data");
    }
}

#[tokio::test]
async fn test_rbac_definitions_filtered_by_group() {
    let backend = json!([
        {"name": "acme___a", "description": "A - Network", "tasks": []},
        {"name": "acme___b", "description": "B - Billing", "tasks": []}
    ]);
    let body = respond(
        &rbac(),
        &headers("acme", "dev@acme.io"),
        Method::GET,
        "/api/metadata/workflow",
        backend,
    )
    .await
    .unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "a");
}

// ============================================================================
// Ownership Tests
// ============================================================================

#[test]
fn test_id_addressed_mutations_declare_ownership() {
    let full = full();
    for (method, path) in [
        (Method::DELETE, "/api/workflow/wf-1"),
        (Method::DELETE, "/api/workflow/wf-1/remove"),
        (Method::PUT, "/api/workflow/wf-1/pause"),
        (Method::PUT, "/api/workflow/wf-1/resume"),
        (Method::POST, "/api/workflow/wf-1/restart"),
        (Method::POST, "/api/workflow/wf-1/retry"),
    ] {
        let matched = full.lookup(&method, path).unwrap();
        assert_eq!(matched.endpoint.ownership, Ownership::WorkflowIdParam, "{method} {path}");
        assert_eq!(matched.endpoint.owned_workflow_ids(&matched.params, None).unwrap(), vec!["wf-1"]);
    }

    let matched = full.lookup(&Method::DELETE, "/api/workflow/bulk/terminate").unwrap();
    assert_eq!(matched.endpoint.kind, ResourceKind::Bulk);
    assert_eq!(matched.endpoint.ownership, Ownership::WorkflowIdsInBody);
}

#[test]
fn test_verify_owner_of_fetched_workflow() {
    let tenant = conductor_tenancy::tenancy::TenantId::new("acme").unwrap();
    assert!(verify_workflow_owner(&tenant, &json!({"workflowType": "acme___flow"})).is_ok());
    assert_eq!(
        verify_workflow_owner(&tenant, &json!({"workflowType": "other___flow"}))
            .unwrap_err()
            .kind(),
        ErrorKind::TenantMismatch
    );
}
