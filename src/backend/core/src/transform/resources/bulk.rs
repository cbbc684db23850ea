//! Bulk workflow operations (`/api/workflow/bulk`).
//!
//! The body is an array of workflow ids. Ids carry no tenant prefix, so
//! ownership is verified by the dispatcher per id before forwarding.

use axum::http::Method;

use crate::error::Result;
use crate::transform::{workflow_ids, Endpoint, Ownership, ProxyRequest, ResourceKind, TransformContext};

pub fn endpoints() -> Vec<Endpoint> {
    [
        (Method::PUT, "/api/workflow/bulk/pause"),
        (Method::PUT, "/api/workflow/bulk/resume"),
        (Method::POST, "/api/workflow/bulk/restart"),
        (Method::POST, "/api/workflow/bulk/retry"),
        (Method::DELETE, "/api/workflow/bulk/terminate"),
    ]
    .into_iter()
    .map(|(method, route)| {
        Endpoint::new(ResourceKind::Bulk, method, route)
            .on_request(ids_request)
            .owned_by(Ownership::WorkflowIdsInBody)
    })
    .collect()
}

fn ids_request(_ctx: &TransformContext, request: ProxyRequest) -> Result<ProxyRequest> {
    workflow_ids(request.body.as_ref())?;
    Ok(request)
}
