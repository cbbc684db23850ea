//! Event handlers (`/api/event`).
//!
//! A handler is named by the tenant and may start workflows through its
//! `start_workflow` actions; both names are qualified.

use axum::http::Method;
use serde_json::Value;

use super::prefix_path_params;
use crate::error::Result;
use crate::tenancy::{add_prefix_field, remove_prefixes, retain_owned, TenantId};
use crate::transform::{Endpoint, ProxyRequest, ResourceKind, TransformContext};

const EVENTS: &str = "/api/event";
const EVENT: &str = "/api/event/:name";

const START_WORKFLOW: &str = "start_workflow";

pub fn endpoints() -> Vec<Endpoint> {
    let kind = ResourceKind::Event;
    vec![
        Endpoint::new(kind, Method::GET, EVENTS).on_response(list_response),
        Endpoint::new(kind, Method::POST, EVENTS).on_request(save_request),
        Endpoint::new(kind, Method::PUT, EVENTS).on_request(save_request),
        Endpoint::new(kind, Method::DELETE, EVENT).on_request(delete_request),
    ]
}

fn qualify_handler(tenant: &TenantId, handler: &mut Value) -> Result<()> {
    add_prefix_field(tenant, handler, "name", false)?;

    let actions = handler
        .get_mut("actions")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten();
    for action in actions {
        if let Some(start) = action.get_mut(START_WORKFLOW) {
            add_prefix_field(tenant, start, "name", false)?;
        }
    }
    Ok(())
}

fn list_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    let owned = retain_owned(ctx.tenant(), body, "name", false)?;
    remove_prefixes(
        ctx.tenant(),
        owned,
        [
            ("$[*].name", false),
            ("$[*].actions[*].start_workflow.name", false),
        ],
    )
}

fn save_request(ctx: &TransformContext, mut request: ProxyRequest) -> Result<ProxyRequest> {
    qualify_handler(ctx.tenant(), request.body_mut()?)?;
    Ok(request)
}

fn delete_request(ctx: &TransformContext, request: ProxyRequest) -> Result<ProxyRequest> {
    prefix_path_params(ctx, request, &["name"], false)
}
