//! Task definitions (`/api/metadata/taskdefs`).
//!
//! Tenants see their own task definitions plus the shared GLOBAL ones, but
//! may only create or delete their own.

use axum::http::Method;
use serde_json::Value;

use super::prefix_path_params;
use crate::error::{ProxyError, Result};
use crate::tenancy::{add_prefix_field, remove_prefix, retain_owned};
use crate::transform::{Endpoint, ProxyRequest, ResourceKind, TransformContext};

const TASKDEFS: &str = "/api/metadata/taskdefs";
const TASKDEF: &str = "/api/metadata/taskdefs/:tasktype";

pub fn endpoints() -> Vec<Endpoint> {
    let kind = ResourceKind::TaskDef;
    vec![
        Endpoint::new(kind, Method::GET, TASKDEFS).on_response(list_response),
        Endpoint::new(kind, Method::POST, TASKDEFS).on_request(create_request),
        Endpoint::new(kind, Method::PUT, TASKDEFS).on_request(update_request),
        Endpoint::new(kind, Method::GET, TASKDEF)
            .on_request(get_request)
            .on_response(get_response),
        Endpoint::new(kind, Method::DELETE, TASKDEF).on_request(delete_request),
    ]
}

fn list_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    let owned = retain_owned(ctx.tenant(), body, "name", true)?;
    remove_prefix(ctx.tenant(), owned, "$[*].name", true)
}

fn create_request(ctx: &TransformContext, mut request: ProxyRequest) -> Result<ProxyRequest> {
    let definitions = request
        .body_mut()?
        .as_array_mut()
        .ok_or_else(|| ProxyError::unrecognized("expected an array of task definitions"))?;
    for definition in definitions {
        add_prefix_field(ctx.tenant(), definition, "name", false)?;
    }
    Ok(request)
}

fn update_request(ctx: &TransformContext, mut request: ProxyRequest) -> Result<ProxyRequest> {
    add_prefix_field(ctx.tenant(), request.body_mut()?, "name", false)?;
    Ok(request)
}

fn get_request(ctx: &TransformContext, request: ProxyRequest) -> Result<ProxyRequest> {
    prefix_path_params(ctx, request, &["tasktype"], true)
}

fn get_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    remove_prefix(ctx.tenant(), body, "$.name", true)
}

fn delete_request(ctx: &TransformContext, request: ProxyRequest) -> Result<ProxyRequest> {
    prefix_path_params(ctx, request, &["tasktype"], false)
}
