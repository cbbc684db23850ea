//! Workflow definitions (`/api/metadata/workflow`).
//!
//! Definitions are rewritten through the typed [`WorkflowDef`] walk: the
//! definition name and every sub-workflow reference are qualified on the way
//! in and stripped on the way out, and the task tree is validated against the
//! task policy before anything is forwarded.

use axum::http::Method;
use serde_json::Value;
use std::mem;

use super::prefix_path_params;
use crate::error::{ProxyError, Result};
use crate::tenancy::{add_prefix, retain_owned, strip_prefix, TenantId};
use crate::transform::{Endpoint, ProxyRequest, ResourceKind, TransformContext};
use crate::workflow::WorkflowDef;

pub(crate) const WORKFLOWDEFS: &str = "/api/metadata/workflow";
pub(crate) const WORKFLOWDEF: &str = "/api/metadata/workflow/:name";
const WORKFLOWDEF_VERSION: &str = "/api/metadata/workflow/:name/:version";

pub fn endpoints() -> Vec<Endpoint> {
    let kind = ResourceKind::WorkflowDef;
    vec![
        Endpoint::new(kind, Method::GET, WORKFLOWDEFS).on_response(list_response),
        Endpoint::new(kind, Method::POST, WORKFLOWDEFS).on_request(create_request),
        Endpoint::new(kind, Method::PUT, WORKFLOWDEFS).on_request(update_request),
        Endpoint::new(kind, Method::GET, WORKFLOWDEF)
            .on_request(get_request)
            .on_response(get_response),
        Endpoint::new(kind, Method::DELETE, WORKFLOWDEF_VERSION).on_request(delete_request),
    ]
}

/// Validate a tenant-submitted definition and qualify its names.
pub fn qualify_definition(ctx: &TransformContext, definition: Value) -> Result<Value> {
    let tenant = ctx.tenant();
    let mut def: WorkflowDef = serde_json::from_value(definition)?;

    ctx.policy().assert_allowed_workflow(&def)?;

    def.name = add_prefix(tenant, &def.name, false)?;
    def.for_each_task_mut(|task| {
        if !task.is_sub_workflow() {
            return Ok(());
        }
        if let Some(param) = task.sub_workflow_param.as_mut() {
            param.name = add_prefix(tenant, &param.name, false)?;
        }
        Ok(())
    })?;

    Ok(serde_json::to_value(def)?)
}

/// Strip tenant prefixes from a definition returned by the backend.
pub fn sanitize_definition(tenant: &TenantId, definition: Value) -> Result<Value> {
    let mut def: WorkflowDef = serde_json::from_value(definition)?;

    def.name = strip_prefix(tenant, &def.name, false)?;
    def.for_each_task_mut(|task| {
        if !task.is_sub_workflow() {
            return Ok(());
        }
        if let Some(param) = task.sub_workflow_param.as_mut() {
            param.name = strip_prefix(tenant, &param.name, false)?;
        }
        Ok(())
    })?;

    Ok(serde_json::to_value(def)?)
}

/// [`sanitize_definition`] for every item of a list.
pub(crate) fn sanitize_all(tenant: &TenantId, list: Value) -> Result<Value> {
    let Value::Array(items) = list else {
        return Err(ProxyError::unrecognized("expected an array of workflow definitions"));
    };
    items
        .into_iter()
        .map(|definition| sanitize_definition(tenant, definition))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn list_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    let owned = retain_owned(ctx.tenant(), body, "name", false)?;
    sanitize_all(ctx.tenant(), owned)
}

fn create_request(ctx: &TransformContext, mut request: ProxyRequest) -> Result<ProxyRequest> {
    let body = request.body_mut()?;
    *body = qualify_definition(ctx, mem::take(body))?;
    Ok(request)
}

fn update_request(ctx: &TransformContext, mut request: ProxyRequest) -> Result<ProxyRequest> {
    let definitions = request
        .body_mut()?
        .as_array_mut()
        .ok_or_else(|| ProxyError::unrecognized("expected an array of workflow definitions"))?;
    for definition in definitions.iter_mut() {
        *definition = qualify_definition(ctx, mem::take(definition))?;
    }
    Ok(request)
}

pub(crate) fn get_request(ctx: &TransformContext, request: ProxyRequest) -> Result<ProxyRequest> {
    prefix_path_params(ctx, request, &["name"], false)
}

fn get_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    sanitize_definition(ctx.tenant(), body)
}

fn delete_request(ctx: &TransformContext, request: ProxyRequest) -> Result<ProxyRequest> {
    prefix_path_params(ctx, request, &["name"], false)
}
