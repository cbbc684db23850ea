//! Workflow instances (`/api/workflow`).

use axum::http::Method;
use serde_json::Value;
use std::mem;

use super::prefix_path_params;
use super::workflowdef::{qualify_definition, sanitize_definition};
use crate::error::{ProxyError, Result};
use crate::tenancy::{add_prefix_field, remove_prefix, remove_prefixes, strip_prefix, TenantId};
use crate::transform::search::{constrain_query, starts_with_clause};
use crate::transform::{Endpoint, Ownership, ProxyRequest, ResourceKind, TransformContext};
use crate::workflow::SUB_WORKFLOW;

pub(crate) const WORKFLOW: &str = "/api/workflow";
pub(crate) const WORKFLOW_BY_ID: &str = "/api/workflow/:workflowId";
pub(crate) const SEARCH: &str = "/api/workflow/search";
const START_BY_NAME: &str = "/api/workflow/:name";
const RUNNING: &str = "/api/workflow/running/:name";

/// Field of a workflow instance naming its definition.
pub(crate) const WORKFLOW_TYPE: &str = "workflowType";

/// Top-level names of a workflow instance that carry the tenant prefix.
///
/// The embedded definition and sub-workflow task references are handled
/// separately so caller data in `input`, `output` or `inputData` is never
/// touched.
const INSTANCE_RULES: &[(&str, bool)] = &[
    ("$.workflowType", false),
    ("$.workflowName", false),
    ("$.tasks[*].workflowType", false),
    ("$.tasks[*].taskDefName", true),
];

const WORKFLOW_DEFINITION: &str = "workflowDefinition";
const SUB_WORKFLOW_NAME: &str = "/workflowTask/subWorkflowParam/name";

pub fn endpoints() -> Vec<Endpoint> {
    let kind = ResourceKind::Workflow;
    let by_id = |method: Method, suffix: &str| {
        Endpoint::new(kind, method, &format!("{WORKFLOW_BY_ID}{suffix}")).owned_by(Ownership::WorkflowIdParam)
    };

    vec![
        Endpoint::new(kind, Method::POST, WORKFLOW).on_request(start_request),
        Endpoint::new(kind, Method::POST, START_BY_NAME).on_request(start_by_name_request),
        Endpoint::new(kind, Method::GET, SEARCH)
            .on_request(search_request)
            .on_response(search_response),
        Endpoint::new(kind, Method::GET, RUNNING).on_request(running_request),
        Endpoint::new(kind, Method::GET, WORKFLOW_BY_ID).on_response(get_response),
        by_id(Method::DELETE, ""),
        by_id(Method::DELETE, "/remove"),
        by_id(Method::PUT, "/pause"),
        by_id(Method::PUT, "/resume"),
        by_id(Method::POST, "/restart"),
        by_id(Method::POST, "/retry"),
    ]
}

/// Strip every tenant-qualified name from a workflow instance.
///
/// Fails with `TenantMismatch` when the instance belongs to another tenant.
pub fn sanitize_instance(tenant: &TenantId, instance: Value) -> Result<Value> {
    let mut instance = remove_prefixes(tenant, instance, INSTANCE_RULES.iter().copied())?;

    if let Some(definition) = instance.get_mut(WORKFLOW_DEFINITION).filter(|d| !d.is_null()) {
        *definition = sanitize_definition(tenant, mem::take(definition))?;
    }

    let tasks = instance
        .get_mut("tasks")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter(|task| task.get("taskType").and_then(Value::as_str) == Some(SUB_WORKFLOW));
    for task in tasks {
        if let Some(slot) = task.pointer_mut(SUB_WORKFLOW_NAME) {
            strip_name(tenant, slot)?;
        }
    }

    Ok(instance)
}

fn strip_name(tenant: &TenantId, slot: &mut Value) -> Result<()> {
    match slot {
        Value::Null => Ok(()),
        Value::String(name) => {
            *name = strip_prefix(tenant, name, false)?;
            Ok(())
        }
        other => Err(ProxyError::unrecognized(format!(
            "expected a sub-workflow name, found {other}"
        ))),
    }
}

/// Query constraint limiting a search to the tenant's workflows.
pub(crate) fn tenant_clause(tenant: &TenantId) -> Result<String> {
    starts_with_clause(WORKFLOW_TYPE, &tenant.prefix())
}

/// Qualify a start request, including an inline definition if present.
pub(crate) fn qualify_start(ctx: &TransformContext, body: &mut Value) -> Result<()> {
    add_prefix_field(ctx.tenant(), body, "name", false)?;
    if let Some(definition) = body.get_mut("workflowDef") {
        *definition = qualify_definition(ctx, mem::take(definition))?;
    }
    Ok(())
}

fn start_request(ctx: &TransformContext, mut request: ProxyRequest) -> Result<ProxyRequest> {
    qualify_start(ctx, request.body_mut()?)?;
    Ok(request)
}

fn start_by_name_request(ctx: &TransformContext, request: ProxyRequest) -> Result<ProxyRequest> {
    prefix_path_params(ctx, request, &["name"], false)
}

fn running_request(ctx: &TransformContext, request: ProxyRequest) -> Result<ProxyRequest> {
    prefix_path_params(ctx, request, &["name"], false)
}

fn search_request(ctx: &TransformContext, mut request: ProxyRequest) -> Result<ProxyRequest> {
    let clause = tenant_clause(ctx.tenant())?;
    request.query = Some(constrain_query(request.query.as_deref(), &[clause])?);
    Ok(request)
}

pub(crate) fn search_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    if !body.is_object() {
        return Err(ProxyError::unrecognized("expected a search result object"));
    }
    remove_prefix(ctx.tenant(), body, "$.results[*].workflowType", false)
}

fn get_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    sanitize_instance(ctx.tenant(), body)
}
