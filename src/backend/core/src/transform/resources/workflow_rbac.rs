//! Workflow instances for non-admin callers.
//!
//! Workflows started through this registry are stamped with the caller's
//! identity in `correlationId`. A caller may read an instance they started
//! or one whose definition is labeled with one of their groups.

use axum::http::Method;
use serde_json::Value;
use tracing::warn;

use super::workflow::{qualify_start, sanitize_instance, search_response, tenant_clause, SEARCH, WORKFLOW, WORKFLOW_BY_ID};
use crate::error::{ProxyError, Result};
use crate::transform::search::{constrain_query, equals_clause};
use crate::transform::{Endpoint, ProxyRequest, ResourceKind, TransformContext};
use crate::workflow::{is_labeled_with_group, WorkflowDef};

const CORRELATION_ID: &str = "correlationId";

pub fn endpoints() -> Vec<Endpoint> {
    let kind = ResourceKind::WorkflowRbac;
    vec![
        Endpoint::new(kind, Method::POST, WORKFLOW).on_request(start_request),
        Endpoint::new(kind, Method::GET, SEARCH)
            .on_request(search_request)
            .on_response(search_response),
        Endpoint::new(kind, Method::GET, WORKFLOW_BY_ID).on_response(get_response),
    ]
}

fn start_request(ctx: &TransformContext, mut request: ProxyRequest) -> Result<ProxyRequest> {
    let body = request.body_mut()?;
    if body.get("workflowDef").is_some() {
        return Err(ProxyError::access_denied("inline workflow definitions require admin access"));
    }
    qualify_start(ctx, body)?;

    let Some(start) = body.as_object_mut() else {
        return Err(ProxyError::unrecognized("expected a start workflow request object"));
    };
    start.insert(CORRELATION_ID.to_string(), Value::String(ctx.email().to_string()));
    Ok(request)
}

fn search_request(ctx: &TransformContext, mut request: ProxyRequest) -> Result<ProxyRequest> {
    let clauses = [
        tenant_clause(ctx.tenant())?,
        equals_clause(CORRELATION_ID, ctx.email())?,
    ];
    request.query = Some(constrain_query(request.query.as_deref(), &clauses)?);
    Ok(request)
}

fn started_by_caller(ctx: &TransformContext, instance: &Value) -> bool {
    instance.get(CORRELATION_ID).and_then(Value::as_str) == Some(ctx.email())
}

fn definition_labeled(ctx: &TransformContext, instance: &Value) -> Result<bool> {
    let Some(definition) = instance.get("workflowDefinition") else {
        return Ok(false);
    };
    let def: WorkflowDef = serde_json::from_value(definition.clone())?;
    Ok(is_labeled_with_group(&def, ctx.groups()))
}

fn get_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    let instance = sanitize_instance(ctx.tenant(), body)?;
    if started_by_caller(ctx, &instance) || definition_labeled(ctx, &instance)? {
        return Ok(instance);
    }
    warn!(tenant = %ctx.tenant(), "Workflow is neither started by the caller nor labeled with a caller group");
    Err(ProxyError::access_denied(
        "workflow was not started by the caller and is not labeled with any of the caller's groups",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transform::tests::context;
    use serde_json::json;

    // caller: user@example.com, groups ["network"]

    #[test]
    fn test_start_stamps_caller() {
        let ctx = context("acme", WORKFLOW, WORKFLOW);
        let request = ProxyRequest::new(Method::POST, WORKFLOW)
            .with_body(json!({"name": "provision", "correlationId": "someone-else"}));
        let body = start_request(&ctx, request).unwrap().body.unwrap();
        assert_eq!(body["name"], "acme___provision");
        assert_eq!(body["correlationId"], "user@example.com");
    }

    #[test]
    fn test_start_rejects_inline_definition() {
        let ctx = context("acme", WORKFLOW, WORKFLOW);
        let request = ProxyRequest::new(Method::POST, WORKFLOW)
            .with_body(json!({"name": "adhoc", "workflowDef": {"name": "adhoc", "tasks": []}}));
        let err = start_request(&ctx, request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[test]
    fn test_search_constrained_to_caller() {
        let ctx = context("acme", SEARCH, SEARCH);
        let request = search_request(&ctx, ProxyRequest::new(Method::GET, SEARCH)).unwrap();
        let query = request.query.unwrap();
        assert_eq!(
            query,
            "query=workflowType+STARTS_WITH+%27acme___%27+AND+correlationId+%3D+%27user%40example.com%27"
        );
    }

    #[test]
    fn test_get_own_instance() {
        let ctx = context("acme", WORKFLOW_BY_ID, "/api/workflow/wf-1");
        let body = json!({"workflowType": "acme___provision", "correlationId": "user@example.com"});
        assert_eq!(get_response(&ctx, body).unwrap()["workflowType"], "provision");
    }

    #[test]
    fn test_get_labeled_instance() {
        let ctx = context("acme", WORKFLOW_BY_ID, "/api/workflow/wf-1");
        let body = json!({
            "workflowType": "acme___provision",
            "correlationId": "colleague@example.com",
            "workflowDefinition": {"name": "acme___provision", "description": "Provision - Network", "tasks": []}
        });
        assert!(get_response(&ctx, body).is_ok());
    }

    #[test]
    fn test_get_other_callers_instance_denied() {
        let ctx = context("acme", WORKFLOW_BY_ID, "/api/workflow/wf-1");
        let body = json!({
            "workflowType": "acme___provision",
            "correlationId": "colleague@example.com",
            "workflowDefinition": {"name": "acme___provision", "description": "Provision - Finance", "tasks": []}
        });
        let err = get_response(&ctx, body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);

        let foreign = json!({"workflowType": "other___provision", "correlationId": "user@example.com"});
        let err = get_response(&ctx, foreign).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TenantMismatch);
    }
}
