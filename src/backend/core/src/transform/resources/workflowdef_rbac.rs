//! Read-only workflow definitions for non-admin callers.
//!
//! A caller sees a definition of their tenant only when its description is
//! labeled with one of the caller's groups.

use axum::http::Method;
use serde_json::Value;
use tracing::warn;

use super::workflowdef::{get_request, sanitize_all, sanitize_definition, WORKFLOWDEF, WORKFLOWDEFS};
use crate::error::{ProxyError, Result};
use crate::tenancy::retain_owned;
use crate::transform::{Endpoint, ResourceKind, TransformContext};
use crate::workflow::{is_labeled_with_group, WorkflowDef};

pub fn endpoints() -> Vec<Endpoint> {
    let kind = ResourceKind::WorkflowDefRbac;
    vec![
        Endpoint::new(kind, Method::GET, WORKFLOWDEFS).on_response(list_response),
        Endpoint::new(kind, Method::GET, WORKFLOWDEF)
            .on_request(get_request)
            .on_response(get_response),
    ]
}

fn is_visible(ctx: &TransformContext, definition: &Value) -> Result<bool> {
    let def: WorkflowDef = serde_json::from_value(definition.clone())?;
    Ok(is_labeled_with_group(&def, ctx.groups()))
}

fn list_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    let Value::Array(owned) = retain_owned(ctx.tenant(), body, "name", false)? else {
        return Err(ProxyError::unrecognized("expected an array of workflow definitions"));
    };

    let mut visible = Vec::with_capacity(owned.len());
    for definition in owned {
        if is_visible(ctx, &definition)? {
            visible.push(definition);
        }
    }
    sanitize_all(ctx.tenant(), Value::Array(visible))
}

fn get_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    if !is_visible(ctx, &body)? {
        warn!(tenant = %ctx.tenant(), "Workflow definition is not labeled with a caller group");
        return Err(ProxyError::access_denied(
            "workflow definition is not labeled with any of the caller's groups",
        ));
    }
    sanitize_definition(ctx.tenant(), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transform::tests::context;
    use serde_json::json;

    #[test]
    fn test_list_filters_by_label() {
        // caller groups: ["network"]
        let ctx = context("acme", WORKFLOWDEFS, WORKFLOWDEFS);
        let body = json!([
            {"name": "acme___provision", "description": "Provision - Network", "tasks": []},
            {"name": "acme___billing", "description": "Billing - Finance", "tasks": []},
            {"name": "acme___plain", "tasks": []},
            {"name": "other___provision", "description": "Provision - Network", "tasks": []}
        ]);
        let listed = list_response(&ctx, body).unwrap();
        assert_eq!(
            listed,
            json!([{"name": "provision", "description": "Provision - Network", "tasks": []}])
        );
    }

    #[test]
    fn test_get_requires_label() {
        let ctx = context("acme", WORKFLOWDEF, "/api/metadata/workflow/provision");

        let labeled = json!({"name": "acme___provision", "description": "x - NETWORK", "tasks": []});
        assert_eq!(get_response(&ctx, labeled).unwrap()["name"], "provision");

        let unlabeled = json!({"name": "acme___provision", "description": "x - Finance", "tasks": []});
        let err = get_response(&ctx, unlabeled).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[test]
    fn test_definitions_are_read_only() {
        assert!(endpoints().iter().all(|e| e.method == Method::GET));
    }
}
