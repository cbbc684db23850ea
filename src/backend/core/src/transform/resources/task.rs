//! Live tasks (`/api/tasks`).

use axum::http::Method;
use serde_json::Value;

use crate::error::{ProxyError, Result};
use crate::tenancy::{remove_prefixes, retain_owned};
use crate::transform::{Endpoint, ResourceKind, TransformContext};

const TASK: &str = "/api/tasks/:taskId";
const SEARCH: &str = "/api/tasks/search";

pub fn endpoints() -> Vec<Endpoint> {
    let kind = ResourceKind::Task;
    vec![
        Endpoint::new(kind, Method::GET, TASK).on_response(get_response),
        Endpoint::new(kind, Method::GET, SEARCH).on_response(search_response),
    ]
}

fn get_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    remove_prefixes(
        ctx.tenant(),
        body,
        [("$.workflowType", false), ("$.taskDefName", true)],
    )
}

fn search_response(ctx: &TransformContext, mut body: Value) -> Result<Value> {
    let results = body
        .get_mut("results")
        .ok_or_else(|| ProxyError::unrecognized("expected a search result object"))?;
    *results = retain_owned(ctx.tenant(), results.take(), "workflowType", false)?;

    remove_prefixes(
        ctx.tenant(),
        body,
        [
            ("$.results[*].workflowType", false),
            ("$.results[*].taskDefName", true),
        ],
    )
}
