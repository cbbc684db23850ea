//! Cron schedules served by the scheduler backend (`/schedule`).
//!
//! A schedule is named by the tenant and starts one of the tenant's
//! workflows, so both `name` and `workflowName` are qualified.

use axum::http::Method;
use serde_json::Value;

use super::prefix_path_params;
use crate::error::{ProxyError, Result};
use crate::tenancy::{add_prefix_field, remove_prefixes, retain_owned, TenantId};
use crate::transform::{Backend, Endpoint, ProxyRequest, ResourceKind, TransformContext};

const SCHEDULES: &str = "/schedule";
const SCHEDULE: &str = "/schedule/:name";

const QUALIFIED_FIELDS: [&str; 2] = ["name", "workflowName"];

pub fn endpoints() -> Vec<Endpoint> {
    let endpoint = |method: Method, route: &str| {
        Endpoint::new(ResourceKind::Schedule, method, route).to_backend(Backend::Scheduler)
    };
    vec![
        endpoint(Method::GET, SCHEDULES).on_response(list_response),
        endpoint(Method::POST, SCHEDULES).on_request(create_request),
        endpoint(Method::GET, SCHEDULE)
            .on_request(path_request)
            .on_response(get_response),
        endpoint(Method::PUT, SCHEDULE).on_request(update_request),
        endpoint(Method::DELETE, SCHEDULE).on_request(path_request),
    ]
}

/// Qualify the schedule fields. With `required`, both must be present.
fn qualify_schedule(tenant: &TenantId, schedule: &mut Value, required: bool) -> Result<()> {
    if !schedule.is_object() {
        return Err(ProxyError::unrecognized("expected a schedule object"));
    }
    for field in QUALIFIED_FIELDS {
        if required || schedule.get(field).is_some() {
            add_prefix_field(tenant, schedule, field, false)?;
        }
    }
    Ok(())
}

fn list_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    let owned = retain_owned(ctx.tenant(), body, "name", false)?;
    remove_prefixes(
        ctx.tenant(),
        owned,
        [("$[*].name", false), ("$[*].workflowName", false)],
    )
}

fn create_request(ctx: &TransformContext, mut request: ProxyRequest) -> Result<ProxyRequest> {
    qualify_schedule(ctx.tenant(), request.body_mut()?, true)?;
    Ok(request)
}

fn update_request(ctx: &TransformContext, mut request: ProxyRequest) -> Result<ProxyRequest> {
    qualify_schedule(ctx.tenant(), request.body_mut()?, false)?;
    prefix_path_params(ctx, request, &["name"], false)
}

fn path_request(ctx: &TransformContext, request: ProxyRequest) -> Result<ProxyRequest> {
    prefix_path_params(ctx, request, &["name"], false)
}

fn get_response(ctx: &TransformContext, body: Value) -> Result<Value> {
    remove_prefixes(ctx.tenant(), body, [("$.name", false), ("$.workflowName", false)])
}
