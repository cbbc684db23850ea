//! Endpoint tables, one module per resource family.
//!
//! Request paths handed to transforms are relative to the backend root
//! (`/api/...` for Conductor, `/schedule...` for Schellar). A transform that
//! qualifies path parameters re-renders the matched route.

pub mod bulk;
pub mod event;
pub mod schedule;
pub mod task;
pub mod taskdef;
pub mod workflow;
pub mod workflow_rbac;
pub mod workflowdef;
pub mod workflowdef_rbac;

use super::{ProxyRequest, TransformContext};
use crate::error::Result;

/// Qualify the named path parameters and re-render the request path.
pub(crate) fn prefix_path_params(
    ctx: &TransformContext,
    mut request: ProxyRequest,
    names: &[&str],
    allow_global: bool,
) -> Result<ProxyRequest> {
    request.path = ctx.path_with_prefixed(names, allow_global)?;
    Ok(request)
}
