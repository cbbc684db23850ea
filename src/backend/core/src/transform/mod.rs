//! Per-resource request and response transforms.
//!
//! A [`Registry`] maps `(method, route)` to an [`Endpoint`]. The dispatcher
//! in front of the backend drives each request through it:
//!
//! 1. [`Registry::lookup`] the endpoint for the incoming method and path.
//! 2. Resolve the caller with the access gate and check
//!    [`Registry::predicate`].
//! 3. Build a [`TransformContext`] with [`Registry::context`].
//! 4. If the endpoint declares an [`Ownership`] requirement, fetch each
//!    addressed workflow and call [`verify_workflow_owner`].
//! 5. Run [`Endpoint::transform_request`], re-encode the body with
//!    [`encode_body`] and forward to the endpoint's [`Backend`].
//! 6. Run [`Endpoint::transform_response`] on the backend's JSON reply.
//!
//! Transforms own the value they rewrite and hand back the new value.

pub mod body;
pub mod resources;
pub mod route;
pub mod search;

pub use body::{decode_body, encode_body};
pub use route::{PathParams, RoutePattern};

use axum::http::Method;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::access::{AccessPredicate, Principal};
use crate::config::AccessConfig;
use crate::error::{ProxyError, Result};
use crate::tenancy::{add_prefix, is_owned, TenantId};
use crate::workflow::TaskPolicy;

// ═══════════════════════════════════════════════════════════════════════════════
// Endpoint Model
// ═══════════════════════════════════════════════════════════════════════════════

/// Resource family an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Bulk,
    Event,
    TaskDef,
    WorkflowDef,
    Task,
    Workflow,
    Schedule,
    WorkflowDefRbac,
    WorkflowRbac,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bulk => "bulk",
            Self::Event => "event",
            Self::TaskDef => "task_def",
            Self::WorkflowDef => "workflow_def",
            Self::Task => "task",
            Self::Workflow => "workflow",
            Self::Schedule => "schedule",
            Self::WorkflowDefRbac => "workflow_def_rbac",
            Self::WorkflowRbac => "workflow_rbac",
        };
        f.write_str(name)
    }
}

/// Upstream service an endpoint is forwarded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Conductor,
    Scheduler,
}

/// Workflow ownership the dispatcher must verify before forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ownership {
    #[default]
    None,
    /// The `workflowId` path parameter addresses the workflow.
    WorkflowIdParam,
    /// The body is an array of workflow ids.
    WorkflowIdsInBody,
}

/// Path parameter addressed by [`Ownership::WorkflowIdParam`].
pub const WORKFLOW_ID_PARAM: &str = "workflowId";

/// Request as seen by a request transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
}

impl ProxyRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Body of a request that requires one.
    pub fn body_mut(&mut self) -> Result<&mut Value> {
        self.body
            .as_mut()
            .ok_or_else(|| ProxyError::unrecognized("request body is required"))
    }
}

pub type RequestTransform = fn(&TransformContext, ProxyRequest) -> Result<ProxyRequest>;
pub type ResponseTransform = fn(&TransformContext, Value) -> Result<Value>;

/// A routed operation and its transforms.
#[derive(Clone)]
pub struct Endpoint {
    pub kind: ResourceKind,
    pub backend: Backend,
    pub method: Method,
    pub route: RoutePattern,
    pub ownership: Ownership,
    request: Option<RequestTransform>,
    response: Option<ResponseTransform>,
}

impl Endpoint {
    pub fn new(kind: ResourceKind, method: Method, route: &str) -> Self {
        Self {
            kind,
            backend: Backend::Conductor,
            method,
            route: RoutePattern::new(route),
            ownership: Ownership::None,
            request: None,
            response: None,
        }
    }

    pub fn on_request(mut self, transform: RequestTransform) -> Self {
        self.request = Some(transform);
        self
    }

    pub fn on_response(mut self, transform: ResponseTransform) -> Self {
        self.response = Some(transform);
        self
    }

    pub fn owned_by(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    pub fn to_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn transform_request(&self, ctx: &TransformContext, request: ProxyRequest) -> Result<ProxyRequest> {
        match self.request {
            Some(transform) => transform(ctx, request),
            None => Ok(request),
        }
    }

    pub fn transform_response(&self, ctx: &TransformContext, response: Value) -> Result<Value> {
        match self.response {
            Some(transform) => transform(ctx, response),
            None => Ok(response),
        }
    }

    /// Workflow ids the dispatcher must verify before forwarding.
    pub fn owned_workflow_ids(&self, params: &PathParams, body: Option<&Value>) -> Result<Vec<String>> {
        match self.ownership {
            Ownership::None => Ok(Vec::new()),
            Ownership::WorkflowIdParam => params
                .get(WORKFLOW_ID_PARAM)
                .map(|id| vec![id.clone()])
                .ok_or_else(|| ProxyError::InvalidPath {
                    path: self.route.to_string(),
                    reason: format!("missing parameter '{WORKFLOW_ID_PARAM}'"),
                }),
            Ownership::WorkflowIdsInBody => workflow_ids(body),
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("kind", &self.kind)
            .field("backend", &self.backend)
            .field("method", &self.method)
            .field("route", &self.route.as_str())
            .field("ownership", &self.ownership)
            .finish()
    }
}

/// Parse a bulk body, which must be an array of workflow ids.
pub fn workflow_ids(body: Option<&Value>) -> Result<Vec<String>> {
    let items = body
        .and_then(Value::as_array)
        .ok_or_else(|| ProxyError::unrecognized("expected an array of workflow ids"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ProxyError::unrecognized("workflow ids must be strings"))
        })
        .collect()
}

/// Check that a workflow instance fetched from the backend belongs to the
/// tenant.
pub fn verify_workflow_owner(tenant: &TenantId, workflow: &Value) -> Result<()> {
    let name = workflow
        .get("workflowType")
        .or_else(|| workflow.get("workflowName"))
        .and_then(Value::as_str)
        .ok_or_else(|| ProxyError::unrecognized("workflow instance without a workflow type"))?;

    if !is_owned(tenant, name, false) {
        warn!(tenant = %tenant, "Workflow is owned by another tenant");
        return Err(ProxyError::TenantMismatch {
            tenant_id: tenant.to_string(),
            path: "$.workflowType".to_string(),
            value: name.to_string(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Transform Context
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-request inputs available to every transform.
#[derive(Debug, Clone)]
pub struct TransformContext {
    pub principal: Principal,
    pub params: PathParams,
    route: RoutePattern,
    policy: Arc<TaskPolicy>,
}

impl TransformContext {
    pub fn new(principal: Principal, route: RoutePattern, params: PathParams, policy: Arc<TaskPolicy>) -> Self {
        Self {
            principal,
            params,
            route,
            policy,
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.principal.tenant_id
    }

    pub fn email(&self) -> &str {
        &self.principal.email
    }

    pub fn groups(&self) -> &[String] {
        &self.principal.groups
    }

    pub fn policy(&self) -> &TaskPolicy {
        &self.policy
    }

    pub fn param(&self, name: &str) -> Result<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ProxyError::InvalidPath {
                path: self.route.to_string(),
                reason: format!("missing parameter '{name}'"),
            })
    }

    /// Matched route rendered with the named parameters qualified by the
    /// tenant prefix.
    pub fn path_with_prefixed(&self, names: &[&str], allow_global: bool) -> Result<String> {
        let mut params = self.params.clone();
        for name in names {
            let qualified = add_prefix(self.tenant(), self.param(name)?, allow_global)?;
            params.insert(name.to_string(), qualified);
        }
        self.route.render(&params)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Endpoint selected for a request.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub endpoint: &'a Endpoint,
    pub params: PathParams,
}

/// Immutable set of endpoints guarded by one access predicate.
#[derive(Debug, Clone)]
pub struct Registry {
    name: &'static str,
    endpoints: Vec<Endpoint>,
    predicate: AccessPredicate,
    policy: Arc<TaskPolicy>,
}

impl Registry {
    pub fn new(
        name: &'static str,
        endpoints: Vec<Endpoint>,
        predicate: AccessPredicate,
        policy: Arc<TaskPolicy>,
    ) -> Self {
        Self {
            name,
            endpoints,
            predicate,
            policy,
        }
    }

    /// Registry for administrators: every resource, including schedules.
    pub fn full(policy: Arc<TaskPolicy>, access: &AccessConfig) -> Self {
        let endpoints = [
            resources::bulk::endpoints(),
            resources::event::endpoints(),
            resources::taskdef::endpoints(),
            resources::workflowdef::endpoints(),
            resources::workflow::endpoints(),
            resources::task::endpoints(),
            resources::schedule::endpoints(),
        ]
        .concat();

        Self::new(
            "full",
            endpoints,
            AccessPredicate::admin(&access.owner_role, &access.admin_group),
            policy,
        )
    }

    /// Registry open to every caller, restricted by labels and caller
    /// identity. Scheduling is not exposed.
    pub fn rbac(policy: Arc<TaskPolicy>) -> Self {
        // FIXME: task and bulk are shared with the full registry and do not
        // check group labels yet.
        let endpoints = [
            resources::workflowdef_rbac::endpoints(),
            resources::workflow_rbac::endpoints(),
            resources::task::endpoints(),
            resources::bulk::endpoints(),
        ]
        .concat();

        Self::new("rbac", endpoints, AccessPredicate::general(), policy)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn predicate(&self) -> &AccessPredicate {
        &self.predicate
    }

    pub fn policy(&self) -> &Arc<TaskPolicy> {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self, kind: ResourceKind) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().filter(move |e| e.kind == kind)
    }

    pub fn supports(&self, backend: Backend) -> bool {
        self.endpoints.iter().any(|e| e.backend == backend)
    }

    /// Find the endpoint for a request. The route with the most literal
    /// segments wins; ties go to the first registered.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let mut best: Option<RouteMatch<'_>> = None;

        for endpoint in self.endpoints.iter().filter(|e| e.method == *method) {
            let Some(params) = endpoint.route.matches(path) else {
                continue;
            };
            let better = best
                .as_ref()
                .map_or(true, |b| endpoint.route.specificity() > b.endpoint.route.specificity());
            if better {
                best = Some(RouteMatch { endpoint, params });
            }
        }

        match &best {
            Some(m) => debug!(registry = self.name, %method, path, route = %m.endpoint.route, "Matched endpoint"),
            None => debug!(registry = self.name, %method, path, "No endpoint"),
        }
        best
    }

    pub fn context(&self, principal: Principal, matched: &RouteMatch<'_>) -> TransformContext {
        TransformContext::new(
            principal,
            matched.endpoint.route.clone(),
            matched.params.clone(),
            self.policy.clone(),
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
