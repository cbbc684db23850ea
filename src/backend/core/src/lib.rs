//! # Conductor Tenancy
//!
//! Multi-tenant rewriting layer for a shared workflow-orchestration backend.
//!
//! ## Architecture
//!
//! - **Tenancy**: tenant namespaces, prefix codec and path-addressed traversal
//! - **Workflow**: typed task trees, task allow-list validation and group labels
//! - **Access**: caller identity from headers, role/group strategies, predicates
//! - **Transform**: per-resource endpoint registries driven by the dispatcher
//! - **API**: health and capability probe endpoints
//! - **Telemetry**: structured logging

pub mod access;
pub mod api;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod tenancy;
pub mod transform;
pub mod workflow;

pub use error::{ErrorKind, ProxyError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::access::{
        AccessGate, AccessPredicate, GroupStrategy, Principal, RoleStrategy, StaticDirectory,
    };
    pub use crate::error::{ErrorKind, ProxyError, Result};
    pub use crate::tenancy::{add_prefix, remove_prefix, remove_prefixes, TenantId, GLOBAL_PREFIX};
    pub use crate::transform::{
        encode_body, verify_workflow_owner, Endpoint, Ownership, ProxyRequest, Registry,
        ResourceKind, TransformContext,
    };
    pub use crate::workflow::{TaskPolicy, WorkflowDef};
}
