//! Access control: caller identity from headers, role/group resolution via
//! pluggable async strategies, and access predicates.
//!
//! # Usage
//!
//! ```rust,ignore
//! use conductor_tenancy::access::{AccessGate, AccessPredicate, StaticDirectory};
//!
//! let directory = Arc::new(StaticDirectory::from_config(&config.access.directory));
//! let gate = AccessGate::new(directory.clone(), directory);
//!
//! let principal = gate
//!     .enforce(&AccessPredicate::admin("OWNER", "network-admin"), request.headers())
//!     .await?;
//! ```
//!
//! Nothing is cached: every request resolves its principal afresh, role
//! first and groups second.

pub mod directory;
pub mod predicate;

pub use directory::StaticDirectory;
pub use predicate::{authorize, AccessPredicate};

use async_trait::async_trait;
use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{LookupError, ProxyError, Result};
use crate::tenancy::TenantId;

/// Header carrying the tenant id.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Header carrying the caller's identity.
pub const USER_EMAIL_HEADER: &str = "from";

// ═══════════════════════════════════════════════════════════════════════════════
// Lookup Strategies
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolves the caller's role.
#[async_trait]
pub trait RoleStrategy: Send + Sync {
    async fn role(&self, tenant_id: &TenantId, email: &str) -> std::result::Result<String, LookupError>;
}

/// Resolves the caller's groups. May depend on the already resolved role.
#[async_trait]
pub trait GroupStrategy: Send + Sync {
    async fn groups(
        &self,
        tenant_id: &TenantId,
        email: &str,
        role: &str,
    ) -> std::result::Result<Vec<String>, LookupError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Header Extraction
// ═══════════════════════════════════════════════════════════════════════════════

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str> {
    match headers.get(name).map(|v| v.to_str()) {
        Some(Ok(value)) if !value.is_empty() => Ok(value),
        _ => {
            warn!(header = name, "Required header not found");
            Err(ProxyError::MissingHeader { header: name })
        }
    }
}

/// Tenant id of the request.
///
/// Fails when `x-tenant-id` is absent, equals `GLOBAL` or contains the infix
/// separator.
pub fn tenant_id_of(headers: &HeaderMap) -> Result<TenantId> {
    let raw = header(headers, TENANT_HEADER)?;
    TenantId::new(raw).inspect_err(|_| warn!(tenant_id = raw, "Illegal tenant id"))
}

/// Caller identity from the `from` header.
pub fn user_email_of(headers: &HeaderMap) -> Result<String> {
    header(headers, USER_EMAIL_HEADER).map(str::to_string)
}

/// Resolve the caller's role. Strategy failures are passed through.
pub async fn role_of(headers: &HeaderMap, strategy: &dyn RoleStrategy) -> Result<String> {
    let tenant_id = tenant_id_of(headers)?;
    let email = user_email_of(headers)?;
    strategy
        .role(&tenant_id, &email)
        .await
        .map_err(ProxyError::Lookup)
}

/// Resolve the caller's groups for an already resolved role.
pub async fn groups_of(
    headers: &HeaderMap,
    role: &str,
    strategy: &dyn GroupStrategy,
) -> Result<Vec<String>> {
    let tenant_id = tenant_id_of(headers)?;
    let email = user_email_of(headers)?;
    strategy
        .groups(&tenant_id, &email, role)
        .await
        .map_err(ProxyError::Lookup)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Principal & Gate
// ═══════════════════════════════════════════════════════════════════════════════

/// Caller of a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub tenant_id: TenantId,
    pub email: String,
    pub role: String,
    pub groups: Vec<String>,
}

impl Principal {
    pub fn satisfies(&self, predicate: &AccessPredicate) -> bool {
        authorize(predicate, &self.role, &self.groups)
    }
}

/// Resolves principals and applies access predicates.
#[derive(Clone)]
pub struct AccessGate {
    roles: Arc<dyn RoleStrategy>,
    groups: Arc<dyn GroupStrategy>,
}

impl AccessGate {
    pub fn new(roles: Arc<dyn RoleStrategy>, groups: Arc<dyn GroupStrategy>) -> Self {
        Self { roles, groups }
    }

    /// Build a gate whose strategies are both served by one directory.
    pub fn with_directory<D>(directory: Arc<D>) -> Self
    where
        D: RoleStrategy + GroupStrategy + 'static,
    {
        Self {
            roles: directory.clone(),
            groups: directory,
        }
    }

    /// Resolve the caller. The role is looked up before the groups.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Principal> {
        let tenant_id = tenant_id_of(headers)?;
        let email = user_email_of(headers)?;
        let role = role_of(headers, self.roles.as_ref()).await?;
        let groups = groups_of(headers, &role, self.groups.as_ref()).await?;

        debug!(tenant = %tenant_id, email = %email, role = %role, groups = ?groups, "Resolved principal");

        Ok(Principal {
            tenant_id,
            email,
            role,
            groups,
        })
    }

    /// Resolve the caller and require `predicate` to hold.
    pub async fn enforce(&self, predicate: &AccessPredicate, headers: &HeaderMap) -> Result<Principal> {
        let principal = self.resolve(headers).await?;
        if !principal.satisfies(predicate) {
            warn!(
                tenant = %principal.tenant_id,
                role = %principal.role,
                predicate = predicate.name(),
                "Access denied"
            );
            return Err(ProxyError::access_denied(format!(
                "caller does not satisfy '{}' access",
                predicate.name()
            )));
        }
        Ok(principal)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
