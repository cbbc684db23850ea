//! Tenant namespaces.
//!
//! Every object a tenant stores in the shared backend is named
//! `<tenant>___<localName>`. Objects shared by all tenants live under the
//! reserved `GLOBAL` prefix. This module owns the identifier types and the
//! codec that adds and removes prefixes inside JSON payloads.

pub mod codec;
pub mod path;

pub use codec::{
    add_prefix, add_prefix_field, assert_without_separator, is_owned, remove_prefix,
    remove_prefixes, retain_owned, strip_prefix, PathRule, TASK_DEF_NAME_FIELD,
};
pub use path::JsonPath;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{ProxyError, Result};

/// Prefix of objects which can be used by all tenants.
pub const GLOBAL_PREFIX: &str = "GLOBAL";

/// Separates the namespace prefix from a local object name.
pub const INFIX_SEPARATOR: &str = "___";

/// Appends the infix separator to a tenant id or to [`GLOBAL_PREFIX`].
pub fn with_separator(prefix: &str) -> String {
    format!("{prefix}{INFIX_SEPARATOR}")
}

/// `GLOBAL___`, the qualifier of globally shared names.
pub fn global_qualifier() -> String {
    with_separator(GLOBAL_PREFIX)
}

/// Whether a name lives in the GLOBAL namespace.
pub fn is_global(name: &str) -> bool {
    name.starts_with(&global_qualifier())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tenant Id
// ═══════════════════════════════════════════════════════════════════════════════

/// Validated tenant identifier.
///
/// Never equal to `GLOBAL` and never containing the infix separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id == GLOBAL_PREFIX {
            return Err(ProxyError::ReservedTenantId { tenant_id: id });
        }
        if id.is_empty() || id.contains(INFIX_SEPARATOR) {
            return Err(ProxyError::NamingViolation {
                value: id,
                separator: INFIX_SEPARATOR,
            });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<tenant>___`
    pub fn prefix(&self) -> String {
        with_separator(&self.0)
    }

    /// Qualifies a local name without any validation of the name itself.
    pub fn qualify(&self, local_name: &str) -> String {
        format!("{}{}", self.prefix(), local_name)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TenantId {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = ProxyError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_with_separator() {
        assert_eq!(with_separator("acme"), "acme___");
        assert_eq!(with_separator(GLOBAL_PREFIX), "GLOBAL___");
        assert_eq!(global_qualifier(), "GLOBAL___");
    }

    #[test]
    fn test_tenant_id_rejects_global() {
        let err = TenantId::new("GLOBAL").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReservedTenantId);
    }

    #[test]
    fn test_tenant_id_rejects_separator() {
        let err = TenantId::new("a___b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NamingViolation);
        assert!(TenantId::new("").is_err());
    }

    #[test]
    fn test_tenant_id_prefix() {
        let tenant: TenantId = "acme".parse().unwrap();
        assert_eq!(tenant.prefix(), "acme___");
        assert_eq!(tenant.qualify("build"), "acme___build");
        assert_eq!(tenant.to_string(), "acme");
    }

    #[test]
    fn test_is_global() {
        assert!(is_global("GLOBAL___js"));
        assert!(!is_global("GLOBAL_js"));
        assert!(!is_global("acme___GLOBAL___js"));
    }
}
