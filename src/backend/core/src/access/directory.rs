//! Config-backed identity directory.
//!
//! Serves both lookup strategies from the `access.directory` section. Entries
//! scoped to a tenant win over unscoped ones; unknown callers get the default
//! role and no groups.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{GroupStrategy, RoleStrategy};
use crate::config::DirectoryConfig;
use crate::error::LookupError;
use crate::tenancy::TenantId;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Identity {
    role: String,
    groups: Vec<String>,
}

/// In-memory role and group directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    default_role: String,
    scoped: HashMap<(String, String), Identity>,
    unscoped: HashMap<String, Identity>,
}

impl StaticDirectory {
    pub fn new(default_role: impl Into<String>) -> Self {
        Self {
            default_role: default_role.into(),
            ..Default::default()
        }
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        config.users.iter().fold(Self::new(&config.default_role), |dir, entry| {
            dir.with_user(
                entry.tenant.as_deref(),
                &entry.email,
                &entry.role,
                entry.groups.iter().cloned(),
            )
        })
    }

    /// Add an entry. `tenant: None` applies to every tenant.
    pub fn with_user<I, S>(mut self, tenant: Option<&str>, email: &str, role: &str, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identity = Identity {
            role: role.to_string(),
            groups: groups.into_iter().map(Into::into).collect(),
        };
        match tenant {
            Some(tenant) => {
                self.scoped
                    .insert((tenant.to_string(), email.to_string()), identity);
            }
            None => {
                self.unscoped.insert(email.to_string(), identity);
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.scoped.len() + self.unscoped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn identity(&self, tenant_id: &TenantId, email: &str) -> Option<&Identity> {
        self.scoped
            .get(&(tenant_id.as_str().to_string(), email.to_string()))
            .or_else(|| self.unscoped.get(email))
    }
}

#[async_trait]
impl RoleStrategy for StaticDirectory {
    async fn role(&self, tenant_id: &TenantId, email: &str) -> Result<String, LookupError> {
        Ok(self
            .identity(tenant_id, email)
            .map(|identity| identity.role.clone())
            .unwrap_or_else(|| self.default_role.clone()))
    }
}

#[async_trait]
impl GroupStrategy for StaticDirectory {
    async fn groups(&self, tenant_id: &TenantId, email: &str, _role: &str) -> Result<Vec<String>, LookupError> {
        Ok(self
            .identity(tenant_id, email)
            .map(|identity| identity.groups.clone())
            .unwrap_or_default())
    }
}
