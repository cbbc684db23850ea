//! Adds and removes tenant prefixes inside JSON payloads.
//!
//! All functions here operate on values owned by the current request. The
//! `remove_*` family takes the document by value and hands back the rewritten
//! document, so no payload is ever rewritten behind a shared reference.

use serde_json::Value;
use tracing::{debug, warn};

use super::{global_qualifier, is_global, JsonPath, TenantId, INFIX_SEPARATOR};
use crate::error::{ProxyError, Result};

/// Field whose tenant prefix may legitimately be absent.
///
/// Tasks that need no task definition carry a backend default in
/// `taskDefName`, so a missing prefix there is skipped instead of rejected.
/// This is a single named carve-out, not a general rule.
pub const TASK_DEF_NAME_FIELD: &str = "taskDefName";

// ═══════════════════════════════════════════════════════════════════════════════
// Path Rules
// ═══════════════════════════════════════════════════════════════════════════════

/// Where a qualified name lives in a document and whether GLOBAL names found
/// there are left untouched.
#[derive(Debug, Clone)]
pub struct PathRule {
    pub path: JsonPath,
    pub allow_global: bool,
}

impl PathRule {
    pub fn new(expr: &str, allow_global: bool) -> Result<Self> {
        Ok(Self {
            path: JsonPath::parse(expr)?,
            allow_global,
        })
    }

    /// Whether a value without the tenant prefix is skipped rather than
    /// rejected.
    pub fn exempts_missing_prefix(&self) -> bool {
        self.path.last_key() == Some(TASK_DEF_NAME_FIELD)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Prefixing
// ═══════════════════════════════════════════════════════════════════════════════

/// Fails with `NamingViolation` when `value` contains the infix separator.
pub fn assert_without_separator(value: &str) -> Result<()> {
    if value.contains(INFIX_SEPARATOR) {
        warn!(value, "Value must not contain '{}'", INFIX_SEPARATOR);
        return Err(ProxyError::NamingViolation {
            value: value.to_string(),
            separator: INFIX_SEPARATOR,
        });
    }
    Ok(())
}

/// Qualify a caller-supplied name with the tenant prefix.
///
/// With `allow_global`, names already in the GLOBAL namespace are returned
/// unchanged. Anything else must be a raw local name.
pub fn add_prefix(tenant: &TenantId, name: &str, allow_global: bool) -> Result<String> {
    if allow_global && is_global(name) {
        return Ok(name.to_string());
    }
    assert_without_separator(name)?;
    Ok(tenant.qualify(name))
}

/// Qualify the string member `field` of a JSON object.
pub fn add_prefix_field(
    tenant: &TenantId,
    object: &mut Value,
    field: &str,
    allow_global: bool,
) -> Result<()> {
    let slot = object
        .as_object_mut()
        .and_then(|map| map.get_mut(field))
        .ok_or_else(|| ProxyError::unrecognized(format!("expected an object with '{field}'")))?;
    let name = slot
        .as_str()
        .ok_or_else(|| ProxyError::unrecognized(format!("'{field}' must be a string")))?;
    *slot = Value::String(add_prefix(tenant, name, allow_global)?);
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// De-prefixing
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether `value` belongs to the tenant, or to GLOBAL when allowed.
pub fn is_owned(tenant: &TenantId, value: &str, allow_global: bool) -> bool {
    (allow_global && is_global(value)) || value.starts_with(&tenant.prefix())
}

/// Strip the tenant prefix from a single name.
pub fn strip_prefix(tenant: &TenantId, value: &str, allow_global: bool) -> Result<String> {
    if allow_global && is_global(value) {
        return Ok(value.to_string());
    }
    value
        .strip_prefix(&tenant.prefix())
        .map(str::to_string)
        .ok_or_else(|| mismatch(tenant, "<value>", value))
}

/// Strip the tenant prefix from every value addressed by `path`.
pub fn remove_prefix(tenant: &TenantId, json: Value, path: &str, allow_global: bool) -> Result<Value> {
    let rule = PathRule::new(path, allow_global)?;
    remove_prefix_with(tenant, json, &rule)
}

/// Apply [`remove_prefix`] once per `(path, allow_global)` entry.
pub fn remove_prefixes<'a, I>(tenant: &TenantId, json: Value, rules: I) -> Result<Value>
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    rules
        .into_iter()
        .try_fold(json, |json, (path, allow_global)| {
            remove_prefix(tenant, json, path, allow_global)
        })
}

fn remove_prefix_with(tenant: &TenantId, mut json: Value, rule: &PathRule) -> Result<Value> {
    let tenant_prefix = tenant.prefix();
    let global = global_qualifier();

    let found = rule.path.for_each_mut(&mut json, |slot| {
        let value = match slot {
            Value::String(s) => s,
            Value::Null => return Ok(()),
            other => {
                return Err(ProxyError::unrecognized(format!(
                    "expected a string at '{}', found {}",
                    rule.path, other
                )))
            }
        };

        if rule.allow_global && value.starts_with(&global) {
            return Ok(());
        }

        match value.strip_prefix(&tenant_prefix).map(str::to_string) {
            Some(local) => {
                *value = local;
                Ok(())
            }
            None if rule.exempts_missing_prefix() => {
                debug!(path = %rule.path, value = %value, "Skipping tenant removal in taskDefName");
                Ok(())
            }
            None => Err(mismatch(tenant, rule.path.as_str(), value)),
        }
    })?;

    debug!(path = %rule.path, found, "Removed tenant prefixes");
    Ok(json)
}

/// Keep only array items whose string member `field` belongs to the tenant.
///
/// Used on list responses, which the backend returns unfiltered. Items
/// without the member are dropped.
pub fn retain_owned(tenant: &TenantId, json: Value, field: &str, allow_global: bool) -> Result<Value> {
    let Value::Array(items) = json else {
        return Err(ProxyError::unrecognized("expected an array of objects"));
    };
    let before = items.len();
    let kept: Vec<Value> = items
        .into_iter()
        .filter(|item| {
            item.get(field)
                .and_then(Value::as_str)
                .is_some_and(|name| is_owned(tenant, name, allow_global))
        })
        .collect();
    debug!(tenant = %tenant, field, before, after = kept.len(), "Filtered list by tenant");
    Ok(Value::Array(kept))
}

fn mismatch(tenant: &TenantId, path: &str, value: &str) -> ProxyError {
    warn!(
        tenant = %tenant,
        path,
        "Name must start with tenantId prefix"
    );
    ProxyError::TenantMismatch {
        tenant_id: tenant.to_string(),
        path: path.to_string(),
        value: value.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
