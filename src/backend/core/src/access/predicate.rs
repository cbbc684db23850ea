//! Access predicates over a resolved role and group list.

use std::fmt;
use std::sync::Arc;

type Check = dyn Fn(&str, &[String]) -> bool + Send + Sync;

/// Named decision over `(role, groups)`.
#[derive(Clone)]
pub struct AccessPredicate {
    name: &'static str,
    check: Arc<Check>,
}

impl AccessPredicate {
    pub fn new<F>(name: &'static str, check: F) -> Self
    where
        F: Fn(&str, &[String]) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            check: Arc::new(check),
        }
    }

    /// Holds for the owner role or members of the admin group.
    ///
    /// Both comparisons are exact.
    pub fn admin(owner_role: impl Into<String>, admin_group: impl Into<String>) -> Self {
        let owner_role = owner_role.into();
        let admin_group = admin_group.into();
        Self::new("admin", move |role, groups| {
            role == owner_role || groups.iter().any(|g| *g == admin_group)
        })
    }

    /// Holds for every caller.
    pub fn general() -> Self {
        Self::new("general", |_, _| true)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn allows(&self, role: &str, groups: &[String]) -> bool {
        (self.check)(role, groups)
    }
}

impl fmt::Debug for AccessPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPredicate").field("name", &self.name).finish()
    }
}

/// Apply a predicate.
pub fn authorize(predicate: &AccessPredicate, role: &str, groups: &[String]) -> bool {
    predicate.allows(role, groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_admin_access() {
        let admin = AccessPredicate::admin("OWNER", "network-admin");
        assert!(authorize(&admin, "OWNER", &[]));
        assert!(authorize(&admin, "USER", &groups(&["ops", "network-admin"])));
        assert!(!authorize(&admin, "USER", &groups(&["ops"])));
        assert!(!authorize(&admin, "owner", &[]));
        assert!(!authorize(&admin, "USER", &groups(&["Network-Admin"])));
    }

    #[test]
    fn test_general_access() {
        let general = AccessPredicate::general();
        assert!(authorize(&general, "", &[]));
        assert!(authorize(&general, "USER", &groups(&["x"])));
        assert_eq!(general.name(), "general");
    }

    #[test]
    fn test_custom_predicate() {
        let readers = AccessPredicate::new("readers", |_, groups| groups.iter().any(|g| g == "readers"));
        assert!(readers.allows("USER", &groups(&["readers"])));
        assert!(!readers.allows("OWNER", &[]));
    }
}
