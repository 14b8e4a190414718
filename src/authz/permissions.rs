use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of permission strings, e.g. `Vehicle.Drivetrain.Transmission.Gear_READ`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, permission: impl Into<String>) -> bool {
        self.0.insert(permission.into())
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Permissions in `self` not present in `granted`, in sorted order.
    pub fn missing_from(&self, granted: &PermissionSet) -> Vec<String> {
        self.0.difference(&granted.0).cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { missing: Vec<String> },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decide whether a caller holding `granted` may read a field requiring
/// `required`. Every required permission must be granted; fields with no
/// requirement are public. `None` is an anonymous caller.
pub fn authorize(required: &PermissionSet, granted: Option<&PermissionSet>) -> Decision {
    if required.is_empty() {
        return Decision::Allow;
    }
    let missing = match granted {
        Some(granted) => required.missing_from(granted),
        None => required.0.iter().cloned().collect(),
    };
    if missing.is_empty() {
        Decision::Allow
    } else {
        Decision::Deny { missing }
    }
}
