//! Inspection function set.
//!
//! Inspection functions are simulation/check entry points implemented
//! with state-mutating bytecode but meant to be called read-only. The
//! merged interface presents them as `view`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::entry::{EntryKind, InterfaceEntry, Mutability};

/// Inspection functions of the automation registry.
pub const DEFAULT_INSPECTION_FUNCTIONS: &[&str] =
    &["checkUpkeep", "checkCallback", "simulatePerformUpkeep"];

/// Names of functions whose mutability is forced to `view`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InspectionSet(BTreeSet<String>);

impl Default for InspectionSet {
    fn default() -> Self {
        Self::new(DEFAULT_INSPECTION_FUNCTIONS.iter().copied())
    }
}

impl InspectionSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// A set that overrides nothing.
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the rule applies to `entry`: a function whose name is in the set.
    pub fn applies_to(&self, entry: &InterfaceEntry) -> bool {
        entry.kind == EntryKind::Function
            && entry.name.as_deref().is_some_and(|name| self.contains(name))
    }

    /// Force `view` on an eligible entry.
    ///
    /// Returns true when the declared mutability actually changed.
    pub fn normalize(&self, entry: &mut InterfaceEntry) -> bool {
        if !self.applies_to(entry) || entry.state_mutability == Some(Mutability::View) {
            return false;
        }
        entry.state_mutability = Some(Mutability::View);
        true
    }
}
