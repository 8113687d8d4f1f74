use std::collections::HashSet;
use std::hash::Hash;

/// Partition of two root snapshots.
///
/// `new = found \ installed`, `dropped = installed \ found`,
/// `existing = installed ∩ found`. Iteration order is unspecified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T: Eq + Hash> {
    pub new: HashSet<T>,
    pub dropped: HashSet<T>,
    pub existing: HashSet<T>,
}

impl<T: Eq + Hash + Clone> SetDiff<T> {
    pub fn compute(installed: &HashSet<T>, found: &HashSet<T>) -> Self {
        Self {
            new: found.difference(installed).cloned().collect(),
            dropped: installed.difference(found).cloned().collect(),
            existing: installed.intersection(found).cloned().collect(),
        }
    }

    /// True when the snapshots differ in membership.
    pub fn has_membership_changes(&self) -> bool {
        !self.new.is_empty() || !self.dropped.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.dropped.len() + self.existing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
