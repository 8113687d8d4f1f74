//! The two active-bundle indexes plus the bookkeeping of the last scan.
//!
//! Every mutation goes through [`RegistryState::insert`] or
//! [`RegistryState::remove`], which update both indexes together; the
//! registry only calls them under the state write guard.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::bundle::Bundle;

#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    by_name: HashMap<String, Arc<Bundle>>,
    by_root: HashMap<PathBuf, Arc<Bundle>>,
    pub(crate) errors: Vec<String>,
    pub(crate) last_scan: Option<Instant>,
}

impl RegistryState {
    pub(crate) fn by_name(&self, name: &str) -> Option<&Arc<Bundle>> {
        self.by_name.get(name)
    }

    pub(crate) fn by_root(&self, root: &Path) -> Option<&Arc<Bundle>> {
        self.by_root.get(root)
    }

    pub(crate) fn roots(&self) -> HashSet<PathBuf> {
        self.by_root.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Active names, sorted.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Active bundles, sorted by name.
    pub(crate) fn bundles(&self) -> Vec<Arc<Bundle>> {
        let mut bundles: Vec<Arc<Bundle>> = self.by_name.values().cloned().collect();
        bundles.sort_unstable_by(|a, b| a.name().cmp(b.name()));
        bundles
    }

    /// Installs `bundle`, displacing whatever held its name or its root.
    pub(crate) fn insert(&mut self, bundle: Arc<Bundle>) -> Vec<Arc<Bundle>> {
        let mut displaced = Vec::new();
        if let Some(old) = self.by_name.get(bundle.name()).cloned() {
            self.detach(&old);
            displaced.push(old);
        }
        if let Some(old) = self.by_root.get(bundle.root()).cloned() {
            self.detach(&old);
            displaced.push(old);
        }

        self.by_name
            .insert(bundle.name().to_string(), Arc::clone(&bundle));
        self.by_root.insert(bundle.root().to_path_buf(), bundle);
        displaced
    }

    /// Removes `bundle` if this exact instance is the active one.
    pub(crate) fn remove(&mut self, bundle: &Bundle) -> Option<Arc<Bundle>> {
        let active = self.by_name.get(bundle.name())?;
        if active.id() != bundle.id() {
            return None;
        }
        let active = Arc::clone(active);
        self.detach(&active);
        Some(active)
    }

    fn detach(&mut self, bundle: &Bundle) {
        self.by_name.remove(bundle.name());
        self.by_root.remove(bundle.root());
    }

    /// Both indexes describe the same set of bundles.
    pub(crate) fn is_consistent(&self) -> bool {
        self.by_name.len() == self.by_root.len()
            && self.by_name.values().all(|b| {
                self.by_root
                    .get(b.root())
                    .is_some_and(|other| other.id() == b.id())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleVersion;

    fn bundle(name: &str, version: &str, root: &str) -> Arc<Bundle> {
        Arc::new(Bundle::new(
            name,
            BundleVersion::parse(version).unwrap(),
            root,
        ))
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut state = RegistryState::default();
        assert!(state.insert(bundle("b", "1", "/x/b")).is_empty());
        assert!(state.insert(bundle("a", "1", "/x/a")).is_empty());

        assert_eq!(state.len(), 2);
        assert_eq!(state.names(), vec!["a", "b"]);
        assert_eq!(state.bundles()[0].name(), "a");
        assert_eq!(state.by_root(Path::new("/x/b")).unwrap().name(), "b");
        assert!(state.roots().contains(Path::new("/x/a")));
        assert!(state.is_consistent());
    }

    #[test]
    fn test_insert_displaces_same_name() {
        let mut state = RegistryState::default();
        let old = bundle("a", "1", "/x/a1");
        state.insert(Arc::clone(&old));

        let displaced = state.insert(bundle("a", "2", "/x/a2"));
        assert_eq!(displaced.len(), 1);
        assert_eq!(displaced[0].id(), old.id());
        assert!(state.by_root(Path::new("/x/a1")).is_none());
        assert_eq!(state.len(), 1);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_insert_displaces_same_root() {
        let mut state = RegistryState::default();
        state.insert(bundle("a", "1", "/x/shared"));

        let displaced = state.insert(bundle("b", "1", "/x/shared"));
        assert_eq!(displaced.len(), 1);
        assert!(state.by_name("a").is_none());
        assert_eq!(state.names(), vec!["b"]);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_remove_requires_same_instance() {
        let mut state = RegistryState::default();
        let active = bundle("a", "1", "/x/a");
        state.insert(Arc::clone(&active));

        let stale = bundle("a", "1", "/x/a");
        assert!(state.remove(&stale).is_none());
        assert_eq!(state.len(), 1);

        assert!(state.remove(&active).is_some());
        assert_eq!(state.len(), 0);
        assert!(state.roots().is_empty());
        assert!(state.is_consistent());
    }
}
