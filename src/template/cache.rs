use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::{CompiledTemplate, TemplateKey, TemplateKind};
use crate::bundle::{Bundle, BundleId};
use crate::observability::Counter;
use crate::{Error, Result};

struct CacheEntry {
    owner: BundleId,
    /// `None` when the last compile attempt failed.
    artifact: Option<Arc<CompiledTemplate>>,
    source_modified: SystemTime,
}

/// Template cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub compilations: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[derive(Default)]
struct Counters {
    hits: Counter,
    misses: Counter,
    compilations: Counter,
    evictions: Counter,
}

/// Compiled-template cache with per-bundle eviction scope.
///
/// Entries are only stored for bundles that are attached (installed in a
/// registry). A resolve for a detached bundle compiles and returns the
/// artifact without caching it, so nothing can be re-cached for a bundle
/// after its eviction.
///
/// Compilation is not single-flight: concurrent misses for the same key may
/// both compile, the last store wins.
#[derive(Default)]
pub struct TemplateCache {
    entries: DashMap<TemplateKey, CacheEntry>,
    owners: DashMap<BundleId, Vec<TemplateKey>>,
    counters: Counters,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking cache keys for `bundle`.
    pub fn attach(&self, bundle: &Bundle) {
        self.owners.entry(bundle.id()).or_default();
    }

    pub fn is_attached(&self, bundle: &Bundle) -> bool {
        self.owners.contains_key(&bundle.id())
    }

    pub async fn resolve_page(&self, bundle: &Bundle, name: &str) -> Result<Arc<CompiledTemplate>> {
        self.resolve(bundle, TemplateKind::Page, name).await
    }

    pub async fn resolve_mail(&self, bundle: &Bundle, name: &str) -> Result<Arc<CompiledTemplate>> {
        self.resolve(bundle, TemplateKind::Mail, name).await
    }

    pub async fn resolve(
        &self,
        bundle: &Bundle,
        kind: TemplateKind,
        name: &str,
    ) -> Result<Arc<CompiledTemplate>> {
        let (path, modified) = locate(bundle, kind, name).await?;
        let key = TemplateKey::for_path(&path);

        if let Some(artifact) = self.lookup(key, bundle.id(), modified) {
            self.counters.hits.inc();
            return Ok(artifact);
        }
        self.counters.misses.inc();

        let source = tokio::fs::read_to_string(&path).await?;
        self.counters.compilations.inc();
        match CompiledTemplate::compile(key, kind, bundle.id(), path, modified, &source) {
            Ok(compiled) => {
                let artifact = Arc::new(compiled);
                self.store(bundle.id(), key, Some(Arc::clone(&artifact)), modified);
                tracing::debug!(
                    bundle = bundle.name(),
                    kind = %kind,
                    template = name,
                    key = %key,
                    "Template compiled"
                );
                Ok(artifact)
            }
            Err(e) => {
                self.store(bundle.id(), key, None, modified);
                Err(e)
            }
        }
    }

    fn lookup(
        &self,
        key: TemplateKey,
        owner: BundleId,
        modified: SystemTime,
    ) -> Option<Arc<CompiledTemplate>> {
        let entry = self.entries.get(&key)?;
        if entry.owner != owner {
            return None;
        }
        let artifact = entry.artifact.as_ref()?;
        if modified > entry.source_modified {
            tracing::debug!(key = %key, "Template source changed since compile");
            return None;
        }
        Some(Arc::clone(artifact))
    }

    fn store(
        &self,
        owner: BundleId,
        key: TemplateKey,
        artifact: Option<Arc<CompiledTemplate>>,
        source_modified: SystemTime,
    ) -> bool {
        // Holding the owner's key list while inserting keeps evict_all from
        // running between the insert and the key registration.
        let Some(mut keys) = self.owners.get_mut(&owner) else {
            tracing::debug!(key = %key, "Bundle not attached, template not cached");
            return false;
        };
        self.entries.insert(
            key,
            CacheEntry {
                owner,
                artifact,
                source_modified,
            },
        );
        if !keys.contains(&key) {
            keys.push(key);
        }
        true
    }

    /// Removes every entry owned by `bundle` and detaches it.
    ///
    /// Returns the number of entries removed.
    pub fn evict_all(&self, bundle: &Bundle) -> usize {
        let Some((owner, keys)) = self.owners.remove(&bundle.id()) else {
            return 0;
        };
        let removed = keys
            .iter()
            .filter(|key| {
                self.entries
                    .remove_if(key, |_, entry| entry.owner == owner)
                    .is_some()
            })
            .count();
        self.counters.evictions.add(removed as u64);
        if removed > 0 {
            tracing::debug!(bundle = bundle.name(), removed, "Evicted cached templates");
        }
        removed
    }

    /// Keys currently registered for `bundle`.
    pub fn keys_for(&self, bundle: &Bundle) -> Vec<TemplateKey> {
        self.owners
            .get(&bundle.id())
            .map(|keys| keys.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, key: TemplateKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.get(),
            misses: self.counters.misses.get(),
            compilations: self.counters.compilations.get(),
            evictions: self.counters.evictions.get(),
            entries: self.entries.len(),
        }
    }
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("entries", &self.entries.len())
            .field("owners", &self.owners.len())
            .finish()
    }
}

async fn locate(bundle: &Bundle, kind: TemplateKind, name: &str) -> Result<(PathBuf, SystemTime)> {
    let not_found = || Error::TemplateNotFound {
        bundle: bundle.name().to_string(),
        kind,
        name: name.to_string(),
    };

    let base = kind.base_dir(bundle).ok_or_else(not_found)?;
    let relative = Path::new(name);
    let contained = !name.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !contained {
        return Err(not_found());
    }

    let path = base.join(relative);
    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => meta,
        _ => return Err(not_found()),
    };
    Ok((path, meta.modified()?))
}
