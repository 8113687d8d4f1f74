//! Active bundle registry.
//!
//! [`BundleRegistry`] owns the set of active bundles, indexed by name and by
//! root path. Read accessors opportunistically run a debounced scan of the
//! base directory; explicit `load`, `unload` and `drop_bundle` calls, as well
//! as scans, are serialized by a single mutation lock so the two indexes are
//! always updated together.
//!
//! Scan-time problems never abort a scan: each candidate is processed in
//! isolation and failures are collected into [`BundleRegistry::errors`].

mod report;
mod state;
mod watcher;

pub use report::{Rejection, ScanFailure, ScanReport};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, RwLock};
use tracing::Instrument;

use crate::bundle::{Bundle, BundleError, BundleLoader, ServiceDecl, XmlBundleLoader};
use crate::config::RegistryConfig;
use crate::observability::{RegistryMetrics, bundle_span, scan_span};
use crate::scan::{Fingerprint, PathScanner, SetDiff};
use crate::template::{CompiledTemplate, TemplateCache};
use crate::{Error, Result};

use state::RegistryState;

enum Install {
    Installed {
        bundle: Arc<Bundle>,
        displaced: Vec<Arc<Bundle>>,
    },
    Rejected {
        candidate: Bundle,
        installed: Arc<Bundle>,
    },
}

pub struct BundleRegistry {
    config: RegistryConfig,
    loader: Arc<dyn BundleLoader>,
    templates: Arc<TemplateCache>,
    state: RwLock<RegistryState>,
    mutation: Mutex<()>,
    metrics: RegistryMetrics,
}

impl BundleRegistry {
    /// Registry reading `conf/bundle.xml` manifests with [`XmlBundleLoader`].
    pub fn new(config: RegistryConfig) -> Self {
        let loader = XmlBundleLoader::new().with_env_file_name(config.env_file_name.clone());
        Self::with_loader(config, Arc::new(loader))
    }

    pub fn with_loader(config: RegistryConfig, loader: Arc<dyn BundleLoader>) -> Self {
        Self {
            config,
            loader,
            templates: Arc::new(TemplateCache::new()),
            state: RwLock::new(RegistryState::default()),
            mutation: Mutex::new(()),
            metrics: RegistryMetrics::new(),
        }
    }

    /// Shares an existing template cache. Call before any bundle is loaded.
    pub fn with_template_cache(mut self, templates: Arc<TemplateCache>) -> Self {
        self.templates = templates;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn base_dir(&self) -> &Path {
        &self.config.base_dir
    }

    pub fn templates(&self) -> &Arc<TemplateCache> {
        &self.templates
    }

    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }

    // Read accessors. Each one runs a debounced scan first.

    pub async fn get(&self, name: &str) -> Option<Arc<Bundle>> {
        self.detect_changes().await;
        self.state.read().await.by_name(name).cloned()
    }

    /// Active bundle names, sorted.
    pub async fn names(&self) -> Vec<String> {
        self.detect_changes().await;
        self.state.read().await.names()
    }

    /// Snapshot of the active bundles, sorted by name.
    pub async fn bundles(&self) -> Vec<Arc<Bundle>> {
        self.detect_changes().await;
        self.state.read().await.bundles()
    }

    /// First active bundle, by name, declaring `service`.
    pub async fn find_service(&self, service: &str) -> Option<(Arc<Bundle>, ServiceDecl)> {
        self.bundles().await.into_iter().find_map(|bundle| {
            let decl = bundle.service(service)?.clone();
            Some((bundle, decl))
        })
    }

    /// Failure and rejection lines from the most recent scan.
    pub async fn errors(&self) -> Vec<String> {
        self.state.read().await.errors.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn resolve_page(&self, bundle: &Bundle, name: &str) -> Result<Arc<CompiledTemplate>> {
        self.templates.resolve_page(bundle, name).await
    }

    pub async fn resolve_mail(&self, bundle: &Bundle, name: &str) -> Result<Arc<CompiledTemplate>> {
        self.templates.resolve_mail(bundle, name).await
    }

    // Mutations.

    /// Scans the base directory unless the last scan finished less than
    /// `scan_interval` ago. Returns `None` when debounced.
    pub async fn detect_changes(&self) -> Option<ScanReport> {
        if !self.scan_due().await {
            tracing::trace!("Bundle scan debounced");
            return None;
        }

        let _guard = self.mutation.lock().await;
        // Another caller may have finished a scan while we waited.
        if !self.scan_due().await {
            tracing::debug!("Bundle scan already completed by a concurrent caller");
            return None;
        }
        Some(self.scan_locked().await)
    }

    /// Scans immediately, ignoring the debounce window.
    pub async fn rescan(&self) -> ScanReport {
        let _guard = self.mutation.lock().await;
        self.scan_locked().await
    }

    /// Reads, verifies and installs the bundle at `path`.
    ///
    /// Fails with [`Error::AlreadyInstalled`] when the root is already
    /// active and with [`Error::VersionConflict`] when an equal or higher
    /// version of the same name is active.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<Arc<Bundle>> {
        let _guard = self.mutation.lock().await;
        let root = normalize_root(path.as_ref()).await?;

        if let Some(active) = self.state.read().await.by_root(&root) {
            return Err(Error::AlreadyInstalled {
                root,
                name: active.name().to_string(),
            });
        }

        let candidate = self.read_candidate(&root).await?;
        match self.install_locked(candidate).await {
            Install::Installed { bundle, .. } => Ok(bundle),
            Install::Rejected {
                candidate,
                installed,
            } => {
                self.metrics.rejections.inc();
                Err(Error::VersionConflict {
                    name: candidate.name().to_string(),
                    installed: installed.version().clone(),
                    candidate: candidate.version().clone(),
                })
            }
        }
    }

    /// Removes `bundle` from both indexes and evicts its cached templates.
    ///
    /// Returns `false` when this instance is not the active one.
    pub async fn unload(&self, bundle: &Bundle) -> bool {
        let _guard = self.mutation.lock().await;
        self.unload_locked(bundle).await
    }

    /// Unloads `bundle` and deletes its root directory.
    ///
    /// The unload is not rolled back if deletion fails; the error then only
    /// concerns the directory left on disk.
    pub async fn drop_bundle(&self, bundle: &Bundle) -> Result<()> {
        let _guard = self.mutation.lock().await;
        if !self.unload_locked(bundle).await {
            return Err(Error::NotInstalled {
                name: bundle.name().to_string(),
            });
        }

        let root = bundle.root();
        let removal = tokio::fs::remove_dir_all(root).await;
        let still_exists = tokio::fs::try_exists(root).await.unwrap_or(true);
        if !still_exists {
            self.metrics.drops.inc();
            tracing::info!(bundle = bundle.name(), root = %root.display(), "Bundle dropped");
            return Ok(());
        }

        let reason = match removal {
            Err(e) => e.to_string(),
            Ok(()) => "directory still exists after removal".to_string(),
        };
        tracing::error!(bundle = bundle.name(), root = %root.display(), reason = %reason, "Bundle drop failed");
        Err(Error::DropFailed {
            root: root.to_path_buf(),
            reason,
        })
    }

    async fn scan_due(&self) -> bool {
        let interval = self.config.scan_interval;
        self.state
            .read()
            .await
            .last_scan
            .is_none_or(|last| last.elapsed() >= interval)
    }

    async fn scan_locked(&self) -> ScanReport {
        let span = scan_span(&self.config.base_dir);
        async {
            let started = Instant::now();
            let installed = {
                let mut state = self.state.write().await;
                state.errors.clear();
                state.roots()
            };
            let found = PathScanner::scan(&self.config.base_dir).await;
            let diff = SetDiff::compute(&installed, &found);
            let mut report = ScanReport::default();

            for root in sorted(&diff.new) {
                self.install_from(root, false, &mut report).await;
            }

            for root in sorted(&diff.dropped) {
                let active = self.state.read().await.by_root(root).cloned();
                match active {
                    Some(bundle) => {
                        if self.unload_locked(&bundle).await {
                            report.unloaded.push(bundle.name().to_string());
                        }
                    }
                    None => {
                        tracing::warn!(root = %root.display(), "Vanished bundle already unloaded")
                    }
                }
            }

            for root in sorted(&diff.existing) {
                let Some(active) = self.state.read().await.by_root(root).cloned() else {
                    continue;
                };
                match Fingerprint::of_bundle(&active).await {
                    Ok(current) if current == active.fingerprint() => continue,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(root = %root.display(), error = %e, "Fingerprint unreadable, reloading")
                    }
                }
                self.unload_locked(&active).await;
                match self.install_from(root, true, &mut report).await {
                    Some(bundle) => {
                        self.metrics.reloads.inc();
                        tracing::info!(bundle = bundle.name(), version = %bundle.version(), "Bundle reloaded");
                        report.reloaded.push(bundle.name().to_string());
                    }
                    None => report.unloaded.push(active.name().to_string()),
                }
            }

            report.duration = started.elapsed();
            {
                let mut state = self.state.write().await;
                state.errors = report.messages();
                state.last_scan = Some(Instant::now());
            }

            self.metrics.scans.inc();
            self.metrics
                .scan_duration_ms
                .observe(report.duration.as_secs_f64() * 1000.0);
            if report.has_changes() || !report.failures.is_empty() {
                tracing::info!(
                    installed = report.installed.len(),
                    reloaded = report.reloaded.len(),
                    unloaded = report.unloaded.len(),
                    superseded = report.superseded.len(),
                    rejected = report.rejected.len(),
                    failed = report.failures.len(),
                    duration_ms = report.duration.as_millis() as u64,
                    "Bundle scan complete"
                );
            }
            report
        }
        .instrument(span)
        .await
    }

    /// Loads and installs the candidate at `root`, recording the outcome.
    /// Reloads are reported by the caller.
    async fn install_from(
        &self,
        root: &Path,
        reload: bool,
        report: &mut ScanReport,
    ) -> Option<Arc<Bundle>> {
        let candidate = match self.read_candidate(root).await {
            Ok(candidate) => candidate,
            Err(e) => {
                self.metrics.failures.inc();
                tracing::warn!(root = %root.display(), loader = self.loader.name(), error = %e, "Bundle verification failed");
                report.failures.push(ScanFailure {
                    root: root.to_path_buf(),
                    reason: e.to_string(),
                });
                return None;
            }
        };

        match self.install_locked(candidate).await {
            Install::Installed { bundle, displaced } => {
                report
                    .superseded
                    .extend(displaced.iter().map(|old| old.name().to_string()));
                if !reload {
                    report.installed.push(bundle.name().to_string());
                }
                Some(bundle)
            }
            Install::Rejected {
                candidate,
                installed,
            } => {
                self.metrics.rejections.inc();
                report.rejected.push(Rejection {
                    root: root.to_path_buf(),
                    name: candidate.name().to_string(),
                    candidate: candidate.version().clone(),
                    installed: installed.version().clone(),
                });
                None
            }
        }
    }

    async fn read_candidate(&self, root: &Path) -> std::result::Result<Bundle, BundleError> {
        let mut bundle = self.loader.load(root).await?;
        let fingerprint = Fingerprint::of_bundle(&bundle).await?;
        bundle.set_fingerprint(fingerprint);
        Ok(bundle)
    }

    /// Applies the version rule and installs under one write guard.
    async fn install_locked(&self, candidate: Bundle) -> Install {
        let mut state = self.state.write().await;

        if let Some(active) = state.by_name(candidate.name())
            && candidate.version() <= active.version()
        {
            tracing::warn!(
                bundle = candidate.name(),
                candidate = %candidate.version(),
                installed = %active.version(),
                root = %candidate.root().display(),
                "Bundle rejected, equal or higher version installed"
            );
            return Install::Rejected {
                candidate,
                installed: Arc::clone(active),
            };
        }

        let bundle = Arc::new(candidate);
        self.templates.attach(&bundle);
        let displaced = state.insert(Arc::clone(&bundle));
        for old in &displaced {
            let evicted = self.templates.evict_all(old);
            self.metrics.unloads.inc();
            tracing::info!(
                bundle = old.name(),
                version = %old.version(),
                replacement = %bundle.version(),
                evicted,
                "Bundle superseded"
            );
        }
        self.metrics.loads.inc();
        self.metrics.active_bundles.set(state.len() as i64);
        debug_assert!(state.is_consistent());
        drop(state);

        bundle_span(&bundle).in_scope(|| {
            tracing::info!(
                root = %bundle.root().display(),
                services = bundle.services().len(),
                "Bundle installed"
            )
        });
        Install::Installed { bundle, displaced }
    }

    async fn unload_locked(&self, bundle: &Bundle) -> bool {
        let mut state = self.state.write().await;
        let Some(removed) = state.remove(bundle) else {
            tracing::warn!(bundle = bundle.name(), id = %bundle.id(), "Unload of inactive bundle ignored");
            return false;
        };
        let evicted = self.templates.evict_all(&removed);
        self.metrics.unloads.inc();
        self.metrics.active_bundles.set(state.len() as i64);
        drop(state);

        tracing::info!(
            bundle = removed.name(),
            version = %removed.version(),
            evicted,
            "Bundle unloaded"
        );
        true
    }
}

impl std::fmt::Debug for BundleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleRegistry")
            .field("base_dir", &self.config.base_dir)
            .field("loader", &self.loader.name())
            .finish_non_exhaustive()
    }
}

fn sorted(paths: &HashSet<PathBuf>) -> Vec<&PathBuf> {
    let mut paths: Vec<&PathBuf> = paths.iter().collect();
    paths.sort();
    paths
}

/// Canonical parent joined with the final component, the form
/// [`PathScanner`] reports roots in.
async fn normalize_root(path: &Path) -> std::result::Result<PathBuf, BundleError> {
    let not_a_dir = || BundleError::NotADirectory {
        path: path.to_path_buf(),
    };
    let name = path.file_name().ok_or_else(not_a_dir)?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent = tokio::fs::canonicalize(parent)
        .await
        .map_err(|_| not_a_dir())?;
    Ok(parent.join(name))
}
