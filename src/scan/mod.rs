//! Filesystem side of the scan cycle: candidate discovery, set algebra over
//! root snapshots, and the content fingerprint used to decide reloads.

mod diff;
mod fingerprint;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub use diff::SetDiff;
pub use fingerprint::Fingerprint;

use crate::bundle::manifest_path;

pub struct PathScanner;

impl PathScanner {
    /// Returns the immediate subdirectories of `base` that contain
    /// `conf/bundle.xml`.
    ///
    /// An unreadable base directory yields an empty set.
    pub async fn scan(base: &Path) -> HashSet<PathBuf> {
        let mut roots = HashSet::new();

        let base = match tokio::fs::canonicalize(base).await {
            Ok(base) => base,
            Err(e) => {
                tracing::debug!(base = %base.display(), error = %e, "Bundle base directory unreadable");
                return roots;
            }
        };

        let mut entries = match tokio::fs::read_dir(&base).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(base = %base.display(), error = %e, "Bundle base directory unreadable");
                return roots;
            }
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if Self::is_bundle_root(&path).await {
                        roots.insert(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(base = %base.display(), error = %e, "Failed to read directory entry");
                    break;
                }
            }
        }

        roots
    }

    pub async fn is_bundle_root(dir: &Path) -> bool {
        let is_dir = tokio::fs::metadata(dir)
            .await
            .is_ok_and(|meta| meta.is_dir());
        is_dir
            && tokio::fs::metadata(manifest_path(dir))
                .await
                .is_ok_and(|meta| meta.is_file())
    }
}
