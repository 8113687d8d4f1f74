//! Cheap change-detection value for a bundle's configuration.
//!
//! Folds, in order: the sorted file names of the configuration directory,
//! the manifest's modification time and size, and (when present) the
//! environment file's modification time and size. Not a content hash; it only
//! answers "did anything observable change since the last load?".

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::fs::Metadata;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub async fn compute(
        conf_dir: &Path,
        config_file: &Path,
        env_file: Option<&Path>,
    ) -> io::Result<Self> {
        let mut hasher = DefaultHasher::new();

        // Listing order is filesystem dependent.
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(conf_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name());
        }
        names.sort();
        names.len().hash(&mut hasher);
        for name in &names {
            name.hash(&mut hasher);
        }

        let config = tokio::fs::metadata(config_file).await?;
        fold_metadata(&mut hasher, &config);

        match env_file {
            Some(env) => match tokio::fs::metadata(env).await {
                Ok(meta) => {
                    1u8.hash(&mut hasher);
                    fold_metadata(&mut hasher, &meta);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => 0u8.hash(&mut hasher),
                Err(e) => return Err(e),
            },
            None => 0u8.hash(&mut hasher),
        }

        Ok(Self(hasher.finish()))
    }

    /// Recomputes the fingerprint from the bundle's current files on disk.
    pub async fn of_bundle(bundle: &Bundle) -> io::Result<Self> {
        Self::compute(&bundle.conf_dir(), bundle.config_file(), bundle.env_file()).await
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

fn fold_metadata(hasher: &mut DefaultHasher, meta: &Metadata) {
    let modified = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    modified.hash(hasher);
    meta.len().hash(hasher);
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};
    use tempfile::{TempDir, tempdir};

    struct Layout {
        _dir: TempDir,
        conf: PathBuf,
        config: PathBuf,
        env: PathBuf,
    }

    fn layout() -> Layout {
        let dir = tempdir().unwrap();
        let conf = dir.path().join("conf");
        std::fs::create_dir(&conf).unwrap();
        let config = conf.join("bundle.xml");
        std::fs::write(&config, r#"<bundle name="x" version="1"/>"#).unwrap();
        set_mtime(&config, 1_000);
        Layout {
            env: conf.join("environment.properties"),
            _dir: dir,
            conf,
            config,
        }
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    async fn fingerprint(l: &Layout) -> Fingerprint {
        Fingerprint::compute(&l.conf, &l.config, Some(&l.env))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_stable_for_untouched_files() {
        let l = layout();
        assert_eq!(fingerprint(&l).await, fingerprint(&l).await);
    }

    #[tokio::test]
    async fn test_config_mtime_changes_fingerprint() {
        let l = layout();
        let before = fingerprint(&l).await;
        set_mtime(&l.config, 2_000);
        assert_ne!(before, fingerprint(&l).await);
    }

    #[tokio::test]
    async fn test_config_size_changes_fingerprint() {
        let l = layout();
        let before = fingerprint(&l).await;
        std::fs::write(&l.config, r#"<bundle name="x" version="1.0.1"/>"#).unwrap();
        set_mtime(&l.config, 1_000);
        assert_ne!(before, fingerprint(&l).await);
    }

    #[tokio::test]
    async fn test_env_file_participates() {
        let l = layout();
        let without = fingerprint(&l).await;

        std::fs::write(&l.env, "THREADS=4").unwrap();
        set_mtime(&l.env, 5_000);
        let with = fingerprint(&l).await;
        assert_ne!(without, with);

        set_mtime(&l.env, 6_000);
        assert_ne!(with, fingerprint(&l).await);
    }

    #[tokio::test]
    async fn test_new_conf_file_changes_fingerprint() {
        let l = layout();
        let before = fingerprint(&l).await;
        std::fs::write(l.conf.join("extra.xml"), "").unwrap();
        assert_ne!(before, fingerprint(&l).await);
    }

    #[tokio::test]
    async fn test_identical_contents_identical_fingerprints() {
        let a = layout();
        let b = layout();
        for l in [&a, &b] {
            std::fs::write(l.conf.join("b.txt"), "").unwrap();
            std::fs::write(l.conf.join("a.txt"), "").unwrap();
        }
        assert_eq!(fingerprint(&a).await, fingerprint(&b).await);
    }

    #[tokio::test]
    async fn test_missing_config_is_error() {
        let l = layout();
        std::fs::remove_file(&l.config).unwrap();
        assert!(
            Fingerprint::compute(&l.conf, &l.config, None)
                .await
                .is_err()
        );
    }

    #[test]
    fn test_display_hex() {
        assert_eq!(Fingerprint(255).to_string(), "00000000000000ff");
    }
}
