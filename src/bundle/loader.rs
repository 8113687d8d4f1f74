//! Loader boundary: turns a candidate root path into a verified [`Bundle`].
//!
//! The registry only calls [`BundleLoader::load`] and reacts to success or
//! failure. [`XmlBundleLoader`] is the default implementation reading
//! `conf/bundle.xml`; applications with their own manifest handling plug in
//! a different loader.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{
    Bundle, BundleError, BundleManifest, CONFIG_DIR, DEFAULT_ENV_FILE, MAIL_DIR, PAGES_DIR,
    manifest_path,
};

#[async_trait]
pub trait BundleLoader: Send + Sync {
    /// Reads and structurally validates the bundle rooted at `root`.
    async fn load(&self, root: &Path) -> Result<Bundle, BundleError>;

    /// Loader name for logging.
    fn name(&self) -> &str {
        "bundle"
    }
}

#[derive(Debug, Clone)]
pub struct XmlBundleLoader {
    env_file_name: String,
}

impl XmlBundleLoader {
    pub fn new() -> Self {
        Self {
            env_file_name: DEFAULT_ENV_FILE.to_string(),
        }
    }

    /// Uses `name` under `conf/` as the optional environment file.
    pub fn with_env_file_name(mut self, name: impl Into<String>) -> Self {
        self.env_file_name = name.into();
        self
    }

    pub fn env_file_name(&self) -> &str {
        &self.env_file_name
    }

    async fn existing_dir(path: PathBuf) -> Option<PathBuf> {
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Some(path),
            _ => None,
        }
    }

    async fn existing_file(path: PathBuf) -> Option<PathBuf> {
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }
}

impl Default for XmlBundleLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BundleLoader for XmlBundleLoader {
    async fn load(&self, root: &Path) -> Result<Bundle, BundleError> {
        match tokio::fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(BundleError::NotADirectory {
                    path: root.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let config_file = manifest_path(root);
        let manifest = BundleManifest::load(&config_file)
            .await?
            .verify(&config_file)?;

        let mut bundle = Bundle::from_manifest(manifest, root);
        if let Some(env) =
            Self::existing_file(root.join(CONFIG_DIR).join(&self.env_file_name)).await
        {
            bundle = bundle.with_env_file(env);
        }
        if let Some(pages) = Self::existing_dir(root.join(PAGES_DIR)).await {
            bundle = bundle.with_pages_dir(pages);
        }
        if let Some(mail) = Self::existing_dir(root.join(MAIL_DIR)).await {
            bundle = bundle.with_mail_dir(mail);
        }

        tracing::debug!(
            bundle = bundle.name(),
            version = %bundle.version(),
            root = %root.display(),
            "Bundle verified"
        );
        Ok(bundle)
    }

    fn name(&self) -> &str {
        "xml"
    }
}
