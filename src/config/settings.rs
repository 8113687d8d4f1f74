//! Registry settings resolved from a [`ConfigProvider`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::provider::{ConfigProvider, ConfigProviderExt};
use super::{ConfigError, ConfigResult};
use crate::bundle::DEFAULT_ENV_FILE;

pub const KEY_BASE_DIR: &str = "base_dir";
pub const KEY_SCAN_INTERVAL_MS: &str = "scan.interval_ms";
pub const KEY_ENV_FILE: &str = "env_file";

/// Where bundles live and how often the registry looks for changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub base_dir: PathBuf,
    /// Minimum time between two scans. Zero disables debouncing.
    pub scan_interval: Duration,
    /// Name of the optional environment file inside `conf/`.
    pub env_file_name: String,
}

impl RegistryConfig {
    pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(5);

    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            scan_interval: Self::DEFAULT_SCAN_INTERVAL,
            env_file_name: DEFAULT_ENV_FILE.to_string(),
        }
    }

    pub fn scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    pub fn env_file_name(mut self, name: impl Into<String>) -> Self {
        self.env_file_name = name.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Per-user data directory, e.g. `~/.local/share/bundle-registry/bundles`.
    pub fn default_base_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bundle-registry")
            .map(|dirs| dirs.data_dir().join("bundles"))
    }

    /// Resolve settings from a provider.
    ///
    /// `base_dir` falls back to [`Self::default_base_dir`] and fails with
    /// [`ConfigError::NotFound`] when neither is available.
    pub async fn from_provider<P>(provider: &P) -> ConfigResult<Self>
    where
        P: ConfigProvider + ?Sized,
    {
        let base_dir = match provider.get_raw(KEY_BASE_DIR).await? {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
            _ => Self::default_base_dir().ok_or_else(|| ConfigError::NotFound {
                key: KEY_BASE_DIR.to_string(),
            })?,
        };

        let mut config = Self::new(base_dir);

        if let Some(ms) = provider.get_parsed::<u64>(KEY_SCAN_INTERVAL_MS).await? {
            config.scan_interval = Duration::from_millis(ms);
        }

        if let Some(name) = provider.get_raw(KEY_ENV_FILE).await? {
            let name = name.trim();
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::InvalidValue {
                    key: KEY_ENV_FILE.to_string(),
                    message: format!("'{name}' is not a plain file name"),
                });
            }
            config.env_file_name = name.to_string();
        }

        tracing::debug!(
            provider = provider.name(),
            base_dir = %config.base_dir.display(),
            scan_interval_ms = config.scan_interval.as_millis() as u64,
            "registry config resolved"
        );
        Ok(config)
    }
}
