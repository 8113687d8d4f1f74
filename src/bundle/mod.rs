//! Bundles: named, versioned content units discovered from a directory tree.
//!
//! A bundle root is an immediate child of the configured base directory that
//! contains a `conf/bundle.xml` manifest:
//!
//! ```text
//! bundles/
//! └── tcoffee/
//!     ├── conf/
//!     │   ├── bundle.xml
//!     │   └── environment.properties   (optional)
//!     ├── pages/                       (optional page templates)
//!     └── mail/                        (optional mail templates)
//! ```

mod error;
mod loader;
mod manifest;
mod version;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use error::BundleError;
pub use loader::{BundleLoader, XmlBundleLoader};
pub use manifest::{BundleManifest, VerifiedManifest};
pub use version::BundleVersion;

use crate::scan::Fingerprint;

pub const CONFIG_DIR: &str = "conf";
pub const MANIFEST_FILE: &str = "bundle.xml";
pub const PAGES_DIR: &str = "pages";
pub const MAIL_DIR: &str = "mail";
pub const DEFAULT_ENV_FILE: &str = "environment.properties";

/// Path of the marker manifest for a candidate root.
pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(MANIFEST_FILE)
}

/// Identity of one loaded bundle instance.
///
/// Reloading a bundle from the same root yields a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BundleId(Uuid);

impl BundleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BundleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A service a bundle declares for the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Extension id the service executes through, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl ServiceDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            extension: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

/// Validated bundle value object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    id: BundleId,
    name: String,
    version: BundleVersion,
    title: Option<String>,
    description: Option<String>,
    root: PathBuf,
    config_file: PathBuf,
    env_file: Option<PathBuf>,
    pages_dir: Option<PathBuf>,
    mail_dir: Option<PathBuf>,
    fingerprint: Fingerprint,
    services: Vec<ServiceDecl>,
    loaded_at: DateTime<Utc>,
}

impl Bundle {
    /// Creates a bundle rooted at `root` with the standard manifest location
    /// and no optional directories.
    pub fn new(name: impl Into<String>, version: BundleVersion, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            id: BundleId::new(),
            name: name.into(),
            version,
            title: None,
            description: None,
            config_file: manifest_path(&root),
            root,
            env_file: None,
            pages_dir: None,
            mail_dir: None,
            fingerprint: Fingerprint::default(),
            services: Vec::new(),
            loaded_at: Utc::now(),
        }
    }

    pub fn from_manifest(manifest: VerifiedManifest, root: impl Into<PathBuf>) -> Self {
        let mut bundle = Self::new(manifest.name, manifest.version, root);
        bundle.title = manifest.title;
        bundle.description = manifest.description;
        bundle.services = manifest.services;
        bundle
    }

    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn with_pages_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.pages_dir = Some(path.into());
        self
    }

    pub fn with_mail_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.mail_dir = Some(path.into());
        self
    }

    pub fn with_services(mut self, services: Vec<ServiceDecl>) -> Self {
        self.services = services;
        self
    }

    pub(crate) fn set_fingerprint(&mut self, fingerprint: Fingerprint) {
        self.fingerprint = fingerprint;
    }

    pub fn id(&self) -> BundleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &BundleVersion {
        &self.version
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn conf_dir(&self) -> PathBuf {
        self.root.join(CONFIG_DIR)
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn env_file(&self) -> Option<&Path> {
        self.env_file.as_deref()
    }

    pub fn pages_dir(&self) -> Option<&Path> {
        self.pages_dir.as_deref()
    }

    pub fn mail_dir(&self) -> Option<&Path> {
        self.mail_dir.as_deref()
    }

    /// Fingerprint observed when this instance was loaded.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn services(&self) -> &[ServiceDecl] {
        &self.services
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDecl> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version, self.root.display())
    }
}
