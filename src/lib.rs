//! # bundle-registry
//!
//! Discovers, validates and hot-reloads self-contained content bundles from
//! a base directory, and caches the page and mail templates they ship.
//!
//! A bundle is a directory holding `conf/bundle.xml`. The registry keeps
//! one active bundle per name, rescans the base directory at most once per
//! scan interval, and reloads a bundle only when its configuration actually
//! changed.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bundle_registry::{BundleRegistry, RegistryConfig};
//!
//! #[tokio::main]
//! async fn main() -> bundle_registry::Result<()> {
//!     let registry = Arc::new(BundleRegistry::new(RegistryConfig::new("/srv/bundles")));
//!
//!     for name in registry.names().await {
//!         println!("{name}");
//!     }
//!
//!     if let Some(bundle) = registry.get("tcoffee").await {
//!         let page = registry.resolve_page(&bundle, "index.html").await?;
//!         println!("{}", page.render(&serde_json::json!({ "title": "T-Coffee" }))?);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod bundle;
pub mod config;
pub mod extension;
pub mod observability;
pub mod prelude;
pub mod registry;
pub mod scan;
pub mod template;

pub use bundle::{Bundle, BundleError, BundleId, BundleLoader, BundleVersion, ServiceDecl, XmlBundleLoader};
pub use config::{ConfigError, RegistryConfig};
pub use extension::{Extension, ExtensionRegistry};
pub use registry::{BundleRegistry, Rejection, ScanFailure, ScanReport};
pub use scan::{Fingerprint, PathScanner, SetDiff};
pub use template::{CompiledTemplate, TemplateCache, TemplateKind};

use std::path::PathBuf;

/// Errors surfaced by explicit registry, template and extension operations.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("Bundle '{name}' {installed} is installed; refusing {candidate}")]
    VersionConflict {
        name: String,
        installed: BundleVersion,
        candidate: BundleVersion,
    },

    #[error("{root} is already installed as '{name}'")]
    AlreadyInstalled { root: PathBuf, name: String },

    #[error("Bundle '{name}' is not installed")]
    NotInstalled { name: String },

    #[error("Failed to drop {root}: {reason}")]
    DropFailed { root: PathBuf, reason: String },

    #[error("Bundle '{bundle}' has no {kind} template '{name}'")]
    TemplateNotFound {
        bundle: String,
        kind: TemplateKind,
        name: String,
    },

    #[error("Template {path} failed to compile: {reason}")]
    TemplateCompile { path: PathBuf, reason: String },

    #[error("Template {path} failed to render: {reason}")]
    TemplateRender { path: PathBuf, reason: String },

    #[error("Extension not found: {0}")]
    ExtensionNotFound(String),

    #[error("Extension '{id}' failed: {message}")]
    Extension { id: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A bundle failed structural or manifest checks
    Verification,
    /// Version rule or identity clash with an installed bundle
    Conflict,
    /// The requested bundle, template or extension does not exist
    NotFound,
    /// Template compile or render failures
    Template,
    /// Configuration, parsing, or setup errors
    Configuration,
    /// Filesystem and other unexpected failures
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Bundle(_) => ErrorCategory::Verification,

            Error::VersionConflict { .. } | Error::AlreadyInstalled { .. } => {
                ErrorCategory::Conflict
            }

            Error::NotInstalled { .. }
            | Error::TemplateNotFound { .. }
            | Error::ExtensionNotFound(_) => ErrorCategory::NotFound,

            Error::TemplateCompile { .. } | Error::TemplateRender { .. } => {
                ErrorCategory::Template
            }

            Error::Config(_) => ErrorCategory::Configuration,

            Error::DropFailed { .. } | Error::Extension { .. } | Error::Io(_) | Error::Json(_) => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }
}

/// Result type alias for bundle-registry operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let v = |s| BundleVersion::parse(s).unwrap();

        assert_eq!(
            Error::VersionConflict {
                name: "tcoffee".into(),
                installed: v("2.0"),
                candidate: v("1.0"),
            }
            .category(),
            ErrorCategory::Conflict
        );
        assert!(
            Error::TemplateNotFound {
                bundle: "tcoffee".into(),
                kind: TemplateKind::Mail,
                name: "done.txt".into(),
            }
            .is_not_found()
        );
        assert_eq!(
            Error::DropFailed {
                root: "/srv/bundles/x".into(),
                reason: "still present".into(),
            }
            .category(),
            ErrorCategory::Internal
        );
        assert_eq!(
            Error::from(BundleError::NotADirectory {
                path: "/tmp/x".into()
            })
            .category(),
            ErrorCategory::Verification
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::VersionConflict {
            name: "tcoffee".into(),
            installed: BundleVersion::parse("2.0").unwrap(),
            candidate: BundleVersion::parse("1.5").unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tcoffee"));
        assert!(msg.contains("2.0"));
        assert!(msg.contains("1.5"));

        let err = Error::TemplateNotFound {
            bundle: "tcoffee".into(),
            kind: TemplateKind::Page,
            name: "index.html".into(),
        };
        assert_eq!(err.to_string(), "Bundle 'tcoffee' has no page template 'index.html'");
    }
}
