use std::path::PathBuf;

/// Failure to read or verify a bundle candidate.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Bundle manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("Invalid bundle manifest at {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("Invalid bundle version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Bundle root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BundleError {
    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
