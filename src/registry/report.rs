//! Outcome of one scan cycle.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bundle::BundleVersion;

/// A verified candidate discarded because an equal or higher version of the
/// same name is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub root: PathBuf,
    pub name: String,
    pub candidate: BundleVersion,
    pub installed: BundleVersion,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "warning: {} {} at {} ignored, version {} is already installed",
            self.name,
            self.candidate,
            self.root.display(),
            self.installed
        )
    }
}

/// A candidate that could not be read or verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub root: PathBuf,
    pub reason: String,
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.root.display(), self.reason)
    }
}

/// What a scan changed. Entries are bundle names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub installed: Vec<String>,
    pub reloaded: Vec<String>,
    /// Removed because their root disappeared or a reload failed.
    pub unloaded: Vec<String>,
    /// Replaced by a strictly higher version.
    pub superseded: Vec<String>,
    pub rejected: Vec<Rejection>,
    pub failures: Vec<ScanFailure>,
    pub duration: Duration,
}

impl ScanReport {
    pub fn has_changes(&self) -> bool {
        !(self.installed.is_empty()
            && self.reloaded.is_empty()
            && self.unloaded.is_empty()
            && self.superseded.is_empty())
    }

    /// Human-readable failure and rejection lines, in that order.
    pub fn messages(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(ToString::to_string)
            .chain(self.rejected.iter().map(ToString::to_string))
            .collect()
    }
}
