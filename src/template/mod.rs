//! Compiled page and mail templates, cached per source file.
//!
//! Page and mail templates use the same algorithm with a different base
//! directory. Each cache entry is owned by the bundle instance that compiled
//! it; unloading the bundle evicts all of its entries.

mod cache;

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use handlebars::{Handlebars, Template};
use serde::{Deserialize, Serialize};

pub use cache::{CacheStats, TemplateCache};

use crate::bundle::{Bundle, BundleId};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Page,
    Mail,
}

impl TemplateKind {
    pub fn base_dir(self, bundle: &Bundle) -> Option<&Path> {
        match self {
            TemplateKind::Page => bundle.pages_dir(),
            TemplateKind::Mail => bundle.mail_dir(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::Page => "page",
            TemplateKind::Mail => "mail",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key derived from a template's resolved source path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey(u64);

impl TemplateKey {
    pub fn for_path(path: &Path) -> Self {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        Self(hasher.finish())
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    key: TemplateKey,
    kind: TemplateKind,
    owner: BundleId,
    source_path: PathBuf,
    source_modified: SystemTime,
    compiled_at: DateTime<Utc>,
    template: Template,
}

impl CompiledTemplate {
    pub(crate) fn compile(
        key: TemplateKey,
        kind: TemplateKind,
        owner: BundleId,
        source_path: PathBuf,
        source_modified: SystemTime,
        source: &str,
    ) -> Result<Self> {
        let template = Template::compile(source).map_err(|e| Error::TemplateCompile {
            path: source_path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            key,
            kind,
            owner,
            source_path,
            source_modified,
            compiled_at: Utc::now(),
            template,
        })
    }

    pub fn key(&self) -> TemplateKey {
        self.key
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Bundle instance the artifact was compiled for.
    pub fn owner(&self) -> BundleId {
        self.owner
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Source modification time observed at compile time.
    pub fn source_modified(&self) -> SystemTime {
        self.source_modified
    }

    pub fn compiled_at(&self) -> DateTime<Utc> {
        self.compiled_at
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Renders the compiled template against `data`.
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        let name = self.key.to_string();
        let mut registry = Handlebars::new();
        registry.register_template(&name, self.template.clone());
        registry
            .render(&name, data)
            .map_err(|e| Error::TemplateRender {
                path: self.source_path.clone(),
                reason: e.to_string(),
            })
    }
}
