//! Prelude module for convenient imports.
//!
//! ```rust
//! use bundle_registry::prelude::*;
//! ```

pub use crate::Error;
pub use crate::Result;

pub use crate::bundle::{Bundle, BundleId, BundleLoader, BundleVersion, ServiceDecl, XmlBundleLoader};
pub use crate::config::{ConfigBuilder, ConfigProvider, RegistryConfig};
pub use crate::extension::{Extension, ExtensionRegistry};
pub use crate::registry::{BundleRegistry, ScanReport};
pub use crate::template::{CompiledTemplate, TemplateCache, TemplateKind};
