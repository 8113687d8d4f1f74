//! Capability interface for code that bundles delegate to.
//!
//! Bundles never ship executable code. A manifest service may name an
//! extension id, and the host resolves that id against implementations it
//! registered up front in an [`ExtensionRegistry`].

mod registry;

pub use registry::ExtensionRegistry;

use std::sync::Arc;

use serde_json::Value;

use crate::Result;

/// A named, host-provided operation.
///
/// # Example
///
/// ```rust
/// use bundle_registry::extension::Extension;
/// use serde_json::{Value, json};
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl Extension for Echo {
///     fn id(&self) -> &str {
///         "echo"
///     }
///
///     async fn invoke(&self, input: Value) -> bundle_registry::Result<Value> {
///         Ok(json!({ "echo": input }))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Extension: Send + Sync {
    /// Identifier referenced by the `extension` attribute of a service.
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn invoke(&self, input: Value) -> Result<Value>;
}

/// Cloneable handle to a registered extension.
#[derive(Clone)]
pub struct ExtensionRef(pub Arc<dyn Extension>);

impl std::fmt::Debug for ExtensionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ExtensionRef").field(&self.0.id()).finish()
    }
}

impl<E: Extension + 'static> From<E> for ExtensionRef {
    fn from(ext: E) -> Self {
        Self(Arc::new(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Upper;

    #[async_trait::async_trait]
    impl Extension for Upper {
        fn id(&self) -> &str {
            "upper"
        }

        async fn invoke(&self, input: Value) -> Result<Value> {
            Ok(Value::String(
                input.as_str().unwrap_or_default().to_uppercase(),
            ))
        }
    }

    #[tokio::test]
    async fn test_extension_ref() {
        let ext = ExtensionRef::from(Upper);
        assert_eq!(ext.0.id(), "upper");
        assert_eq!(ext.0.description(), "");
        assert_eq!(ext.0.invoke(json!("abc")).await.unwrap(), json!("ABC"));
        assert!(format!("{ext:?}").contains("upper"));
    }
}
