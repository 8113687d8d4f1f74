//! Name-to-implementation table for extensions.

use std::collections::HashMap;

use serde_json::{Value, json};

use super::{Extension, ExtensionRef};
use crate::bundle::Bundle;
use crate::{Error, Result};

#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    extensions: HashMap<String, ExtensionRef>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extension, replacing any previous one with the same id.
    pub fn register<E: Extension + 'static>(&mut self, ext: E) -> &mut Self {
        self.register_ref(ExtensionRef::from(ext))
    }

    pub fn register_ref(&mut self, ext: ExtensionRef) -> &mut Self {
        let id = ext.0.id().to_string();
        if self.extensions.insert(id.clone(), ext).is_some() {
            tracing::warn!(extension = %id, "extension replaced");
        }
        self
    }

    pub fn get(&self, id: &str) -> Option<&ExtensionRef> {
        self.extensions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.extensions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.extensions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub async fn invoke(&self, id: &str, input: Value) -> Result<Value> {
        let ext = self
            .get(id)
            .ok_or_else(|| Error::ExtensionNotFound(id.to_string()))?;
        tracing::debug!(extension = id, "invoking extension");
        ext.0.invoke(input).await
    }

    /// Dispatches a service declared by `bundle` to its extension.
    ///
    /// The extension receives
    /// `{"bundle": name, "version": version, "service": service, "input": input}`.
    pub async fn invoke_service(
        &self,
        bundle: &Bundle,
        service: &str,
        input: Value,
    ) -> Result<Value> {
        let decl = bundle.service(service).ok_or_else(|| Error::Extension {
            id: service.to_string(),
            message: format!("bundle '{}' declares no service '{}'", bundle.name(), service),
        })?;
        let id = decl.extension.as_deref().ok_or_else(|| Error::Extension {
            id: service.to_string(),
            message: format!(
                "service '{}' of bundle '{}' is not bound to an extension",
                service,
                bundle.name()
            ),
        })?;

        let payload = json!({
            "bundle": bundle.name(),
            "version": bundle.version().as_str(),
            "service": service,
            "input": input,
        });
        self.invoke(id, payload).await
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{BundleVersion, ServiceDecl};

    struct Echo(&'static str);

    #[async_trait::async_trait]
    impl Extension for Echo {
        fn id(&self) -> &str {
            self.0
        }

        async fn invoke(&self, input: Value) -> Result<Value> {
            Ok(json!({ "by": self.0, "got": input }))
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl Extension for Failing {
        fn id(&self) -> &str {
            "failing"
        }

        async fn invoke(&self, _input: Value) -> Result<Value> {
            Err(Error::Extension {
                id: "failing".into(),
                message: "boom".into(),
            })
        }
    }

    fn bundle() -> Bundle {
        Bundle::new(
            "tcoffee",
            BundleVersion::parse("1.0").unwrap(),
            "/srv/bundles/tcoffee",
        )
        .with_services(vec![
            ServiceDecl::new("regular").extension("echo"),
            ServiceDecl::new("expresso"),
            ServiceDecl::new("psicoffee").extension("missing"),
        ])
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Echo("b")).register(Echo("a"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert!(registry.contains("a"));

        let out = registry.invoke("a", json!(1)).await.unwrap();
        assert_eq!(out, json!({ "by": "a", "got": 1 }));
    }

    #[tokio::test]
    async fn test_register_replaces() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Echo("a")).register(Echo("a"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_invoke_unknown() {
        let registry = ExtensionRegistry::new();
        let err = registry.invoke("nope", Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::ExtensionNotFound(ref id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_invoke_propagates_failure() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Failing);
        let err = registry.invoke("failing", Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::Extension { .. }));
    }

    #[tokio::test]
    async fn test_invoke_service() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Echo("echo"));
        let bundle = bundle();

        let out = registry
            .invoke_service(&bundle, "regular", json!({"seq": ">a"}))
            .await
            .unwrap();
        assert_eq!(out["by"], "echo");
        assert_eq!(out["got"]["bundle"], "tcoffee");
        assert_eq!(out["got"]["version"], "1.0");
        assert_eq!(out["got"]["service"], "regular");
        assert_eq!(out["got"]["input"]["seq"], ">a");
    }

    #[tokio::test]
    async fn test_invoke_service_errors() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Echo("echo"));
        let bundle = bundle();

        let unbound = registry
            .invoke_service(&bundle, "expresso", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(unbound, Error::Extension { .. }));

        let undeclared = registry
            .invoke_service(&bundle, "unknown", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(undeclared, Error::Extension { .. }));

        let missing = registry
            .invoke_service(&bundle, "psicoffee", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(missing, Error::ExtensionNotFound(ref id) if id == "missing"));
    }
}
