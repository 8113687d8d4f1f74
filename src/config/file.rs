//! JSON file configuration provider.
//!
//! Nested objects are addressed with dot notation, so
//! `{"scan": {"interval_ms": 500}}` answers `scan.interval_ms`.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::ConfigResult;
use super::provider::ConfigProvider;

pub struct FileConfigProvider {
    path: PathBuf,
    data: RwLock<Option<Map<String, Value>>>,
}

impl FileConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(None),
        }
    }

    /// A missing file reads as an empty document.
    async fn read_document(&self) -> ConfigResult<Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        let data: Map<String, Value> = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Drop the cached document and read the file again.
    pub async fn reload(&self) -> ConfigResult<()> {
        let document = self.read_document().await?;
        *self.data.write().await = Some(document);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
        let mut parts = key.split('.');
        let first = map.get(parts.next()?)?;
        parts.try_fold(first, |value, part| value.get(part))
    }
}

#[async_trait::async_trait]
impl ConfigProvider for FileConfigProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        if self.data.read().await.is_none() {
            self.reload().await?;
        }

        let data = self.data.read().await;
        let value = data.as_ref().and_then(|map| Self::lookup(map, key));
        Ok(match value {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(v) => Some(v.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_provider_nested_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundles.json");
        tokio::fs::write(
            &path,
            r#"{"base_dir": "/srv/bundles", "scan": {"interval_ms": 750}}"#,
        )
        .await
        .unwrap();

        let provider = FileConfigProvider::new(path);
        assert_eq!(
            provider.get_raw("base_dir").await.unwrap().as_deref(),
            Some("/srv/bundles")
        );
        assert_eq!(
            provider.get_raw("scan.interval_ms").await.unwrap().as_deref(),
            Some("750")
        );
        assert_eq!(provider.get_raw("scan.missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_provider_missing_file() {
        let dir = tempdir().unwrap();
        let provider = FileConfigProvider::new(dir.path().join("absent.json"));
        assert_eq!(provider.get_raw("base_dir").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_provider_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundles.json");
        tokio::fs::write(&path, r#"{"env_file": "a.env"}"#).await.unwrap();

        let provider = FileConfigProvider::new(path.clone());
        assert_eq!(
            provider.get_raw("env_file").await.unwrap().as_deref(),
            Some("a.env")
        );

        tokio::fs::write(&path, r#"{"env_file": "b.env"}"#).await.unwrap();
        assert_eq!(
            provider.get_raw("env_file").await.unwrap().as_deref(),
            Some("a.env")
        );
        provider.reload().await.unwrap();
        assert_eq!(
            provider.get_raw("env_file").await.unwrap().as_deref(),
            Some("b.env")
        );
    }

    #[tokio::test]
    async fn test_file_provider_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundles.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let provider = FileConfigProvider::new(path);
        assert!(provider.get_raw("base_dir").await.is_err());
    }
}
