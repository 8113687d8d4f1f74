//! Configuration provider trait.

use std::str::FromStr;

use super::{ConfigError, ConfigResult};

/// Read-only source of raw configuration values.
#[async_trait::async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Get a raw configuration value
    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>>;
}

/// Typed access on top of [`ConfigProvider::get_raw`].
pub trait ConfigProviderExt: ConfigProvider {
    fn get_parsed<T>(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = ConfigResult<Option<T>>> + Send
    where
        T: FromStr + Send,
        T::Err: std::fmt::Display,
        Self: Sync,
    {
        async move {
            match self.get_raw(key).await? {
                Some(raw) => raw
                    .trim()
                    .parse::<T>()
                    .map(Some)
                    .map_err(|e| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: e.to_string(),
                    }),
                None => Ok(None),
            }
        }
    }

    fn require(&self, key: &str) -> impl std::future::Future<Output = ConfigResult<String>> + Send
    where
        Self: Sync,
    {
        async move {
            self.get_raw(key)
                .await?
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::NotFound {
                    key: key.to_string(),
                })
        }
    }
}

impl<P: ConfigProvider + ?Sized> ConfigProviderExt for P {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigProvider;

    #[tokio::test]
    async fn test_get_parsed() {
        let provider = MemoryConfigProvider::new()
            .value("scan.interval_ms", " 250 ")
            .value("bad", "soon");

        let value: Option<u64> = provider.get_parsed("scan.interval_ms").await.unwrap();
        assert_eq!(value, Some(250));

        let missing: Option<u64> = provider.get_parsed("missing").await.unwrap();
        assert_eq!(missing, None);

        let err = provider.get_parsed::<u64>("bad").await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn test_require() {
        let provider = MemoryConfigProvider::new()
            .value("base_dir", "/srv/bundles")
            .value("blank", "  ");

        assert_eq!(provider.require("base_dir").await.unwrap(), "/srv/bundles");
        assert!(matches!(
            provider.require("blank").await.unwrap_err(),
            ConfigError::NotFound { .. }
        ));
    }
}
