//! `conf/bundle.xml` manifest parsing and validation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use super::{BundleError, BundleVersion, ServiceDecl};

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$").expect("valid bundle name regex"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "bundle")]
pub struct BundleManifest {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    services: ServiceList,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ServiceList {
    #[serde(rename = "service", default)]
    items: Vec<ManifestService>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestService {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@title", default)]
    title: Option<String>,
    #[serde(rename = "@extension", default)]
    extension: Option<String>,
}

/// Manifest contents after validation.
#[derive(Debug, Clone)]
pub struct VerifiedManifest {
    pub name: String,
    pub version: BundleVersion,
    pub title: Option<String>,
    pub description: Option<String>,
    pub services: Vec<ServiceDecl>,
}

impl BundleManifest {
    pub fn parse(content: &str, path: &Path) -> Result<Self, BundleError> {
        quick_xml::de::from_str(content).map_err(|e| BundleError::invalid(path, e.to_string()))
    }

    pub async fn load(path: &Path) -> Result<Self, BundleError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BundleError::ManifestNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Self::parse(&content, path)
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.items.iter().map(|s| s.name.as_str())
    }

    /// Structural validation. `path` is only used for error context.
    pub fn verify(self, path: &Path) -> Result<VerifiedManifest, BundleError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(BundleError::invalid(path, "bundle name is empty"));
        }
        if !name_regex().is_match(&name) {
            return Err(BundleError::invalid(
                path,
                format!("bundle name '{}' contains invalid characters", name),
            ));
        }

        let version = BundleVersion::parse(&self.version)?;

        let mut seen = HashSet::new();
        let mut services = Vec::with_capacity(self.services.items.len());
        for service in self.services.items {
            let service_name = service.name.trim().to_string();
            if service_name.is_empty() {
                return Err(BundleError::invalid(path, "service name is empty"));
            }
            if !seen.insert(service_name.clone()) {
                return Err(BundleError::invalid(
                    path,
                    format!("duplicate service '{}'", service_name),
                ));
            }
            services.push(ServiceDecl {
                name: service_name,
                title: service.title.filter(|t| !t.trim().is_empty()),
                extension: service.extension.filter(|e| !e.trim().is_empty()),
            });
        }

        Ok(VerifiedManifest {
            name,
            version,
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
            services,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PATH: &str = "/bundles/tcoffee/conf/bundle.xml";

    fn verify(xml: &str) -> Result<VerifiedManifest, BundleError> {
        BundleManifest::parse(xml, Path::new(PATH))?.verify(Path::new(PATH))
    }

    #[test]
    fn test_parse_full_manifest() {
        let manifest = verify(
            r#"<bundle name="tcoffee" version="1.2.0">
                 <title>T-Coffee</title>
                 <description>Multiple sequence alignment</description>
                 <services>
                   <service name="regular" title="T-Coffee" extension="tcoffee-runner"/>
                   <service name="expresso"/>
                 </services>
               </bundle>"#,
        )
        .unwrap();

        assert_eq!(manifest.name, "tcoffee");
        assert_eq!(manifest.version.as_str(), "1.2.0");
        assert_eq!(manifest.title.as_deref(), Some("T-Coffee"));
        assert_eq!(
            manifest.description.as_deref(),
            Some("Multiple sequence alignment")
        );
        assert_eq!(manifest.services.len(), 2);
        assert_eq!(manifest.services[0].name, "regular");
        assert_eq!(
            manifest.services[0].extension.as_deref(),
            Some("tcoffee-runner")
        );
        assert_eq!(manifest.services[1].name, "expresso");
        assert!(manifest.services[1].title.is_none());
    }

    #[test]
    fn test_parse_minimal_manifest() {
        let manifest = verify(r#"<bundle name="mafft" version="7"/>"#).unwrap();
        assert_eq!(manifest.name, "mafft");
        assert!(manifest.services.is_empty());
        assert!(manifest.title.is_none());
    }

    #[test]
    fn test_service_order_preserved() {
        let manifest = BundleManifest::parse(
            r#"<bundle name="b" version="1"><services>
                 <service name="z"/><service name="a"/><service name="m"/>
               </services></bundle>"#,
            Path::new(PATH),
        )
        .unwrap();
        let names: Vec<&str> = manifest.service_names().collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_missing_version_rejected() {
        let err = verify(r#"<bundle name="mafft"/>"#).unwrap_err();
        assert!(matches!(err, BundleError::InvalidManifest { .. }));
    }

    #[test]
    fn test_malformed_xml_rejected() {
        let err = verify("<bundle name=").unwrap_err();
        assert!(matches!(err, BundleError::InvalidManifest { .. }));
    }

    #[test]
    fn test_invalid_name_rejected() {
        assert!(verify(r#"<bundle name="" version="1"/>"#).is_err());
        assert!(verify(r#"<bundle name="a/b" version="1"/>"#).is_err());
        assert!(verify(r#"<bundle name=".hidden" version="1"/>"#).is_err());
        assert!(verify(r#"<bundle name="ok-name_1.x" version="1"/>"#).is_ok());
    }

    #[test]
    fn test_invalid_version_rejected() {
        let err = verify(r#"<bundle name="x" version="1..0"/>"#).unwrap_err();
        assert!(matches!(err, BundleError::InvalidVersion { .. }));
    }

    #[test]
    fn test_duplicate_service_rejected() {
        let err = verify(
            r#"<bundle name="x" version="1"><services>
                 <service name="run"/><service name="run"/>
               </services></bundle>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate service 'run'"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = BundleManifest::load(&dir.path().join("bundle.xml"))
            .await
            .unwrap_err();
        assert!(matches!(err, BundleError::ManifestNotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.xml");
        std::fs::write(&path, r#"<bundle name="clustal" version="2.1"/>"#).unwrap();

        let manifest = BundleManifest::load(&path).await.unwrap();
        assert_eq!(manifest.name, "clustal");
        assert_eq!(manifest.version, "2.1");
    }
}
