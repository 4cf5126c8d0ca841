//! Version metadata
//!
//! A version is either read off the loaded engine or fetched through a side
//! channel when the engine does not expose one. Either way the resolved string
//! is `<package>@<version>` and is cached after the first success.

use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Side channel returning a bare version string for a package
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_version(&self, package: &str) -> anyhow::Result<String>;
}

/// How an adapter resolves its version
#[derive(Clone, Default)]
pub enum VersionSource {
    /// Load the engine and read the version it reports
    #[default]
    Engine,
    /// Ask the metadata source; the engine is not loaded
    Metadata(Arc<dyn MetadataSource>),
    /// Load the engine, falling back to metadata when it reports nothing
    EngineOrMetadata(Arc<dyn MetadataSource>),
}

impl fmt::Debug for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSource::Engine => write!(f, "Engine"),
            VersionSource::Metadata(_) => write!(f, "Metadata(..)"),
            VersionSource::EngineOrMetadata(_) => write!(f, "EngineOrMetadata(..)"),
        }
    }
}

/// `<package>@<version>`
pub fn format_version(package: &str, version: &str) -> String {
    format!("{}@{}", package, version)
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    name: Option<String>,
    version: String,
}

fn manifest_version(package: &str, contents: &str) -> anyhow::Result<String> {
    let manifest: PackageManifest = serde_json::from_str(contents)?;
    if let Some(name) = manifest.name.as_deref() {
        if name != package {
            anyhow::bail!("manifest describes `{}`, not `{}`", name, package);
        }
    }
    Ok(manifest.version)
}

/// A package manifest (`{"name": .., "version": ..}`) compiled into the binary
pub struct EmbeddedManifest {
    contents: &'static str,
}

impl EmbeddedManifest {
    pub const fn new(contents: &'static str) -> Self {
        Self { contents }
    }
}

#[async_trait]
impl MetadataSource for EmbeddedManifest {
    async fn fetch_version(&self, package: &str) -> anyhow::Result<String> {
        manifest_version(package, self.contents)
    }
}

/// A package manifest read from disk on demand
pub struct ManifestFile {
    path: PathBuf,
}

impl ManifestFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetadataSource for ManifestFile {
    async fn fetch_version(&self, package: &str) -> anyhow::Result<String> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        manifest_version(package, &contents)
    }
}

/// Run a metadata fetch, mapping failure into the crate error
pub(crate) async fn fetch(source: &dyn MetadataSource, package: &str) -> Result<String> {
    tracing::debug!(package, "fetching version metadata");
    match source.fetch_version(package).await {
        Ok(version) => Ok(format_version(package, version.trim())),
        Err(e) => {
            tracing::warn!(package, error = %e, "version metadata fetch failed");
            let cause: Box<dyn std::error::Error + Send + Sync> = e.into();
            Err(Error::Metadata {
                package: package.to_string(),
                cause: Arc::from(cause),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_embedded_manifest() {
        let manifest = EmbeddedManifest::new(r#"{ "name": "tree-sitter-go", "version": "0.23.4" }"#);
        assert_eq!(fetch(&manifest, "tree-sitter-go").await.unwrap(), "tree-sitter-go@0.23.4");
    }

    #[tokio::test]
    async fn test_manifest_name_mismatch() {
        let manifest = EmbeddedManifest::new(r#"{ "name": "postcss", "version": "8.0.0" }"#);
        let err = fetch(&manifest, "tree-sitter-go").await.unwrap_err();
        assert!(matches!(err, Error::Metadata { .. }));
    }

    #[tokio::test]
    async fn test_manifest_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "version": "1.2.3\n" }}"#).unwrap();

        let source = ManifestFile::new(file.path());
        assert_eq!(fetch(&source, "pkg").await.unwrap(), "pkg@1.2.3");

        let missing = ManifestFile::new(file.path().with_extension("missing"));
        assert!(fetch(&missing, "pkg").await.is_err());
    }
}
