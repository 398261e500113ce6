//! On-disk schema layout.
//!
//! Schemas live either directly in the schema directory or in one `v<N>`
//! subdirectory per systemd release:
//!
//! ```text
//! schemas/
//! ├── v255/systemd.network.schema.json
//! └── v257/systemd.network.schema.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use nwdconfig::{SystemdVersion, Value, data::version::select_schema_version};
use tokio::fs;

/// A schema directory and the releases it provides.
#[derive(Debug, Clone)]
pub struct SchemaStore {
    root: PathBuf,
    versions: Vec<u32>,
}

impl SchemaStore {
    /// Scan `root` for `v<N>` subdirectories.
    pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        let mut entries = fs::read_dir(&root)
            .await
            .with_context(|| format!("Failed to read schema directory {}", root.display()))?;

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(number) = name
                .to_str()
                .and_then(|n| n.strip_prefix('v'))
                .and_then(|n| n.parse::<u32>().ok())
            else {
                continue;
            };
            versions.push(number);
        }
        versions.sort_unstable();
        debug!("schema releases in {}: {versions:?}", root.display());
        Ok(Self { root, versions })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Available releases, ascending.
    pub fn versions(&self) -> &[u32] {
        &self.versions
    }

    /// Release directory to read for a target, `None` for a flat layout.
    pub fn select(&self, target: Option<SystemdVersion>) -> Option<SystemdVersion> {
        select_schema_version(&self.versions, target)
    }

    /// Directory the schema files for a target are read from.
    pub fn dir_for(&self, target: Option<SystemdVersion>) -> PathBuf {
        match self.select(target) {
            Some(version) => self.root.join(version.dir_name()),
            None => self.root.clone(),
        }
    }

    /// Read and parse one schema document.
    pub async fn load(&self, target: Option<SystemdVersion>, file: &str) -> anyhow::Result<Value> {
        let path = self.dir_for(target).join(file);
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read schema {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse schema {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discovers_release_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["v257", "v255", "latest", "vNext"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("v999"), "not a directory").unwrap();

        let store = SchemaStore::open(dir.path()).await.unwrap();
        assert_eq!(store.versions(), [255, 257]);
        assert_eq!(store.select(Some(SystemdVersion(256))), Some(SystemdVersion(255)));
        assert_eq!(store.dir_for(None), dir.path().join("v257"));
    }

    #[tokio::test]
    async fn flat_layout_reads_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("systemd.link.schema.json"),
            r#"{"properties": {}}"#,
        )
        .unwrap();
        let store = SchemaStore::open(dir.path()).await.unwrap();
        assert!(store.versions().is_empty());
        let doc = store
            .load(Some(SystemdVersion(257)), "systemd.link.schema.json")
            .await
            .unwrap();
        assert!(doc.get("properties").is_some());
        assert!(store.load(None, "missing.json").await.is_err());
    }
}
