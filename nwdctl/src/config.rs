//! `.nwdctl.toml` configuration.
//!
//! ```toml
//! schema_dir = "schemas"
//! target_version = 257
//!
//! [family_files]
//! netdev = "custom.netdev.schema.json"
//! ```

use std::{collections::BTreeMap, path::{Path, PathBuf}};

use anyhow::Context;
use nwdconfig::ConfigFamily;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".nwdctl.toml";

/// Settings shared by every subcommand.
///
/// Command-line flags take precedence over values from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct CtlConfig {
    /// Directory holding the schema documents, either directly or in one
    /// `v<N>` subdirectory per systemd release.
    pub schema_dir: Option<PathBuf>,
    /// systemd release to generate for. Detected from
    /// `networkctl --version` when unset.
    pub target_version: Option<u32>,
    /// Schema file name overrides keyed by family
    /// (`network`, `netdev`, `link`, `networkd-conf`).
    pub family_files: BTreeMap<String, String>,
}

impl CtlConfig {
    /// Read the configuration file; a missing file yields the defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: CtlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        for family in config.family_files.keys() {
            family
                .parse::<ConfigFamily>()
                .with_context(|| format!("Invalid [family_files] entry in {}", path.display()))?;
        }
        Ok(config)
    }

    /// Schema file name for a family, honouring overrides.
    pub fn schema_file(&self, family: ConfigFamily) -> &str {
        self.family_files
            .get(family.as_str())
            .map(String::as_str)
            .unwrap_or(family.schema_file())
    }

    /// JSON Schema of the configuration file.
    pub fn json_schema() -> anyhow::Result<String> {
        let schema = schemars::schema_for!(CtlConfig);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}
