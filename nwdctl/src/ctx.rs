//! Application context and state management.
//!
//! [`AppContext`] resolves where schemas come from and which systemd
//! release they are compiled for, then hands out compiled models from a
//! shared [`ModelCache`].

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use nwdconfig::{CompiledSchema, ConfigFamily, ModelCache, SystemdVersion};
use tokio::process::Command;

use crate::{cli::SchemaArgs, config::CtlConfig, store::SchemaStore};

/// Path configuration grouping all path-related fields.
#[derive(Debug, Default, Clone)]
pub struct PathConfig {
    /// Working directory relative paths are resolved against.
    pub workspace: PathBuf,
    /// Directory holding the schema documents.
    pub schema_dir: PathBuf,
}

/// The main application context holding all state.
#[derive(Debug)]
pub struct AppContext {
    pub paths: PathConfig,
    pub config: CtlConfig,
    /// Family the current command works on.
    pub family: ConfigFamily,
    /// Release the models are gated for; `None` keeps every option.
    pub target: Option<SystemdVersion>,
    pub store: SchemaStore,
    pub cache: ModelCache,
}

impl AppContext {
    /// Build the context from the config file and command-line overrides.
    ///
    /// The target release comes from the command line, then the config
    /// file, then `networkctl --version` unless detection is disabled.
    pub async fn new(config: CtlConfig, args: &SchemaArgs) -> anyhow::Result<Self> {
        let workspace = std::env::current_dir().context("Failed to get current directory")?;
        let schema_dir = args
            .schema_dir
            .clone()
            .or_else(|| config.schema_dir.clone())
            .unwrap_or_else(|| PathBuf::from("schemas"));
        let schema_dir = if schema_dir.is_absolute() {
            schema_dir
        } else {
            workspace.join(schema_dir)
        };

        let mut target = args
            .target_version
            .or(config.target_version.map(SystemdVersion));
        if target.is_none() && !args.no_detect {
            target = detect_systemd_version().await;
        }
        if let Some(target) = target {
            info!("generating for systemd {target}");
        }

        let store = SchemaStore::open(&schema_dir).await?;
        Ok(Self {
            paths: PathConfig {
                workspace,
                schema_dir,
            },
            config,
            family: args.family,
            target,
            store,
            cache: ModelCache::new(),
        })
    }

    /// Schema file path for a family under the selected release directory.
    pub fn schema_path(&self, family: ConfigFamily) -> PathBuf {
        self.store
            .dir_for(self.target)
            .join(self.config.schema_file(family))
    }

    /// Compiled model of a family, loading the document on first use.
    ///
    /// When the document cannot be compiled but an earlier model of the
    /// family is cached, that model is used with a warning.
    pub async fn compiled(&self, family: ConfigFamily) -> anyhow::Result<Arc<CompiledSchema>> {
        if let Some(hit) = self.cache.get(family, self.target) {
            return Ok(hit);
        }
        let document = self
            .store
            .load(self.target, self.config.schema_file(family))
            .await?;
        match self.cache.get_or_compile(family, self.target, &document) {
            Ok(compiled) => Ok(compiled),
            Err(err) => match self.cache.fallback(family) {
                Some(previous) => {
                    // stderr only, stdout carries the command output
                    warn!("{family} schema unusable ({err}), using the previous model");
                    Ok(previous)
                }
                None => Err(err).with_context(|| {
                    format!("Failed to compile {}", self.schema_path(family).display())
                }),
            },
        }
    }

    /// Compiled model of the current family.
    pub async fn current(&self) -> anyhow::Result<Arc<CompiledSchema>> {
        self.compiled(self.family).await
    }

    /// Resolve a path argument against the workspace.
    pub fn resolve_path(&self, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths.workspace.join(path)
        }
    }
}

/// Ask the running systemd for its release number.
pub async fn detect_systemd_version() -> Option<SystemdVersion> {
    let output = match Command::new("networkctl").arg("--version").output().await {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            debug!("networkctl --version exited with {}", output.status);
            return None;
        }
        Err(e) => {
            debug!("networkctl not available: {e}");
            return None;
        }
    };
    let version = SystemdVersion::parse(&String::from_utf8_lossy(&output.stdout));
    debug!("detected systemd version: {version:?}");
    version
}
