//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nwdconfig::{ConfigFamily, SystemdVersion};

use crate::config::CONFIG_FILE;

/// Compile systemd-networkd schemas and convert configuration files.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file path
    #[arg(short = 'C', long, global = true, default_value = CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    #[command(flatten)]
    pub schema: SchemaArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Schema selection shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Configuration file family (network, netdev, link, networkd-conf)
    #[arg(short, long, global = true, default_value = "network")]
    pub family: ConfigFamily,

    /// Directory holding the schema documents
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub schema_dir: Option<PathBuf>,

    /// systemd release to generate for (e.g. 257)
    #[arg(short, long, global = true)]
    pub target_version: Option<SystemdVersion>,

    /// Do not query `networkctl --version` when no target is configured
    #[arg(long, global = true)]
    pub no_detect: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the schema releases found and the one selected
    Versions,

    /// Print the compiled section model
    Model {
        /// Print a coloured overview instead of JSON
        #[arg(long)]
        summary: bool,
    },

    /// Print the device kind → section map of the netdev schema
    Kinds,

    /// Print a starter record for a new file
    New {
        /// Interface to match (network, link)
        #[arg(long)]
        name: Option<String>,

        /// Device kind (netdev)
        #[arg(long)]
        kind: Option<String>,

        /// Print INI text instead of JSON
        #[arg(long)]
        ini: bool,
    },

    /// Render a JSON record as INI text
    Render {
        /// JSON record file
        #[arg(value_hint = clap::ValueHint::FilePath)]
        record: PathBuf,

        /// Write to this file, or into this directory under the suggested name
        #[arg(short, long, value_hint = clap::ValueHint::AnyPath)]
        output: Option<PathBuf>,
    },

    /// Load an INI file into a JSON record
    Parse {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Validate an INI file against the schema
    Check {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Print the JSON Schema of the config file
    ConfigSchema,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "nwdctl", "render", "rec.json", "--family", "netdev", "-t", "v257", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.schema.family, ConfigFamily::Netdev);
        assert_eq!(cli.schema.target_version, Some(SystemdVersion(257)));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Render { .. }));
    }

    #[test]
    fn rejects_unknown_family() {
        assert!(Cli::try_parse_from(["nwdctl", "model", "--family", "router"]).is_err());
    }
}
