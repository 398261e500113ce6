//! # nwdctl
//!
//! Command-line harness around [`nwdconfig`].
//!
//! `nwdctl` locates the systemd-networkd schema documents for a target
//! release, compiles them into section models and converts configuration
//! files between JSON records and INI text.
//!
//! ## Features
//!
//! - **Release selection**: Picks the newest `v<N>` schema directory not
//!   newer than the target, detected from `networkctl --version` when unset
//! - **Model inspection**: Prints the compiled model and the netdev kind map
//! - **Rendering**: Turns JSON records into `.network`, `.netdev`, `.link`
//!   and `networkd.conf` files
//! - **Checking**: Loads INI files back and validates them against the model
//!
//! ## Modules
//!
//! - [`cli`] - Command-line arguments
//! - [`commands`] - Subcommand handlers
//! - [`config`] - `.nwdctl.toml` settings
//! - [`ctx`] - Application context and state management
//! - [`store`] - On-disk schema layout
//!
//! ## Example
//!
//! ```rust,no_run
//! // nwdctl is primarily used as a CLI tool
//! // nwdctl --target-version 257 render eth0.json -o /etc/systemd/network
//! ```

/// Command-line arguments.
pub mod cli;

/// Subcommand handlers.
///
/// Each handler returns the text to print.
pub mod commands;

/// Configuration file loading and its JSON Schema.
pub mod config;

/// Application context and state management.
pub mod ctx;

/// Schema directory scanning and release selection.
pub mod store;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
