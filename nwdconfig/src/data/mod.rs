//! Schema compilation and configuration records.
//!
//! This module turns a JSON-Schema-like description of a systemd-networkd
//! file family into a flat section model, and holds the concrete values a
//! configuration file is made of:
//!
//! - Reference resolution of single field nodes
//! - Section model building with version gating
//! - Device kind → section dependency extraction
//! - Records and numeric coercion
//!
//! ## Architecture
//!
//! - [`schema`] - Errors and low-level JSON Schema helpers
//! - [`types`] - Field types, option and section definitions
//! - [`resolve`] - Field node resolution
//! - [`model`] - Section model builder
//! - [`kinds`] - Kind dependency extraction for `.netdev` schemas
//! - [`record`] - Configuration records and coercion
//! - [`version`] - systemd version handling

/// Errors and JSON Schema traversal helpers.
pub mod schema;

/// Field types, option and section definitions.
pub mod types;

/// Field node resolution.
pub mod resolve;

/// Section model builder.
pub mod model;

/// Kind dependency extraction.
pub mod kinds;

/// Configuration records and coercion.
pub mod record;

/// systemd version handling.
pub mod version;

pub use kinds::{KindSectionMap, extract_kind_map};
pub use model::build;
pub use record::{ConfigRecord, coerce};
pub use resolve::resolve;
pub use schema::{Result, SchemaError};
pub use types::{CategoryTier, FieldType, OptionDef, SchemaMap, Section};
pub use version::SystemdVersion;
