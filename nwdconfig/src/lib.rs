//! # nwdconfig
//!
//! A schema-driven configuration compiler for systemd-networkd files.
//!
//! nwdconfig reads a JSON-Schema-like description of every section and key
//! a `.network`, `.netdev`, `.link` or `networkd.conf` file may contain and
//! compiles it into a flat model of typed, tiered, validated options. The
//! model then drives conversion of configuration records to and from INI
//! text.
//!
//! ## Features
//!
//! - `$ref`/`oneOf`/`anyOf`/`allOf` resolution with constraint merging
//! - Version gating: one schema document serves several systemd releases
//! - Device kind → section maps for `.netdev` files
//! - Numeric coercion, field validation and a stable INI codec
//!
//! ## Quick Start
//!
//! ```rust
//! use nwdconfig::{ConfigRecord, SystemdVersion, build, coerce, serialize};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "properties": {
//!         "Match": {"type": "object", "properties": {"Name": {"type": "string"}}},
//!         "Link": {"type": "object", "properties": {"MTUBytes": {"type": "integer"}}}
//!     }
//! });
//! let model = build(&schema, Some(SystemdVersion(257))).unwrap();
//!
//! let record = ConfigRecord::from_json(json!({
//!     "Link": {"MTUBytes": "9000"},
//!     "Match": {"Name": "eth0"}
//! })).unwrap();
//! let text = serialize(&coerce(&record, &model), &model);
//! assert_eq!(text, "[Match]\nName=eth0\n\n[Link]\nMTUBytes=9000");
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Schema compilation, records and coercion
//! - [`ini`] - INI serialization and loading
//! - [`validate`] - Field validation
//! - [`family`] - File families, starter records and file names
//! - [`cache`] - Shared compiled models

#[macro_use]
extern crate log;

/// Schema compilation, configuration records and coercion.
pub mod data;

/// INI codec.
pub mod ini;

/// Field validation.
pub mod validate;

/// systemd-networkd file families.
pub mod family;

/// Compiled model cache.
pub mod cache;

pub use cache::{CompiledSchema, ModelCache};
pub use data::{
    CategoryTier, ConfigRecord, FieldType, KindSectionMap, OptionDef, Result, SchemaError,
    SchemaMap, Section, SystemdVersion, build, coerce, extract_kind_map, resolve,
};
pub use family::ConfigFamily;
pub use ini::{parse, serialize};
pub use serde_json::Value;
pub use validate::{FieldIssue, validate_record, validate_value};
