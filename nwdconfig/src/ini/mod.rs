//! INI text codec for systemd-networkd files.
//!
//! [`serialize`] writes a record in model order; [`parse`] loads an
//! existing file back into a record.

mod de;
mod ser;

pub use de::parse;
pub use ser::serialize;
