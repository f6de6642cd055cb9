//! Foundation types for chip documents.
//!
//! This crate provides the vocabulary shared by every chip document back end
//! (binary container, XML, JSON). Every other chipdoc crate depends on
//! `chipdoc-types`.
//!
//! # Key Types
//!
//! - [`Tag`]: closed enumeration of tree-node kinds
//! - [`TagTable`]: per-version encoded representation of tags (binary codes, text names)
//! - [`Value`] / [`Array`]: the scalar and array payloads a leaf can hold
//! - [`EncryptionLevel`]: NONE / LEVEL1 / LEVEL2
//! - [`FormatVersion`]: the 4-byte document format version
//! - [`Signature`] / [`LicenseId`]: the 16-byte identities stored in the encrypted header

pub mod error;
pub mod level;
pub mod signature;
pub mod tag;
pub mod value;
pub mod version;

pub use error::TypeError;
pub use level::EncryptionLevel;
pub use signature::{LicenseId, Signature};
pub use tag::{Tag, TagTable, TextEncoding};
pub use value::{Array, Value, ValueKind};
pub use version::FormatVersion;
