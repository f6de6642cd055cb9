//! Binary container for chip documents.
//!
//! A binary document is a 48-byte clear [`Header`] followed by a payload
//! holding the 32-byte [`EncryptedHeader`] and the tag tree. The payload is
//! checksummed, optionally compressed, scrambled, and optionally encrypted
//! (see [`container`]).
//!
//! - [`BinarySaver`] writes the tag tree through the
//!   [`TreeWriter`](chipdoc_tree::TreeWriter) protocol and seals it.
//! - [`BinaryLoader`] unseals a document and reads it lazily through
//!   [`TreeReader`](chipdoc_tree::TreeReader).
//! - [`AnyLoader`] sniffs binary, XML or JSON input and opens the matching
//!   loader.

pub mod config;
pub mod container;
pub mod error;
pub mod format;
pub mod header;
pub mod loader;
pub mod node;
pub mod saver;

pub use config::{OpenOptions, SaveOptions};
pub use container::{peek, seal, unseal, Unsealed};
pub use error::{PackError, PackResult};
pub use format::{AnyLoader, Format};
pub use header::{EncryptedHeader, Header, HEADER_LEN, MAGIC};
pub use loader::BinaryLoader;
pub use saver::BinarySaver;
