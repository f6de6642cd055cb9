//! Integrity and confidentiality primitives for chip documents.
//!
//! Every function here is stateless except the [`Level2Gate`], which models
//! the process-wide trust decision for LEVEL2 documents.
//!
//! Save pipeline: compress → scramble prefix → encrypt.
//! Load pipeline: decrypt → descramble prefix → decompress → verify CRC-32.
//!
//! The CRC detects corruption; it is not a security measure. The cipher is a
//! deterrent bound to document content, not a substitute for authenticated
//! encryption.

pub mod checksum;
pub mod cipher;
pub mod compress;
pub mod error;
pub mod gate;
pub mod scramble;

pub use checksum::crc32;
pub use cipher::{decrypt, derive_key, encrypt, level_secret, Key};
pub use compress::{compress, decompress, inflate, CompressionLevel, COMPRESSION_THRESHOLD};
pub use error::{CryptoError, CryptoResult};
pub use gate::{Level2Gate, UNLOCK_TOKEN};
pub use scramble::{descramble, scramble, SCRAMBLE_PREFIX};
