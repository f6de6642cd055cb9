use thiserror::Error;

use crate::version::FormatVersion;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid encryption level bits: {0:#x}")]
    InvalidEncryptionLevel(u32),

    #[error("invalid format version: {0}")]
    InvalidVersion(String),

    #[error("unsupported format version: {0}")]
    UnsupportedVersion(FormatVersion),

    #[error("unknown value kind: {0}")]
    UnknownValueKind(u8),

    #[error("malformed {kind} array: {len} bytes is not a whole number of elements")]
    MalformedArray { kind: String, len: usize },
}
