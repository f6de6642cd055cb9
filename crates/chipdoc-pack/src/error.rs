use chipdoc_crypto::CryptoError;
use chipdoc_tree::CursorError;
use chipdoc_types::{EncryptionLevel, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid document magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("document too short: {0} bytes")]
    Truncated(usize),

    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    #[error("payload size mismatch: header says {expected} bytes, found {actual}")]
    PayloadSize { expected: u64, actual: u64 },

    #[error("checksum mismatch: header {expected:#010x}, payload {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("invalid encryption level: {0}")]
    InvalidLevel(TypeError),

    #[error("a signature is only allowed on LEVEL2 documents, not {0}")]
    SignatureNotAllowed(EncryptionLevel),

    #[error("unrecognized document format")]
    UnknownFormat,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackError {
    /// The bytes are damaged: bad magic, checksum, compression stream, or tree.
    pub fn is_integrity(&self) -> bool {
        match self {
            Self::InvalidMagic { .. }
            | Self::Truncated(_)
            | Self::CorruptHeader(_)
            | Self::PayloadSize { .. }
            | Self::ChecksumMismatch { .. }
            | Self::UnknownFormat => true,
            Self::Crypto(e) => !e.is_policy(),
            Self::Cursor(e) => e.is_integrity(),
            _ => false,
        }
    }

    /// The document was refused by a trust decision rather than damage.
    pub fn is_policy(&self) -> bool {
        match self {
            Self::InvalidLevel(_) | Self::SignatureNotAllowed(_) => true,
            Self::Crypto(e) => e.is_policy(),
            _ => false,
        }
    }
}

pub type PackResult<T> = Result<T, PackError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chipdoc_types::Signature;

    #[test]
    fn classification() {
        assert!(PackError::ChecksumMismatch { expected: 1, actual: 2 }.is_integrity());
        assert!(PackError::Crypto(CryptoError::SizeMismatch { expected: 1, actual: 0 }).is_integrity());
        assert!(PackError::Cursor(CursorError::Corrupt { offset: 0, reason: "x".into() }).is_integrity());

        let conflict = PackError::Crypto(CryptoError::SignatureConflict {
            pinned: Signature::derive("a"),
            offered: Signature::derive("b"),
        });
        assert!(conflict.is_policy());
        assert!(!conflict.is_integrity());
        assert!(PackError::InvalidLevel(TypeError::InvalidEncryptionLevel(3)).is_policy());

        let structural = PackError::Cursor(CursorError::StackEmpty);
        assert!(!structural.is_integrity() && !structural.is_policy());
        let io = PackError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(!io.is_integrity() && !io.is_policy());
    }
}
