use chipdoc_types::Signature;

/// Errors from the integrity and confidentiality primitives.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("compression failed: {0}")]
    Compression(String),

    #[error("decompression failed: {0}")]
    Decompression(String),

    /// The inflated stream did not end exactly at the recorded size.
    #[error("decompressed size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("inflated stream exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("no LEVEL2 unlock callback is registered")]
    UnlockMissing,

    #[error("LEVEL2 unlock token rejected")]
    UnlockRejected,

    /// A different LEVEL2 signature is already pinned in this process.
    #[error("LEVEL2 signature {offered} conflicts with pinned signature {pinned}")]
    SignatureConflict { pinned: Signature, offered: Signature },
}

impl CryptoError {
    /// Policy errors reflect a trust decision rather than damaged bytes.
    pub fn is_policy(&self) -> bool {
        matches!(
            self,
            Self::UnlockMissing | Self::UnlockRejected | Self::SignatureConflict { .. }
        )
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
