use std::sync::Arc;

use chipdoc_crypto::{CompressionLevel, Level2Gate};
use chipdoc_types::{EncryptionLevel, LicenseId, Signature};
use serde::{Deserialize, Serialize};

/// How a binary document is sealed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    pub compression: CompressionLevel,
    pub encryption: EncryptionLevel,
    /// Vendor signature. Only valid with [`EncryptionLevel::Level2`].
    pub signature: Option<Signature>,
    pub license_id: LicenseId,
    /// Fixed scramble seed; a random one is drawn when absent.
    pub scramble_seed: Option<u32>,
}

impl SaveOptions {
    pub fn plain() -> Self {
        Self {
            compression: CompressionLevel::None,
            ..Self::default()
        }
    }

    pub fn with_compression(mut self, compression: CompressionLevel) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_encryption(mut self, encryption: EncryptionLevel) -> Self {
        self.encryption = encryption;
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn with_license(mut self, license_id: LicenseId) -> Self {
        self.license_id = license_id;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.scramble_seed = Some(seed);
        self
    }
}

/// How a binary document is opened.
#[derive(Clone, Debug)]
pub struct OpenOptions {
    /// Gate consulted for LEVEL2 documents.
    pub gate: Arc<Level2Gate>,
}

impl OpenOptions {
    pub fn with_gate(gate: Arc<Level2Gate>) -> Self {
        Self { gate }
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            gate: Level2Gate::global(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = SaveOptions::default();
        assert_eq!(opts.compression, CompressionLevel::Default);
        assert_eq!(opts.encryption, EncryptionLevel::None);
        assert!(opts.signature.is_none());
        assert_eq!(SaveOptions::plain().compression, CompressionLevel::None);
    }

    #[test]
    fn default_open_uses_global_gate() {
        let opts = OpenOptions::default();
        assert!(Arc::ptr_eq(&opts.gate, &Level2Gate::global()));
    }
}
