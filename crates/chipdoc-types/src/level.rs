use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Encryption tier of a binary document.
///
/// - `None`: stored in the clear (still checksummed and scrambled).
/// - `Level1`: encrypted with a key derived from content; no external gate.
/// - `Level2`: like `Level1`, plus a process-wide signature gate that admits
///   documents from only one trusted vendor per process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionLevel {
    #[default]
    None,
    Level1,
    Level2,
}

impl EncryptionLevel {
    /// Mask of the header flag bits that carry the level.
    pub const MASK: u32 = 0b11;

    /// The level's value in the header flags (bits 0-1).
    pub fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Level1 => 1,
            Self::Level2 => 2,
        }
    }

    /// Decode the level from header flags. Bit pattern `0b11` is not a known
    /// level and is rejected.
    pub fn from_bits(flags: u32) -> Result<Self, TypeError> {
        match flags & Self::MASK {
            0 => Ok(Self::None),
            1 => Ok(Self::Level1),
            2 => Ok(Self::Level2),
            other => Err(TypeError::InvalidEncryptionLevel(other)),
        }
    }
}

impl fmt::Display for EncryptionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Level1 => write!(f, "level1"),
            Self::Level2 => write!(f, "level2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_roundtrip() {
        for level in [EncryptionLevel::None, EncryptionLevel::Level1, EncryptionLevel::Level2] {
            assert_eq!(EncryptionLevel::from_bits(level.bits()).unwrap(), level);
        }
    }

    #[test]
    fn from_bits_ignores_other_flags() {
        let flags = (1 << 31) | EncryptionLevel::Level1.bits();
        assert_eq!(EncryptionLevel::from_bits(flags).unwrap(), EncryptionLevel::Level1);
    }

    #[test]
    fn unknown_level_rejected() {
        assert_eq!(
            EncryptionLevel::from_bits(3),
            Err(TypeError::InvalidEncryptionLevel(3))
        );
    }

    #[test]
    fn serde_names() {
        let json = serde_json::to_string(&EncryptionLevel::Level2).unwrap();
        assert_eq!(json, "\"level2\"");
        let parsed: EncryptionLevel = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(parsed, EncryptionLevel::None);
    }
}
