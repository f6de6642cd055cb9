use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Document format version: a 4-byte `major.minor.patch.build` tuple.
///
/// Only the major component selects the tag table; the remaining bytes are
/// informational.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormatVersion([u8; 4]);

impl FormatVersion {
    /// The version written by every saver in this workspace.
    pub const CURRENT: Self = Self([2, 0, 0, 0]);
    /// First-generation documents (different tag codes and text names).
    pub const LEGACY_V1: Self = Self([1, 0, 0, 0]);

    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn major(&self) -> u8 {
        self.0[0]
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Pack into a `u32` (the bytes in little-endian order).
    pub fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub fn from_u32(value: u32) -> Self {
        Self(value.to_le_bytes())
    }

    /// Returns `true` if a tag table exists for this version.
    pub fn is_supported(&self) -> bool {
        matches!(self.major(), 1 | 2)
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

impl fmt::Debug for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormatVersion({self})")
    }
}

impl FromStr for FormatVersion {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 4];
        let mut parts = s.split('.');
        for slot in &mut bytes {
            let part = parts
                .next()
                .ok_or_else(|| TypeError::InvalidVersion(s.to_string()))?;
            *slot = part
                .parse()
                .map_err(|_| TypeError::InvalidVersion(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(TypeError::InvalidVersion(s.to_string()));
        }
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse() {
        let v = FormatVersion::new([2, 1, 0, 7]);
        assert_eq!(v.to_string(), "2.1.0.7");
        assert_eq!("2.1.0.7".parse::<FormatVersion>().unwrap(), v);
    }

    #[test]
    fn parse_rejects_wrong_arity() {
        assert!("2.0.0".parse::<FormatVersion>().is_err());
        assert!("2.0.0.0.0".parse::<FormatVersion>().is_err());
        assert!("2.x.0.0".parse::<FormatVersion>().is_err());
        assert!("256.0.0.0".parse::<FormatVersion>().is_err());
    }

    #[test]
    fn u32_packing() {
        let v = FormatVersion::CURRENT;
        assert_eq!(FormatVersion::from_u32(v.to_u32()), v);
        assert_eq!(v.to_u32(), 2);
    }

    #[test]
    fn supported_majors() {
        assert!(FormatVersion::CURRENT.is_supported());
        assert!(FormatVersion::LEGACY_V1.is_supported());
        assert!(!FormatVersion::new([3, 0, 0, 0]).is_supported());
    }
}
