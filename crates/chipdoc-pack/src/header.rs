use chipdoc_types::{EncryptionLevel, LicenseId, Signature, TypeError};

use crate::error::{PackError, PackResult};

/// Format identity at byte 0 of every binary document.
pub const MAGIC: [u8; 16] = *b"chipdoc.binary\r\n";

pub const HEADER_LEN: usize = 48;
pub const ENCRYPTED_HEADER_LEN: usize = 32;

/// Header flag: the payload is DEFLATE-compressed.
pub const FLAG_COMPRESSED: u32 = 1 << 31;

const KNOWN_FLAGS: u32 = FLAG_COMPRESSED | EncryptionLevel::MASK;

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn le_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

/// The fixed 48-byte record at the start of a binary document. Stored in the
/// clear; everything after it is the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub checksum: u32,
    pub flags: u32,
    pub scramble_seed: u32,
}

impl Header {
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    pub fn level(&self) -> Result<EncryptionLevel, TypeError> {
        EncryptionLevel::from_bits(self.flags)
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..16].copy_from_slice(&MAGIC);
        out[16..24].copy_from_slice(&self.compressed_size.to_le_bytes());
        out[24..32].copy_from_slice(&self.uncompressed_size.to_le_bytes());
        out[32..36].copy_from_slice(&self.checksum.to_le_bytes());
        out[36..40].copy_from_slice(&self.flags.to_le_bytes());
        out[40..44].copy_from_slice(&self.scramble_seed.to_le_bytes());
        // 44..48 reserved, zero
        out
    }

    /// Parse the header at the start of `bytes`. Checks the magic, the
    /// reserved word and unknown flag bits; the level bits are checked by
    /// [`Header::level`].
    pub fn decode(bytes: &[u8]) -> PackResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(PackError::Truncated(bytes.len()));
        }
        if bytes[0..16] != MAGIC {
            return Err(PackError::InvalidMagic {
                expected: String::from_utf8_lossy(&MAGIC).escape_debug().to_string(),
                actual: String::from_utf8_lossy(&bytes[0..16]).escape_debug().to_string(),
            });
        }
        let header = Self {
            compressed_size: le_u64(bytes, 16),
            uncompressed_size: le_u64(bytes, 24),
            checksum: le_u32(bytes, 32),
            flags: le_u32(bytes, 36),
            scramble_seed: le_u32(bytes, 40),
        };
        let reserved = le_u32(bytes, 44);
        if reserved != 0 {
            return Err(PackError::CorruptHeader(format!(
                "reserved word is {reserved:#x}"
            )));
        }
        if header.flags & !KNOWN_FLAGS != 0 {
            return Err(PackError::CorruptHeader(format!(
                "unknown flag bits {:#x}",
                header.flags & !KNOWN_FLAGS
            )));
        }
        Ok(header)
    }
}

/// The 32-byte record at the start of the payload, covered by the checksum,
/// compression and encryption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncryptedHeader {
    pub signature: Signature,
    pub license_id: LicenseId,
}

impl EncryptedHeader {
    pub fn encode(&self) -> [u8; ENCRYPTED_HEADER_LEN] {
        let mut out = [0u8; ENCRYPTED_HEADER_LEN];
        out[..16].copy_from_slice(self.signature.as_bytes());
        out[16..].copy_from_slice(self.license_id.as_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> PackResult<Self> {
        if bytes.len() < ENCRYPTED_HEADER_LEN {
            return Err(PackError::Truncated(bytes.len()));
        }
        let mut signature = [0u8; 16];
        signature.copy_from_slice(&bytes[..16]);
        let mut license = [0u8; 16];
        license.copy_from_slice(&bytes[16..32]);
        Ok(Self {
            signature: Signature::from_bytes(signature),
            license_id: LicenseId::from_bytes(license),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header {
            compressed_size: 300,
            uncompressed_size: 1200,
            checksum: 0xDEAD_BEEF,
            flags: FLAG_COMPRESSED | EncryptionLevel::Level1.bits(),
            scramble_seed: 77,
        }
    }

    #[test]
    fn layout_is_little_endian() {
        let bytes = sample().encode();
        assert_eq!(&bytes[..16], &MAGIC);
        assert_eq!(&bytes[16..24], &300u64.to_le_bytes());
        assert_eq!(&bytes[32..36], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(bytes[39], 0x80);
        assert_eq!(&bytes[44..], &[0, 0, 0, 0]);
        assert_eq!(Header::decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn flags() {
        let h = sample();
        assert!(h.is_compressed());
        assert_eq!(h.level().unwrap(), EncryptionLevel::Level1);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample().encode();
        bytes[0] = b'X';
        assert!(matches!(Header::decode(&bytes), Err(PackError::InvalidMagic { .. })));
    }

    #[test]
    fn rejects_short_input() {
        assert!(matches!(Header::decode(&MAGIC), Err(PackError::Truncated(16))));
    }

    #[test]
    fn rejects_reserved_and_unknown_flags() {
        let mut bytes = sample().encode();
        bytes[44] = 1;
        assert!(matches!(Header::decode(&bytes), Err(PackError::CorruptHeader(_))));

        let mut h = sample();
        h.flags |= 1 << 8;
        assert!(matches!(Header::decode(&h.encode()), Err(PackError::CorruptHeader(_))));
    }

    #[test]
    fn level_three_is_not_a_level() {
        let mut h = sample();
        h.flags |= EncryptionLevel::MASK;
        let decoded = Header::decode(&h.encode()).unwrap();
        assert!(decoded.level().is_err());
    }

    #[test]
    fn encrypted_header_roundtrip() {
        let eh = EncryptedHeader {
            signature: Signature::derive("acme"),
            license_id: LicenseId::generate(),
        };
        assert_eq!(EncryptedHeader::decode(&eh.encode()).unwrap(), eh);
        assert!(EncryptedHeader::decode(&[0u8; 31]).is_err());
    }
}
