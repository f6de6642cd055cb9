//! The seal/unseal pipeline around a serialized tag tree.
//!
//! Seal: encrypted header + tree → CRC-32 → compress → scramble prefix →
//! encrypt → prepend the 48-byte header. Unseal runs the same steps in
//! reverse and verifies the CRC-32 last.

use chipdoc_crypto::{
    compress, crc32, decompress, decrypt, derive_key, descramble, encrypt, level_secret, scramble,
    Level2Gate,
};
use chipdoc_types::{EncryptionLevel, Signature};
use tracing::{debug, warn};

use crate::config::SaveOptions;
use crate::error::{PackError, PackResult};
use crate::header::{EncryptedHeader, Header, ENCRYPTED_HEADER_LEN, FLAG_COMPRESSED, HEADER_LEN};

/// Multiplier applied to the stored seed before scrambling.
const SEED_MULTIPLIER: u32 = 13;

/// A successfully unsealed document.
#[derive(Debug)]
pub struct Unsealed {
    pub header: Header,
    pub level: EncryptionLevel,
    pub encrypted_header: EncryptedHeader,
    /// The tag tree, starting at the root group's node header.
    pub tree: Vec<u8>,
}

/// Seal `tree` into a complete binary document.
pub fn seal(tree: &[u8], options: &SaveOptions) -> PackResult<Vec<u8>> {
    if options.signature.is_some() && options.encryption != EncryptionLevel::Level2 {
        return Err(PackError::SignatureNotAllowed(options.encryption));
    }

    let encrypted_header = EncryptedHeader {
        signature: options.signature.unwrap_or(Signature::ZERO),
        license_id: options.license_id,
    };
    let mut payload = Vec::with_capacity(ENCRYPTED_HEADER_LEN + tree.len());
    payload.extend_from_slice(&encrypted_header.encode());
    payload.extend_from_slice(tree);

    let checksum = crc32(&payload);
    let uncompressed_size = payload.len() as u64;
    let scramble_seed = options.scramble_seed.unwrap_or_else(rand::random);
    let mut flags = options.encryption.bits();

    let mut body = match compress(&payload, options.compression)? {
        Some(compressed) => {
            flags |= FLAG_COMPRESSED;
            compressed
        }
        None => payload,
    };

    scramble(&mut body, scramble_seed.wrapping_mul(SEED_MULTIPLIER));

    if let Some(secret) = level_secret(options.encryption) {
        let key = derive_key(secret, uncompressed_size, checksum);
        encrypt(&mut body, &key);
    }

    let header = Header {
        compressed_size: body.len() as u64,
        uncompressed_size,
        checksum,
        flags,
        scramble_seed,
    };
    debug!(
        level = %options.encryption,
        compressed = header.is_compressed(),
        uncompressed_size,
        stored_size = header.compressed_size,
        "document sealed"
    );

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Read only the clear header of a sealed document.
pub fn peek(bytes: &[u8]) -> PackResult<Header> {
    Header::decode(bytes)
}

/// Reverse [`seal`], consulting `gate` for LEVEL2 documents.
pub fn unseal(bytes: &[u8], gate: &Level2Gate) -> PackResult<Unsealed> {
    let header = Header::decode(bytes)?;
    let level = header.level().map_err(|e| {
        warn!(flags = header.flags, "document rejected: unknown encryption level");
        PackError::InvalidLevel(e)
    })?;
    if level == EncryptionLevel::Level2 {
        gate.check_unlock()?;
    }

    let mut body = bytes[HEADER_LEN..].to_vec();
    if body.len() as u64 != header.compressed_size {
        return Err(PackError::PayloadSize {
            expected: header.compressed_size,
            actual: body.len() as u64,
        });
    }

    if let Some(secret) = level_secret(level) {
        let key = derive_key(secret, header.uncompressed_size, header.checksum);
        decrypt(&mut body, &key);
    }

    descramble(&mut body, header.scramble_seed.wrapping_mul(SEED_MULTIPLIER));

    let payload = if header.is_compressed() {
        let expected = usize::try_from(header.uncompressed_size).map_err(|_| {
            PackError::CorruptHeader(format!(
                "uncompressed size {} does not fit in memory",
                header.uncompressed_size
            ))
        })?;
        decompress(&body, expected)?
    } else {
        if body.len() as u64 != header.uncompressed_size {
            return Err(PackError::PayloadSize {
                expected: header.uncompressed_size,
                actual: body.len() as u64,
            });
        }
        body
    };

    let actual = crc32(&payload);
    if actual != header.checksum {
        warn!(expected = header.checksum, actual, "document rejected: checksum mismatch");
        return Err(PackError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    let encrypted_header = EncryptedHeader::decode(&payload)?;
    if level == EncryptionLevel::Level2 {
        gate.admit(encrypted_header.signature)?;
    }

    let tree = payload[ENCRYPTED_HEADER_LEN..].to_vec();
    debug!(%level, tree_len = tree.len(), "document unsealed");
    Ok(Unsealed {
        header,
        level,
        encrypted_header,
        tree,
    })
}
