//! Raw-blob envelope: embeds an arbitrary binary payload in a text field.
//!
//! ```text
//! base64(crc32 LE || flags LE)   exactly 12 characters
//! base64(payload)                payload possibly DEFLATE-compressed
//! ```
//!
//! The two base64 runs are concatenated with no separator. The CRC-32 covers
//! the raw (uncompressed) bytes. Flag bit 0 marks a compressed payload.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chipdoc_crypto::{compress, crc32, inflate, CompressionLevel, CryptoError};
use tracing::debug;

/// Length of the encoded 8-byte header.
pub const HEADER_CHARS: usize = 12;

/// Largest payload a compressed envelope may inflate to.
pub const MAX_ENVELOPE_PAYLOAD: usize = 256 << 20;

const FLAG_COMPRESSED: u32 = 1;

/// Errors from decoding or encoding an envelope. All are integrity errors.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("envelope too short: {0} characters, header needs {HEADER_CHARS}")]
    TooShort(usize),

    #[error("invalid base64: {0}")]
    Base64(String),

    #[error("unknown envelope flags: {0:#x}")]
    UnknownFlags(u32),

    #[error("envelope checksum mismatch: header {expected:#010x}, payload {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Wrap `bytes` in an envelope, compressing when `level` allows and the
/// payload is large enough to benefit.
pub fn encode(bytes: &[u8], level: CompressionLevel) -> Result<String, EnvelopeError> {
    let checksum = crc32(bytes);
    let compressed = compress(bytes, level)?;
    let flags = if compressed.is_some() { FLAG_COMPRESSED } else { 0 };
    let payload = compressed.as_deref().unwrap_or(bytes);

    let mut header = [0u8; 8];
    header[..4].copy_from_slice(&checksum.to_le_bytes());
    header[4..].copy_from_slice(&flags.to_le_bytes());

    let mut out = BASE64.encode(header);
    BASE64.encode_string(payload, &mut out);
    debug!(len = bytes.len(), encoded = out.len(), flags, "raw blob encoded");
    Ok(out)
}

/// Unwrap an envelope produced by [`encode`].
pub fn decode(text: &str) -> Result<Vec<u8>, EnvelopeError> {
    decode_with_limit(text, MAX_ENVELOPE_PAYLOAD)
}

/// [`decode`], refusing compressed payloads that inflate past `limit` bytes.
pub fn decode_with_limit(text: &str, limit: usize) -> Result<Vec<u8>, EnvelopeError> {
    if text.len() < HEADER_CHARS {
        return Err(EnvelopeError::TooShort(text.len()));
    }
    if !text.is_char_boundary(HEADER_CHARS) {
        return Err(EnvelopeError::Base64("non-ASCII header".into()));
    }
    let (head, body) = text.split_at(HEADER_CHARS);

    let header = BASE64
        .decode(head)
        .map_err(|e| EnvelopeError::Base64(e.to_string()))?;
    let header: [u8; 8] = header
        .as_slice()
        .try_into()
        .map_err(|_| EnvelopeError::Base64(format!("header decodes to {} bytes", header.len())))?;
    let expected = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let flags = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if flags & !FLAG_COMPRESSED != 0 {
        return Err(EnvelopeError::UnknownFlags(flags));
    }

    let payload = BASE64
        .decode(body)
        .map_err(|e| EnvelopeError::Base64(e.to_string()))?;
    let bytes = if flags & FLAG_COMPRESSED != 0 {
        inflate(&payload, limit)?
    } else {
        payload
    };

    let actual = crc32(&bytes);
    if actual != expected {
        return Err(EnvelopeError::ChecksumMismatch { expected, actual });
    }
    Ok(bytes)
}
