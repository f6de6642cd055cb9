use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CryptoError, CryptoResult};

/// Payloads at or below this many bytes are never compressed.
pub const COMPRESSION_THRESHOLD: usize = 512;

/// DEFLATE effort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    None,
    Fastest,
    #[default]
    Default,
    Smallest,
}

impl CompressionLevel {
    fn flate(self) -> Option<Compression> {
        match self {
            Self::None => None,
            Self::Fastest => Some(Compression::fast()),
            Self::Default => Some(Compression::default()),
            Self::Smallest => Some(Compression::best()),
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Self::None
    }
}

/// Compress `data` with raw DEFLATE.
///
/// Returns `Ok(None)` when compression is disabled, the input is at or below
/// [`COMPRESSION_THRESHOLD`], or the compressed form would not be smaller; the
/// caller then stores the input as-is.
pub fn compress(data: &[u8], level: CompressionLevel) -> CryptoResult<Option<Vec<u8>>> {
    let Some(flate) = level.flate() else {
        return Ok(None);
    };
    if data.len() <= COMPRESSION_THRESHOLD {
        debug!(len = data.len(), "payload below compression threshold");
        return Ok(None);
    }

    let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 3), flate);
    encoder
        .write_all(data)
        .map_err(|e| CryptoError::Compression(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| CryptoError::Compression(e.to_string()))?;

    if compressed.len() >= data.len() {
        debug!(
            len = data.len(),
            compressed = compressed.len(),
            "compression did not shrink payload; storing uncompressed"
        );
        return Ok(None);
    }
    debug!(len = data.len(), compressed = compressed.len(), "payload compressed");
    Ok(Some(compressed))
}

/// Initial output reservation ceiling; the buffer grows past it only as the
/// stream actually produces bytes.
const MAX_PREALLOC: usize = 64 << 20;

/// Output growth step once the initial reservation is used up.
const GROW_STEP: usize = 1 << 20;

enum Inflated {
    Complete(Vec<u8>),
    /// More than the allowed number of bytes came out; holds the count so far.
    OverLimit(usize),
}

/// Inflate `data`, stopping as soon as more than `limit` bytes are produced.
///
/// The stream must end with its final block and consume every input byte.
fn inflate_stream(data: &[u8], limit: usize) -> CryptoResult<Inflated> {
    let mut inflater = Decompress::new(false);
    let mut out = Vec::with_capacity(
        limit
            .min(data.len().saturating_mul(32))
            .min(MAX_PREALLOC),
    );
    loop {
        if out.len() > limit {
            return Ok(Inflated::OverLimit(out.len()));
        }
        if out.len() == out.capacity() {
            out.reserve((limit - out.len()).saturating_add(1).min(GROW_STEP));
        }
        let (in_before, out_before) = (inflater.total_in(), inflater.total_out());
        let status = inflater
            .decompress_vec(&data[in_before as usize..], &mut out, FlushDecompress::None)
            .map_err(|e| CryptoError::Decompression(e.to_string()))?;
        if status == Status::StreamEnd {
            break;
        }
        if inflater.total_in() == in_before && inflater.total_out() == out_before {
            return Err(CryptoError::Decompression(
                "stream ends before its final block".into(),
            ));
        }
    }

    if out.len() > limit {
        return Ok(Inflated::OverLimit(out.len()));
    }
    let consumed = inflater.total_in();
    if consumed != data.len() as u64 {
        return Err(CryptoError::Decompression(format!(
            "{} trailing bytes after the final block",
            data.len() as u64 - consumed
        )));
    }
    Ok(Inflated::Complete(out))
}

/// Reject a stream whose final byte carries set padding bits.
///
/// The decoder never reads the bits above the last symbol, so a flip there
/// would leave the output (and its CRC) unchanged. Padding bits are the high
/// bits of the last byte: the highest set bit is padding exactly when clearing
/// it still yields the same output.
fn check_padding(data: &[u8], out: &[u8]) -> CryptoResult<()> {
    let Some(&last) = data.last() else {
        return Ok(());
    };
    if last == 0 {
        return Ok(());
    }
    let top = 0x80u8 >> last.leading_zeros();
    let mut cleared = data.to_vec();
    if let Some(byte) = cleared.last_mut() {
        *byte &= !top;
    }
    match inflate_stream(&cleared, out.len()) {
        Ok(Inflated::Complete(other)) if other == out => Err(CryptoError::Decompression(
            "nonzero padding bits after the final block".into(),
        )),
        _ => Ok(()),
    }
}

/// Inflate a raw DEFLATE stream that must produce exactly `expected_len` bytes.
///
/// `expected_len` comes from an unauthenticated header, so it only bounds the
/// output; it is never allocated up front.
pub fn decompress(data: &[u8], expected_len: usize) -> CryptoResult<Vec<u8>> {
    match inflate_stream(data, expected_len)? {
        Inflated::OverLimit(actual) => Err(CryptoError::SizeMismatch {
            expected: expected_len,
            actual,
        }),
        Inflated::Complete(out) if out.len() != expected_len => Err(CryptoError::SizeMismatch {
            expected: expected_len,
            actual: out.len(),
        }),
        Inflated::Complete(out) => {
            check_padding(data, &out)?;
            Ok(out)
        }
    }
}

/// Inflate a raw DEFLATE stream of unknown decompressed size, refusing to
/// produce more than `limit` bytes.
pub fn inflate(data: &[u8], limit: usize) -> CryptoResult<Vec<u8>> {
    match inflate_stream(data, limit)? {
        Inflated::OverLimit(_) => Err(CryptoError::TooLarge { limit }),
        Inflated::Complete(out) => {
            check_padding(data, &out)?;
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compressible(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 7) as u8).collect()
    }

    #[test]
    fn roundtrip_all_levels() {
        let data = compressible(10_000);
        for level in [
            CompressionLevel::Fastest,
            CompressionLevel::Default,
            CompressionLevel::Smallest,
        ] {
            let packed = compress(&data, level).unwrap().unwrap();
            assert!(packed.len() < data.len());
            assert_eq!(decompress(&packed, data.len()).unwrap(), data);
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let data = compressible(COMPRESSION_THRESHOLD);
        assert!(compress(&data, CompressionLevel::Smallest).unwrap().is_none());
        let data = compressible(COMPRESSION_THRESHOLD + 1);
        assert!(compress(&data, CompressionLevel::Smallest).unwrap().is_some());
    }

    #[test]
    fn disabled_level_never_compresses() {
        let data = compressible(100_000);
        assert!(compress(&data, CompressionLevel::None).unwrap().is_none());
    }

    #[test]
    fn incompressible_falls_back() {
        use rand::RngCore;
        let mut data = vec![0u8; 4096];
        rand::thread_rng().fill_bytes(&mut data);
        assert!(compress(&data, CompressionLevel::Default).unwrap().is_none());
    }

    #[test]
    fn short_stream_rejected() {
        let data = compressible(4096);
        let packed = compress(&data, CompressionLevel::Default).unwrap().unwrap();
        let err = decompress(&packed, data.len() + 10).unwrap_err();
        assert!(matches!(err, CryptoError::SizeMismatch { .. }));
    }

    #[test]
    fn long_stream_rejected() {
        let data = compressible(4096);
        let packed = compress(&data, CompressionLevel::Default).unwrap().unwrap();
        let err = decompress(&packed, data.len() - 1).unwrap_err();
        assert!(matches!(err, CryptoError::SizeMismatch { .. }));
    }

    #[test]
    fn inflate_without_size() {
        let data = compressible(3000);
        let packed = compress(&data, CompressionLevel::Fastest).unwrap().unwrap();
        assert_eq!(inflate(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn inflate_limit_enforced() {
        let data = vec![0u8; 1 << 20];
        let packed = compress(&data, CompressionLevel::Default).unwrap().unwrap();
        let err = inflate(&packed, 4096).unwrap_err();
        assert!(matches!(err, CryptoError::TooLarge { limit: 4096 }));
    }

    #[test]
    fn huge_expected_size_is_not_preallocated() {
        let data = compressible(4096);
        let packed = compress(&data, CompressionLevel::Default).unwrap().unwrap();
        for expected in [1usize << 40, usize::MAX] {
            let err = decompress(&packed, expected).unwrap_err();
            assert!(matches!(err, CryptoError::SizeMismatch { actual: 4096, .. }));
        }
    }

    #[test]
    fn trailing_bytes_rejected() {
        let data = compressible(4096);
        let mut packed = compress(&data, CompressionLevel::Default).unwrap().unwrap();
        packed.push(0);
        assert!(matches!(
            decompress(&packed, data.len()),
            Err(CryptoError::Decompression(_))
        ));
    }

    #[test]
    fn padding_bits_in_last_byte_rejected() {
        let data = compressible(4096);
        let packed = compress(&data, CompressionLevel::Default).unwrap().unwrap();
        let last = packed.len() - 1;
        for bit in 0..8 {
            let mut tampered = packed.clone();
            tampered[last] ^= 1 << bit;
            let accepted = decompress(&tampered, data.len()).is_ok_and(|out| out == data);
            assert!(!accepted, "bit {bit}");
        }
    }

    #[test]
    fn garbage_rejected() {
        assert!(decompress(&[0xFF; 64], 1000).is_err());
    }
}
