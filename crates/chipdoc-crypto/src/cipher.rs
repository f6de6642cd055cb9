//! 64-bit block cipher (XTEA, 32 cycles) keyed from document content.
//!
//! The key is never the stored per-level secret alone: [`derive_key`] binds it
//! to the payload's uncompressed size and CRC-32, so two documents share a key
//! only if both size and checksum collide. The derivation is part of the wire
//! format.

use chipdoc_types::EncryptionLevel;

/// 128-bit key as four 32-bit lanes.
pub type Key = [u32; 4];

const DELTA: u32 = 0x9E37_79B9;
const CYCLES: u32 = 32;
const BLOCK: usize = 8;

const LEVEL1_SECRET: Key = [0x3C6E_F372, 0xA54F_F53A, 0x510E_527F, 0x9B05_688C];
const LEVEL2_SECRET: Key = [0x1F83_D9AB, 0x5BE0_CD19, 0xCBBB_9D5D, 0x629A_292A];

/// The constant secret for an encryption level, `None` for plain documents.
pub fn level_secret(level: EncryptionLevel) -> Option<Key> {
    match level {
        EncryptionLevel::None => None,
        EncryptionLevel::Level1 => Some(LEVEL1_SECRET),
        EncryptionLevel::Level2 => Some(LEVEL2_SECRET),
    }
}

/// Mix the uncompressed payload size (low 32 bits) and its CRC-32 into `secret`.
pub fn derive_key(secret: Key, size: u64, checksum: u32) -> Key {
    let size = size as u32;
    let mut key = secret;
    key[0] = key[0].wrapping_add(size);
    key[1] = key[1].wrapping_sub(size);
    for (i, lane) in key.iter_mut().enumerate() {
        *lane ^= checksum.rotate_left(8 * i as u32);
    }
    key
}

fn encipher(v: [u32; 2], key: &Key) -> [u32; 2] {
    let [mut v0, mut v1] = v;
    let mut sum = 0u32;
    for _ in 0..CYCLES {
        v0 = v0.wrapping_add(
            ((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1) ^ sum.wrapping_add(key[(sum & 3) as usize]),
        );
        sum = sum.wrapping_add(DELTA);
        v1 = v1.wrapping_add(
            ((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0)
                ^ sum.wrapping_add(key[((sum >> 11) & 3) as usize]),
        );
    }
    [v0, v1]
}

fn decipher(v: [u32; 2], key: &Key) -> [u32; 2] {
    let [mut v0, mut v1] = v;
    let mut sum = DELTA.wrapping_mul(CYCLES);
    for _ in 0..CYCLES {
        v1 = v1.wrapping_sub(
            ((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0)
                ^ sum.wrapping_add(key[((sum >> 11) & 3) as usize]),
        );
        sum = sum.wrapping_sub(DELTA);
        v0 = v0.wrapping_sub(
            ((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1) ^ sum.wrapping_add(key[(sum & 3) as usize]),
        );
    }
    [v0, v1]
}

fn load(chunk: &[u8]) -> [u32; 2] {
    [
        u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
        u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]),
    ]
}

fn store(chunk: &mut [u8], v: [u32; 2]) {
    chunk[..4].copy_from_slice(&v[0].to_le_bytes());
    chunk[4..].copy_from_slice(&v[1].to_le_bytes());
}

/// A trailing partial block is XORed with the encryption of the buffer length.
fn tail_pad(data: &mut [u8], key: &Key) {
    let len = data.len() as u64;
    let tail_start = data.len() - data.len() % BLOCK;
    let pad = encipher([len as u32, (len >> 32) as u32], key);
    let mut pad_bytes = [0u8; BLOCK];
    store(&mut pad_bytes, pad);
    for (byte, p) in data[tail_start..].iter_mut().zip(pad_bytes) {
        *byte ^= p;
    }
}

/// Encrypt `data` in place.
pub fn encrypt(data: &mut [u8], key: &Key) {
    for chunk in data.chunks_exact_mut(BLOCK) {
        let v = encipher(load(chunk), key);
        store(chunk, v);
    }
    tail_pad(data, key);
}

/// Decrypt `data` in place.
pub fn decrypt(data: &mut [u8], key: &Key) {
    for chunk in data.chunks_exact_mut(BLOCK) {
        let v = decipher(load(chunk), key);
        store(chunk, v);
    }
    tail_pad(data, key);
}
