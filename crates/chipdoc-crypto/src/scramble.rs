//! Seeded scrambling of a payload's leading bytes.
//!
//! Only the first [`SCRAMBLE_PREFIX`] bytes are touched. The transform is a
//! set of disjoint byte swaps (a seeded pairing of positions) followed by an
//! XOR keystream. Both parts are derived from the seed alone, so
//! [`descramble`] rebuilds the same schedule and applies the two parts in
//! reverse order.

/// Maximum number of leading bytes affected.
pub const SCRAMBLE_PREFIX: usize = 1024;

/// xorshift32; never reaches the all-zero state.
struct Xorshift32(u32);

impl Xorshift32 {
    fn new(seed: u32) -> Self {
        let state = seed.wrapping_mul(0x9E37_79B9) ^ 0x85EB_CA6B;
        Self(if state == 0 { 0x6D2B_79F5 } else { state })
    }

    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }
}

struct Schedule {
    swaps: Vec<(usize, usize)>,
    keystream: Vec<u8>,
}

impl Schedule {
    fn new(len: usize, seed: u32) -> Self {
        let mut rng = Xorshift32::new(seed);

        let mut order: Vec<usize> = (0..len).collect();
        for i in (1..len).rev() {
            let j = rng.next() as usize % (i + 1);
            order.swap(i, j);
        }
        let swaps = order.chunks_exact(2).map(|c| (c[0], c[1])).collect();

        let keystream = (0..len).map(|_| (rng.next() >> 24) as u8).collect();
        Self { swaps, keystream }
    }

    fn swap(&self, data: &mut [u8]) {
        for &(a, b) in &self.swaps {
            data.swap(a, b);
        }
    }

    fn xor(&self, data: &mut [u8]) {
        for (byte, k) in data.iter_mut().zip(&self.keystream) {
            *byte ^= k;
        }
    }
}

/// Scramble the leading `min(len, SCRAMBLE_PREFIX)` bytes in place.
pub fn scramble(data: &mut [u8], seed: u32) {
    let len = data.len().min(SCRAMBLE_PREFIX);
    let prefix = &mut data[..len];
    let schedule = Schedule::new(len, seed);
    schedule.swap(prefix);
    schedule.xor(prefix);
}

/// Inverse of [`scramble`] for the same seed.
pub fn descramble(data: &mut [u8], seed: u32) {
    let len = data.len().min(SCRAMBLE_PREFIX);
    let prefix = &mut data[..len];
    let schedule = Schedule::new(len, seed);
    schedule.xor(prefix);
    schedule.swap(prefix);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bytes_past_prefix_untouched() {
        let original: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        let mut data = original.clone();
        scramble(&mut data, 42);
        assert_ne!(&data[..SCRAMBLE_PREFIX], &original[..SCRAMBLE_PREFIX]);
        assert_eq!(&data[SCRAMBLE_PREFIX..], &original[SCRAMBLE_PREFIX..]);
    }

    #[test]
    fn seed_matters() {
        let original = vec![0u8; 256];
        let mut a = original.clone();
        let mut b = original;
        scramble(&mut a, 1);
        scramble(&mut b, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_and_single_byte() {
        let mut empty: Vec<u8> = Vec::new();
        scramble(&mut empty, 7);
        descramble(&mut empty, 7);
        assert!(empty.is_empty());

        let mut one = vec![0xAA];
        scramble(&mut one, 7);
        descramble(&mut one, 7);
        assert_eq!(one, vec![0xAA]);
    }

    proptest! {
        #[test]
        fn descramble_inverts_scramble(
            data in proptest::collection::vec(any::<u8>(), 0..2500),
            seed in any::<u32>(),
        ) {
            let mut work = data.clone();
            scramble(&mut work, seed);
            descramble(&mut work, seed);
            prop_assert_eq!(work, data);
        }
    }
}
