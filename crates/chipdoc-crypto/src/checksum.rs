/// Standard CRC-32 (IEEE) over a byte range.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn empty_input() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn single_bit_flip_detected() {
        let mut data = vec![0x5Au8; 4096];
        let before = crc32(&data);
        data[2048] ^= 0x01;
        assert_ne!(before, crc32(&data));
    }
}
