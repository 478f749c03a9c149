/// Rotate-XOR checksum (§6): seed `0x12345678`, fold in each 4-byte little-endian word
/// (zero-padded on a short tail) via `c = rotate_left(c XOR w, 7)`.
pub fn rotate_xor_checksum(data: &[u8]) -> u32 {
    let mut c: u32 = 0x1234_5678;
    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        let w = u32::from_le_bytes(word);
        c = (c ^ w).rotate_left(7);
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_the_seed_rotated() {
        assert_eq!(rotate_xor_checksum(&[]), 0x1234_5678);
    }

    #[test]
    fn is_sensitive_to_every_byte() {
        let a = rotate_xor_checksum(b"hello world");
        let b = rotate_xor_checksum(b"hello worlD");
        assert_ne!(a, b);
    }

    #[test]
    fn is_deterministic() {
        let data = b"The Shawshank Redemption";
        assert_eq!(rotate_xor_checksum(data), rotate_xor_checksum(data));
    }
}
