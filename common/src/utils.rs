//! Common Utilities
//!
//! Helpers for unpacked bit vectors (one bit per `u8`, MSB first)

use tracing::trace;

/// Write the `n_bits` least significant bits of `value` into `bits`, MSB first
pub fn write_bits(bits: &mut [u8], value: u32, n_bits: usize) {
    for (i, bit) in bits[..n_bits].iter_mut().enumerate() {
        *bit = ((value >> (n_bits - 1 - i)) & 1) as u8;
    }
}

/// Read an unpacked MSB-first bit vector as an integer
pub fn read_bits(bits: &[u8]) -> u32 {
    bits.iter().fold(0u32, |acc, &b| (acc << 1) | (b & 1) as u32)
}

/// Pack unpacked bits into bytes (MSB first, last byte zero padded)
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    let bytes: Vec<u8> = bits
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &b)| byte | ((b & 1) << (7 - i)))
        })
        .collect();

    trace!("Packed {} bits into {} bytes", bits.len(), bytes.len());
    bytes
}

/// Hex string of an unpacked bit vector
pub fn bits_to_hex(bits: &[u8]) -> String {
    pack_bits(bits).iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_bits() {
        let mut bits = [0u8; 6];
        write_bits(&mut bits, 0b101101, 6);
        assert_eq!(bits, [1, 0, 1, 1, 0, 1]);
        assert_eq!(read_bits(&bits), 0b101101);

        // Only the requested width is written
        let mut bits = [0u8; 4];
        write_bits(&mut bits, 0xFF5, 4);
        assert_eq!(bits, [0, 1, 0, 1]);
    }

    #[test]
    fn test_bit_packing() {
        let bits = vec![1, 0, 1, 0, 1, 0, 1, 0, 1, 1];
        let packed = pack_bits(&bits);
        assert_eq!(packed, vec![0xAA, 0xC0]);
    }

    #[test]
    fn test_bits_to_hex() {
        let mut bits = [0u8; 24];
        write_bits(&mut bits, 0x60_1F_02, 24);
        assert_eq!(bits_to_hex(&bits), "601f02");
    }
}
