/// CRC calculation for 5G NR transport and control channels
/// Based on 3GPP TS 38.212 Section 5.1

use common::utils::{read_bits, write_bits};

/// CRC generator polynomials of TS 38.212 Section 5.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcKind {
    /// gCRC24A, transport blocks
    Crc24A,
    /// gCRC24B, code block segments
    Crc24B,
    /// gCRC24C, PBCH and DCI
    Crc24C,
    /// gCRC16
    Crc16,
    /// gCRC11, UCI
    Crc11,
    /// gCRC6, UCI
    Crc6,
}

impl CrcKind {
    /// Polynomial including the D^L term
    fn polynomial(&self) -> u32 {
        match self {
            CrcKind::Crc24A => 0x1864CFB,
            CrcKind::Crc24B => 0x1800063,
            // D^24 + D^23 + D^21 + D^20 + D^17 + D^15 + D^13 + D^12 + D^8 + D^4 + D^2 + D + 1
            CrcKind::Crc24C => 0x1B2B117,
            CrcKind::Crc16 => 0x11021,
            CrcKind::Crc11 => 0xE21,
            CrcKind::Crc6 => 0x61,
        }
    }

    /// Number of parity bits L
    pub fn order(&self) -> usize {
        match self {
            CrcKind::Crc24A | CrcKind::Crc24B | CrcKind::Crc24C => 24,
            CrcKind::Crc16 => 16,
            CrcKind::Crc11 => 11,
            CrcKind::Crc6 => 6,
        }
    }
}

/// CRC engine operating on unpacked bits
#[derive(Debug, Clone)]
pub struct Crc {
    order: usize,
    polynomial: u32,
    mask: u32,
}

impl Crc {
    /// Create a CRC engine for the given polynomial
    pub fn new(kind: CrcKind) -> Self {
        let order = kind.order();
        let mask = (1u32 << order) - 1;
        Self {
            order,
            polynomial: kind.polynomial() & mask,
            mask,
        }
    }

    /// Number of parity bits
    pub fn order(&self) -> usize {
        self.order
    }

    /// Calculate the checksum of an unpacked bit sequence
    pub fn checksum(&self, bits: &[u8]) -> u32 {
        let msb = self.order - 1;
        let mut crc = 0u32;

        for &bit in bits {
            let feedback = ((crc >> msb) as u8 & 1) ^ (bit & 1);
            crc = (crc << 1) & self.mask;
            if feedback != 0 {
                crc ^= self.polynomial;
            }
        }

        crc
    }

    /// Append the checksum of `bits[..payload_len]` after the payload
    ///
    /// `bits` must hold at least `payload_len + order` elements.
    pub fn attach(&self, bits: &mut [u8], payload_len: usize) -> u32 {
        let checksum = self.checksum(&bits[..payload_len]);
        write_bits(&mut bits[payload_len..], checksum, self.order);
        checksum
    }

    /// Verify a sequence of `total_len` bits whose last `order` bits are the checksum
    pub fn check(&self, bits: &[u8], total_len: usize) -> bool {
        if total_len < self.order || bits.len() < total_len {
            return false;
        }
        let payload_len = total_len - self.order;
        self.checksum(&bits[..payload_len]) == read_bits(&bits[payload_len..total_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_payload_has_zero_checksum() {
        let crc = Crc::new(CrcKind::Crc24C);
        assert_eq!(crc.checksum(&[0u8; 32]), 0);
    }

    const ALL_KINDS: [CrcKind; 6] = [
        CrcKind::Crc24A,
        CrcKind::Crc24B,
        CrcKind::Crc24C,
        CrcKind::Crc16,
        CrcKind::Crc11,
        CrcKind::Crc6,
    ];

    fn ascii_bits(text: &[u8]) -> Vec<u8> {
        text.iter()
            .flat_map(|&byte| (0..8).map(move |i| (byte >> (7 - i)) & 1))
            .collect()
    }

    #[test]
    fn test_single_one_is_polynomial_remainder() {
        // A lone 1 followed by L zeros divides to the polynomial without its top term
        let expected = [0x864CFB, 0x800063, 0xB2B117, 0x1021, 0x621, 0x21];
        for (kind, remainder) in ALL_KINDS.into_iter().zip(expected) {
            assert_eq!(Crc::new(kind).checksum(&[1]), remainder, "{:?}", kind);
        }
    }

    #[test]
    fn test_check_values() {
        // "123456789", zero initial state, no output reflection
        let bits = ascii_bits(b"123456789");
        let expected = [0xCDE703, 0x23EF52, 0xF48279, 0x31C3, 0x5CA, 0x15];
        for (kind, check) in ALL_KINDS.into_iter().zip(expected) {
            assert_eq!(Crc::new(kind).checksum(&bits), check, "{:?}", kind);
        }
    }

    #[test]
    fn test_attach_and_check() {
        let crc = Crc::new(CrcKind::Crc24C);
        let mut bits = [0u8; 56];
        for (i, b) in bits[..32].iter_mut().enumerate() {
            *b = ((i * 7) % 5 == 0) as u8;
        }

        let checksum = crc.attach(&mut bits, 32);
        assert_eq!(checksum & 0xFF00_0000, 0);
        assert!(crc.check(&bits, 56));

        // Whole codeword divides by the generator
        assert_eq!(crc.checksum(&bits), 0);
    }

    #[test]
    fn test_check_detects_bit_errors() {
        for kind in ALL_KINDS {
            let crc = Crc::new(kind);
            let mut bits = vec![0u8; 20 + crc.order()];
            bits[3] = 1;
            bits[11] = 1;
            crc.attach(&mut bits, 20);
            assert!(crc.check(&bits, bits.len()), "{:?}", kind);

            for i in 0..bits.len() {
                let mut corrupted = bits.clone();
                corrupted[i] ^= 1;
                assert!(!crc.check(&corrupted, corrupted.len()), "{:?} bit {}", kind, i);
            }
        }
    }

    #[test]
    fn test_check_rejects_short_input() {
        let crc = Crc::new(CrcKind::Crc24C);
        assert!(!crc.check(&[0u8; 10], 10));
    }
}
