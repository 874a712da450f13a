/// QPSK modulation and soft demodulation
/// Based on 3GPP TS 38.211 Section 5.1.3

use num_complex::Complex32;
use std::f32::consts::FRAC_1_SQRT_2;
use std::f32::consts::SQRT_2;

/// Bits per QPSK symbol
pub const QPSK_BITS_PER_SYMBOL: usize = 2;

/// QPSK modem
#[derive(Debug, Clone, Copy, Default)]
pub struct QpskModem;

impl QpskModem {
    pub fn new() -> Self {
        Self
    }

    /// Map bit pairs to symbols: d = ((1 - 2b0) + j(1 - 2b1)) / sqrt(2)
    pub fn modulate(&self, bits: &[u8], symbols: &mut [Complex32]) {
        debug_assert!(symbols.len() * QPSK_BITS_PER_SYMBOL >= bits.len());
        let pairs = bits.chunks_exact(QPSK_BITS_PER_SYMBOL);
        for (symbol, pair) in symbols.iter_mut().zip(pairs) {
            *symbol = Complex32::new(
                FRAC_1_SQRT_2 * (1.0 - 2.0 * (pair[0] & 1) as f32),
                FRAC_1_SQRT_2 * (1.0 - 2.0 * (pair[1] & 1) as f32),
            );
        }
    }

    /// Soft demodulation, LLRs are positive for bit 0
    pub fn demodulate_soft(&self, symbols: &[Complex32], llrs: &mut [f32]) {
        debug_assert!(llrs.len() >= symbols.len() * QPSK_BITS_PER_SYMBOL);
        let pairs = llrs.chunks_exact_mut(QPSK_BITS_PER_SYMBOL);
        for (symbol, pair) in symbols.iter().zip(pairs) {
            pair[0] = symbol.re * SQRT_2;
            pair[1] = symbol.im * SQRT_2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constellation() {
        let modem = QpskModem::new();
        let bits = [0, 0, 0, 1, 1, 0, 1, 1];
        let mut symbols = [Complex32::new(0.0, 0.0); 4];
        modem.modulate(&bits, &mut symbols);

        let a = FRAC_1_SQRT_2;
        assert_eq!(symbols[0], Complex32::new(a, a));
        assert_eq!(symbols[1], Complex32::new(a, -a));
        assert_eq!(symbols[2], Complex32::new(-a, a));
        assert_eq!(symbols[3], Complex32::new(-a, -a));
        for s in symbols {
            assert!((s.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_soft_demodulation_signs() {
        let modem = QpskModem::new();
        let bits = [1, 0, 0, 1, 1, 1];
        let mut symbols = [Complex32::new(0.0, 0.0); 3];
        modem.modulate(&bits, &mut symbols);

        let mut llrs = [0f32; 6];
        modem.demodulate_soft(&symbols, &mut llrs);
        for (llr, bit) in llrs.iter().zip(bits.iter()) {
            assert_eq!(*llr < 0.0, *bit == 1);
            assert!((llr.abs() - 1.0).abs() < 1e-6);
        }
    }
}
