/// Pseudo-random sequence generation
/// Based on 3GPP TS 38.211 Section 5.2.1

/// Number of warm-up iterations before the first output bit
const NC: usize = 1600;

/// Length-31 Gold sequence cursor
///
/// Every call site owns its cursor; the stream is restartable by building a
/// new cursor from the same `c_init`.
#[derive(Debug, Clone)]
pub struct GoldSequence {
    /// x1 LFSR state
    x1: u32,
    /// x2 LFSR state
    x2: u32,
}

impl GoldSequence {
    /// Create a new sequence cursor positioned at c(0)
    pub fn new(c_init: u32) -> Self {
        // x1(0) = 1, x1(n) = 0 for n = 1..30
        let mut seq = Self {
            x1: 1,
            x2: c_init & 0x7FFF_FFFF,
        };

        for _ in 0..NC {
            seq.step();
        }

        seq
    }

    /// Advance LFSR state by one bit
    fn step(&mut self) {
        // x1(n+31) = (x1(n+3) + x1(n)) mod 2
        let x1_new = ((self.x1 >> 3) ^ self.x1) & 1;
        self.x1 = (self.x1 >> 1) | (x1_new << 30);

        // x2(n+31) = (x2(n+3) + x2(n+2) + x2(n+1) + x2(n)) mod 2
        let x2_new = ((self.x2 >> 3) ^ (self.x2 >> 2) ^ (self.x2 >> 1) ^ self.x2) & 1;
        self.x2 = (self.x2 >> 1) | (x2_new << 30);
    }

    /// Generate next bit from the sequence
    pub fn next_bit(&mut self) -> u8 {
        let c = (self.x1 ^ self.x2) & 1;
        self.step();
        c as u8
    }

    /// Discard `n` bits
    pub fn advance(&mut self, n: usize) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Fill `output` with the next sequence bits
    pub fn generate(&mut self, output: &mut [u8]) {
        for c in output.iter_mut() {
            *c = self.next_bit();
        }
    }

    /// XOR `input` with the next `input.len()` bits into `output`
    pub fn apply_bits(&mut self, input: &[u8], output: &mut [u8]) {
        debug_assert_eq!(input.len(), output.len());
        for (o, &i) in output.iter_mut().zip(input) {
            *o = i ^ self.next_bit();
        }
    }

    /// Flip the sign of soft bits where the sequence is 1
    pub fn apply_llr(&mut self, llrs: &mut [f32]) {
        for llr in llrs.iter_mut() {
            if self.next_bit() == 1 {
                *llr = -*llr;
            }
        }
    }
}
