/// Polar coding implementation for 5G NR
/// Based on 3GPP TS 38.212 Sections 5.3.1 (code construction and encoding)
/// and 5.4.1 (rate matching)

use crate::PhyError;
use tracing::debug;

/// Maximum Polar code length (log2)
pub const NMAX_LOG: usize = 10;
/// Maximum Polar code length
pub const NMAX: usize = 1 << NMAX_LOG;
/// Minimum Polar code length (log2)
const NMIN_LOG: usize = 5;

/// LLR given to shortened coded bits, which are known to be zero
const SHORTENED_LLR: f32 = 1.0e6;

/// Polar sequence Q_0^(Nmax-1) in ascending order of reliability (Table 5.3.1.2-1)
static RELIABILITY_SEQUENCE: [u16; NMAX] = [
    0, 1, 2, 4, 8, 16, 32, 3, 5, 64, 9, 6, 17, 10, 18, 128,
    12, 33, 65, 20, 256, 34, 24, 36, 7, 129, 66, 512, 11, 40, 68, 130,
    19, 13, 48, 14, 72, 257, 21, 132, 35, 258, 26, 513, 80, 37, 25, 22,
    136, 260, 264, 38, 514, 96, 67, 41, 144, 28, 69, 42, 516, 49, 74, 272,
    160, 520, 288, 528, 192, 544, 70, 44, 131, 81, 50, 73, 15, 320, 133, 52,
    23, 134, 384, 76, 137, 82, 56, 27, 97, 39, 259, 84, 138, 145, 261, 29,
    43, 98, 515, 88, 140, 30, 146, 71, 262, 265, 161, 576, 45, 100, 640, 51,
    148, 46, 75, 266, 273, 517, 104, 162, 53, 193, 152, 77, 164, 768, 268, 274,
    518, 54, 83, 57, 521, 112, 135, 78, 289, 194, 85, 276, 522, 58, 168, 139,
    99, 86, 60, 280, 89, 290, 529, 524, 196, 141, 101, 147, 176, 142, 530, 321,
    31, 200, 90, 545, 292, 322, 532, 263, 149, 102, 105, 304, 296, 163, 92, 47,
    267, 385, 546, 324, 208, 386, 150, 153, 165, 106, 55, 328, 536, 577, 548, 113,
    154, 79, 269, 108, 578, 224, 166, 519, 552, 195, 270, 641, 523, 275, 580, 291,
    59, 169, 560, 114, 277, 156, 87, 197, 116, 170, 61, 531, 525, 642, 281, 278,
    526, 177, 293, 388, 91, 584, 769, 198, 172, 120, 201, 336, 62, 282, 143, 103,
    178, 294, 93, 644, 202, 592, 323, 392, 297, 770, 107, 180, 151, 209, 284, 648,
    94, 204, 298, 400, 608, 352, 325, 533, 155, 210, 305, 547, 300, 109, 184, 534,
    537, 115, 167, 225, 326, 306, 772, 157, 656, 329, 110, 117, 212, 171, 776, 330,
    226, 549, 538, 387, 308, 216, 416, 271, 279, 158, 337, 550, 672, 118, 332, 579,
    540, 389, 173, 121, 553, 199, 784, 179, 228, 338, 312, 704, 390, 174, 554, 581,
    393, 283, 122, 448, 353, 561, 203, 63, 340, 394, 527, 582, 556, 181, 295, 285,
    232, 124, 205, 182, 643, 562, 286, 585, 299, 354, 211, 401, 185, 396, 344, 586,
    645, 593, 535, 240, 206, 95, 327, 564, 800, 402, 356, 307, 301, 417, 213, 568,
    832, 588, 186, 646, 404, 227, 896, 594, 418, 302, 649, 771, 360, 539, 111, 331,
    214, 309, 188, 449, 217, 408, 609, 596, 551, 650, 229, 159, 420, 310, 541, 773,
    610, 657, 333, 119, 600, 339, 218, 368, 652, 230, 391, 313, 450, 542, 334, 233,
    555, 774, 175, 123, 658, 612, 341, 777, 220, 314, 424, 395, 673, 583, 355, 287,
    183, 234, 125, 557, 660, 616, 342, 316, 241, 778, 563, 345, 452, 397, 403, 207,
    674, 558, 785, 432, 357, 187, 236, 664, 624, 587, 780, 705, 126, 242, 565, 398,
    346, 456, 358, 405, 303, 569, 244, 595, 189, 566, 676, 361, 706, 589, 215, 786,
    647, 348, 419, 406, 464, 680, 801, 362, 590, 409, 570, 788, 597, 572, 219, 311,
    708, 598, 601, 651, 421, 792, 802, 611, 602, 410, 231, 688, 653, 248, 369, 190,
    364, 654, 659, 335, 480, 315, 221, 370, 613, 422, 425, 451, 614, 543, 235, 412,
    343, 372, 775, 317, 222, 426, 453, 237, 559, 833, 804, 712, 834, 661, 808, 779,
    617, 604, 433, 720, 816, 836, 347, 897, 243, 662, 454, 318, 675, 618, 898, 781,
    376, 428, 665, 736, 567, 840, 625, 238, 359, 457, 399, 787, 591, 678, 434, 677,
    349, 245, 458, 666, 620, 363, 127, 191, 782, 407, 436, 626, 571, 465, 681, 246,
    707, 350, 599, 668, 790, 460, 249, 682, 573, 411, 803, 789, 709, 365, 440, 628,
    689, 374, 423, 466, 793, 250, 371, 481, 574, 413, 603, 366, 468, 655, 900, 805,
    615, 684, 710, 429, 794, 252, 373, 605, 848, 690, 713, 632, 482, 806, 427, 904,
    414, 223, 663, 692, 835, 619, 472, 455, 796, 809, 714, 721, 837, 716, 864, 810,
    606, 912, 722, 696, 377, 435, 817, 319, 621, 812, 484, 430, 838, 667, 488, 239,
    378, 459, 622, 627, 437, 380, 818, 461, 496, 669, 679, 724, 841, 629, 351, 467,
    438, 737, 251, 462, 442, 441, 469, 247, 683, 842, 738, 899, 670, 783, 849, 820,
    728, 928, 791, 367, 901, 630, 685, 844, 633, 711, 253, 691, 824, 902, 686, 740,
    850, 375, 444, 470, 483, 415, 485, 905, 795, 473, 634, 744, 852, 960, 865, 693,
    797, 906, 715, 807, 474, 636, 694, 254, 717, 575, 913, 798, 811, 379, 697, 431,
    607, 489, 866, 723, 486, 908, 718, 813, 476, 856, 839, 725, 698, 914, 752, 868,
    819, 814, 439, 929, 490, 623, 671, 739, 916, 463, 843, 381, 497, 930, 821, 726,
    961, 872, 492, 631, 729, 700, 443, 741, 845, 920, 382, 822, 851, 730, 498, 880,
    742, 445, 471, 635, 932, 687, 903, 825, 500, 846, 745, 826, 732, 446, 962, 936,
    475, 853, 867, 637, 907, 487, 695, 746, 828, 753, 854, 857, 504, 799, 255, 964,
    909, 719, 477, 915, 638, 748, 944, 869, 491, 699, 754, 858, 478, 968, 383, 910,
    815, 976, 870, 917, 727, 493, 873, 701, 931, 756, 860, 499, 731, 823, 922, 874,
    918, 502, 933, 743, 760, 881, 494, 702, 921, 501, 876, 847, 992, 447, 733, 827,
    934, 882, 937, 963, 747, 505, 855, 924, 734, 829, 965, 938, 884, 506, 749, 945,
    966, 755, 859, 940, 830, 911, 871, 639, 888, 479, 946, 750, 969, 508, 861, 757,
    970, 919, 875, 862, 758, 948, 977, 923, 972, 761, 877, 952, 495, 703, 935, 978,
    883, 762, 503, 925, 878, 735, 993, 885, 939, 994, 980, 926, 764, 941, 967, 886,
    831, 947, 507, 889, 984, 751, 942, 996, 971, 890, 509, 949, 973, 1000, 892, 950,
    863, 759, 1008, 510, 979, 953, 763, 974, 954, 879, 981, 982, 927, 995, 765, 956,
    887, 985, 997, 986, 943, 891, 998, 766, 511, 988, 1001, 951, 1002, 893, 975, 894,
    1009, 955, 1004, 1010, 957, 983, 958, 987, 1012, 999, 1016, 767, 989, 1003, 990, 1005,
    959, 1011, 1013, 895, 1006, 1014, 1017, 1018, 991, 1020, 1007, 1015, 1019, 1021, 1022, 1023,
];

/// Sub-block interleaver pattern P(i) (Table 5.4.1.1-1)
const SUBBLOCK_PATTERN: [usize; 32] = [
    0, 1, 2, 4, 3, 5, 6, 7, 8, 16, 9, 17, 10, 18, 11, 19,
    12, 20, 13, 21, 14, 22, 15, 23, 24, 25, 26, 28, 27, 29, 30, 31,
];

/// Sub-block interleaver output position n maps to coded bit J(n)
fn subblock_index(i: usize, n: usize) -> usize {
    let block = n / 32;
    SUBBLOCK_PATTERN[i / block] * block + i % block
}

/// Smallest n such that 2^n >= value
fn ceil_log2(value: usize) -> usize {
    value.next_power_of_two().trailing_zeros() as usize
}

/// Bit selection mode of the circular buffer (TS 38.212 5.4.1.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitSelection {
    /// E >= N, coded bits are repeated
    Repetition,
    /// E < N and K/E <= 7/16, leading bits are dropped
    Puncturing,
    /// E < N and K/E > 7/16, trailing bits are dropped
    Shortening,
}

/// Polar code structure
#[derive(Debug, Clone)]
pub struct PolarCode {
    /// Code length (N)
    n: usize,
    /// Code length in log2
    n_log: usize,
    /// Information bits length (K)
    k: usize,
    /// Target output length (E)
    e: usize,
    /// Rate matching mode for this (K, E, N)
    selection: BitSelection,
    /// Information bit positions, ascending
    info_set: Vec<usize>,
    /// Frozen bit positions (true = frozen, false = information)
    frozen_bits: Vec<bool>,
}

impl PolarCode {
    /// Construct the code for K information bits rate matched to E bits
    pub fn new(k: usize, e: usize, n_max_log: usize) -> Result<Self, PhyError> {
        if k == 0 || k > e {
            return Err(PhyError::InvalidInput(format!(
                "Polar code requires 0 < K <= E, got K={} E={}",
                k, e
            )));
        }
        if !(NMIN_LOG..=NMAX_LOG).contains(&n_max_log) {
            return Err(PhyError::InvalidInput(format!(
                "Polar n_max {} outside {}..={}",
                n_max_log, NMIN_LOG, NMAX_LOG
            )));
        }

        let n_log = Self::calculate_n_log(k, e, n_max_log);
        let n = 1 << n_log;
        if k > n {
            return Err(PhyError::InitializationFailed(format!(
                "K={} does not fit in N={}",
                k, n
            )));
        }

        let selection = if e >= n {
            BitSelection::Repetition
        } else if 16 * k <= 7 * e {
            BitSelection::Puncturing
        } else {
            BitSelection::Shortening
        };

        // Positions frozen by rate matching before reliability selection
        let mut frozen_bits = vec![false; n];
        match selection {
            BitSelection::Repetition => {}
            BitSelection::Puncturing => {
                for i in 0..(n - e) {
                    frozen_bits[subblock_index(i, n)] = true;
                }
                let extra = if 4 * e >= 3 * n {
                    // ceil(3N/4 - E/2)
                    (3 * n - 2 * e + 3) / 4
                } else {
                    // ceil(9N/16 - E/4)
                    (9 * n - 4 * e + 15) / 16
                };
                frozen_bits[..extra].fill(true);
            }
            BitSelection::Shortening => {
                for i in e..n {
                    frozen_bits[subblock_index(i, n)] = true;
                }
            }
        }

        // K most reliable remaining positions carry information
        let mut info_set: Vec<usize> = RELIABILITY_SEQUENCE
            .iter()
            .rev()
            .map(|&q| q as usize)
            .filter(|&q| q < n && !frozen_bits[q])
            .take(k)
            .collect();
        if info_set.len() < k {
            return Err(PhyError::InitializationFailed(format!(
                "Only {} unfrozen positions for K={} (N={}, E={})",
                info_set.len(),
                k,
                n,
                e
            )));
        }
        info_set.sort_unstable();

        frozen_bits.fill(true);
        for &pos in &info_set {
            frozen_bits[pos] = false;
        }

        debug!("Polar code: K={}, E={}, N={}, {:?}", k, e, n, selection);

        Ok(Self {
            n,
            n_log,
            k,
            e,
            selection,
            info_set,
            frozen_bits,
        })
    }

    /// Calculate n = log2(N) from K and E (TS 38.212 5.3.1)
    fn calculate_n_log(k: usize, e: usize, n_max_log: usize) -> usize {
        let e_log = ceil_log2(e);
        let n1 = if e_log > 0 && 8 * e <= 9 * (1 << (e_log - 1)) && 16 * k < 9 * e {
            e_log - 1
        } else {
            e_log
        };

        // R_min = 1/8
        let n2 = ceil_log2(8 * k);

        n1.min(n2).min(n_max_log).max(NMIN_LOG)
    }

    pub fn get_n(&self) -> usize {
        self.n
    }

    pub fn get_n_log(&self) -> usize {
        self.n_log
    }

    pub fn get_k(&self) -> usize {
        self.k
    }

    pub fn get_e(&self) -> usize {
        self.e
    }

    pub fn get_selection(&self) -> BitSelection {
        self.selection
    }

    pub fn get_info_set(&self) -> &[usize] {
        &self.info_set
    }

    pub fn get_frozen_bits(&self) -> &[bool] {
        &self.frozen_bits
    }
}

/// Polar channel allocator
pub struct PolarAllocator;

impl PolarAllocator {
    /// Place K information bits in the information set, frozen bits are zero
    pub fn allocate(output: &mut [u8], input: &[u8], code: &PolarCode) {
        output[..code.n].fill(0);
        for (&pos, &bit) in code.info_set.iter().zip(input) {
            output[pos] = bit;
        }
    }

    /// Read the K information bits back from a decoded u-vector
    pub fn extract(output: &mut [u8], input: &[u8], code: &PolarCode) {
        for (bit, &pos) in output.iter_mut().zip(&code.info_set) {
            *bit = input[pos];
        }
    }
}

/// Polar encoder
pub struct PolarEncoder;

impl PolarEncoder {
    /// Encode using the Polar transform x = u * G_N, G_N = F^(x)n
    pub fn encode(output: &mut [u8], input: &[u8], n_log: usize) {
        let n = 1 << n_log;
        output[..n].copy_from_slice(&input[..n]);

        for s in 1..=n_log {
            let half_stage = 1 << (s - 1);
            let full_stage = 1 << s;

            for j in (0..n).step_by(full_stage) {
                for i in 0..half_stage {
                    output[j + i] ^= output[j + i + half_stage];
                }
            }
        }
    }
}

/// Successive cancellation Polar decoder
///
/// LLRs are positive for bit 0. Scratch memory is allocated once for the
/// largest code and reused across calls.
#[derive(Debug, Clone)]
pub struct PolarDecoder {
    /// LLRs of the child nodes along the current path
    scratch: Vec<f32>,
    /// Re-encoded partial sums
    partial: Vec<u8>,
}

impl PolarDecoder {
    /// Create a decoder for codes up to 2^n_max_log
    pub fn new(n_max_log: usize) -> Result<Self, PhyError> {
        if n_max_log > NMAX_LOG {
            return Err(PhyError::InitializationFailed(format!(
                "Polar decoder n_max {} exceeds {}",
                n_max_log, NMAX_LOG
            )));
        }
        let n_max = 1 << n_max_log;
        Ok(Self {
            scratch: vec![0.0; n_max],
            partial: vec![0; n_max],
        })
    }

    /// Decode N channel LLRs into the N-bit u-vector (frozen positions are zero)
    pub fn decode(
        &mut self,
        output: &mut [u8],
        llrs: &[f32],
        code: &PolarCode,
    ) -> Result<(), PhyError> {
        let n = code.n;
        if n > self.scratch.len() {
            return Err(PhyError::InvalidInput(format!(
                "Code length {} exceeds decoder size {}",
                n,
                self.scratch.len()
            )));
        }
        if llrs.len() < n || output.len() < n {
            return Err(PhyError::InvalidInput(format!(
                "Polar decoder expects {} LLRs, got {}",
                n,
                llrs.len()
            )));
        }

        sc_node(
            &llrs[..n],
            &code.frozen_bits,
            &mut output[..n],
            &mut self.partial[..n],
            &mut self.scratch[..n],
        );

        Ok(())
    }
}

/// Check-node update, min-sum approximation of the box-plus
fn f_function(a: f32, b: f32) -> f32 {
    let magnitude = a.abs().min(b.abs());
    if (a < 0.0) != (b < 0.0) {
        -magnitude
    } else {
        magnitude
    }
}

/// Bit-node update given the partial sum of the left branch
fn g_function(a: f32, b: f32, partial: u8) -> f32 {
    if partial == 0 {
        b + a
    } else {
        b - a
    }
}

/// Decode one node of the SC tree. `x` receives the re-encoded bits of the node.
fn sc_node(llr: &[f32], frozen: &[bool], u: &mut [u8], x: &mut [u8], scratch: &mut [f32]) {
    let n = llr.len();
    if n == 1 {
        let bit = if frozen[0] { 0 } else { (llr[0] < 0.0) as u8 };
        u[0] = bit;
        x[0] = bit;
        return;
    }

    // All frozen: nothing to decide
    if frozen.iter().all(|&f| f) {
        u.fill(0);
        x.fill(0);
        return;
    }

    let half = n / 2;
    let (child_llr, child_scratch) = scratch.split_at_mut(half);
    let (u_left, u_right) = u.split_at_mut(half);
    let (x_left, x_right) = x.split_at_mut(half);

    for i in 0..half {
        child_llr[i] = f_function(llr[i], llr[i + half]);
    }
    sc_node(child_llr, &frozen[..half], u_left, x_left, child_scratch);

    for i in 0..half {
        child_llr[i] = g_function(llr[i], llr[i + half], x_left[i]);
    }
    sc_node(child_llr, &frozen[half..], u_right, x_right, child_scratch);

    for i in 0..half {
        x_left[i] ^= x_right[i];
    }
}

/// Triangular channel interleaver pattern (TS 38.212 5.4.1.3): output m takes input pattern[m]
fn channel_interleaver_pattern(e: usize) -> Vec<usize> {
    // Smallest T such that T(T+1)/2 >= E
    let mut t = 0;
    while t * (t + 1) / 2 < e {
        t += 1;
    }

    let row_start = |i: usize| i * t - i * i.saturating_sub(1) / 2;

    let mut pattern = Vec::with_capacity(e);
    for j in 0..t {
        for i in 0..(t - j) {
            let src = row_start(i) + j;
            if src < e {
                pattern.push(src);
            }
        }
    }

    pattern
}

/// Polar rate matcher
///
/// Holds the working buffers of both directions.
#[derive(Debug, Clone, Default)]
pub struct PolarRateMatcher {
    interleaved: Vec<u8>,
    selected: Vec<u8>,
    soft_selected: Vec<f32>,
    soft_interleaved: Vec<f32>,
}

impl PolarRateMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rate match N coded bits to E bits
    ///
    /// `interleave` enables the triangular channel interleaver (I_BIL = 1).
    pub fn rate_match(
        &mut self,
        output: &mut [u8],
        input: &[u8],
        code: &PolarCode,
        interleave: bool,
    ) -> Result<(), PhyError> {
        let n = code.n;
        let e = code.e;
        if input.len() < n || output.len() < e {
            return Err(PhyError::InvalidInput(format!(
                "Rate matcher expects {} input and {} output bits, got {} and {}",
                n,
                e,
                input.len(),
                output.len()
            )));
        }

        // Sub-block interleaving
        self.interleaved.resize(n, 0);
        for (i, y) in self.interleaved.iter_mut().enumerate() {
            *y = input[subblock_index(i, n)];
        }

        // Bit selection
        self.selected.resize(e, 0);
        let y = &self.interleaved;
        for (k, bit) in self.selected.iter_mut().enumerate() {
            *bit = match code.selection {
                BitSelection::Repetition => y[k % n],
                BitSelection::Puncturing => y[k + n - e],
                BitSelection::Shortening => y[k],
            };
        }

        if interleave {
            for (out, src) in output[..e].iter_mut().zip(channel_interleaver_pattern(e)) {
                *out = self.selected[src];
            }
        } else {
            output[..e].copy_from_slice(&self.selected);
        }

        debug!("Rate matched {} bits to {} bits ({:?})", n, e, code.selection);
        Ok(())
    }

    /// Recover N coded-bit LLRs from E received LLRs
    pub fn rate_recover(
        &mut self,
        output: &mut [f32],
        input: &[f32],
        code: &PolarCode,
        interleave: bool,
    ) -> Result<(), PhyError> {
        let n = code.n;
        let e = code.e;
        if input.len() < e || output.len() < n {
            return Err(PhyError::InvalidInput(format!(
                "Rate recovery expects {} input and {} output LLRs, got {} and {}",
                e,
                n,
                input.len(),
                output.len()
            )));
        }

        self.soft_selected.resize(e, 0.0);
        if interleave {
            for (&llr, dst) in input[..e].iter().zip(channel_interleaver_pattern(e)) {
                self.soft_selected[dst] = llr;
            }
        } else {
            self.soft_selected.copy_from_slice(&input[..e]);
        }

        self.soft_interleaved.clear();
        self.soft_interleaved.resize(n, 0.0);
        let y = &mut self.soft_interleaved;
        match code.selection {
            BitSelection::Repetition => {
                for (k, &llr) in self.soft_selected.iter().enumerate() {
                    y[k % n] += llr;
                }
            }
            BitSelection::Puncturing => {
                // Punctured bits stay at zero confidence
                y[(n - e)..].copy_from_slice(&self.soft_selected);
            }
            BitSelection::Shortening => {
                y[..e].copy_from_slice(&self.soft_selected);
                y[e..].fill(SHORTENED_LLR);
            }
        }

        for (i, &llr) in y.iter().enumerate() {
            output[subblock_index(i, n)] = llr;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_and_match(code: &PolarCode, info: &[u8], interleave: bool) -> Vec<u8> {
        let n = code.get_n();
        let mut allocated = vec![0u8; n];
        PolarAllocator::allocate(&mut allocated, info, code);
        let mut encoded = vec![0u8; n];
        PolarEncoder::encode(&mut encoded, &allocated, code.get_n_log());
        let mut matched = vec![0u8; code.get_e()];
        PolarRateMatcher::new()
            .rate_match(&mut matched, &encoded, code, interleave)
            .unwrap();
        matched
    }

    fn recover_and_decode(code: &PolarCode, bits: &[u8], interleave: bool) -> Vec<u8> {
        let n = code.get_n();
        let llrs: Vec<f32> = bits
            .iter()
            .map(|&b| if b == 0 { 4.0 } else { -4.0 })
            .collect();
        let mut recovered = vec![0f32; n];
        PolarRateMatcher::new()
            .rate_recover(&mut recovered, &llrs, code, interleave)
            .unwrap();
        let mut u = vec![0u8; n];
        PolarDecoder::new(NMAX_LOG)
            .unwrap()
            .decode(&mut u, &recovered, code)
            .unwrap();
        let mut info = vec![0u8; code.get_k()];
        PolarAllocator::extract(&mut info, &u, code);
        info
    }

    #[test]
    fn test_reliability_sequence_is_permutation() {
        let mut seen = vec![false; NMAX];
        for &q in RELIABILITY_SEQUENCE.iter() {
            assert!(!seen[q as usize], "duplicate {}", q);
            seen[q as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
        // Least and most reliable channels
        assert_eq!(RELIABILITY_SEQUENCE[0], 0);
        assert_eq!(RELIABILITY_SEQUENCE[NMAX - 1], 1023);
    }

    #[test]
    fn test_subblock_interleaver_is_permutation() {
        let n = 512;
        let mut seen = vec![false; n];
        for i in 0..n {
            seen[subblock_index(i, n)] = true;
        }
        assert!(seen.iter().all(|&s| s));
        // P(3) = 4: the fourth block of 16 comes from the fifth
        assert_eq!(subblock_index(3 * 16, n), 4 * 16);
    }

    #[test]
    fn test_pbch_code_parameters() {
        let code = PolarCode::new(56, 864, 9).unwrap();
        assert_eq!(code.get_n(), 512);
        assert_eq!(code.get_n_log(), 9);
        assert_eq!(code.get_selection(), BitSelection::Repetition);
        assert_eq!(code.get_info_set().len(), 56);
        assert_eq!(code.get_frozen_bits().iter().filter(|&&f| !f).count(), 56);
        // The most reliable channel always carries information
        assert!(code.get_info_set().contains(&511));
    }

    #[test]
    fn test_code_length_selection() {
        // n_min applies to tiny codes
        assert_eq!(PolarCode::new(4, 8, 9).unwrap().get_n(), 32);
        // E slightly above a power of two with a low rate uses the smaller N
        assert_eq!(PolarCode::new(20, 140, 9).unwrap().get_n(), 128);
        // n_max caps the length
        assert_eq!(PolarCode::new(200, 1700, 9).unwrap().get_n(), 512);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(PolarCode::new(0, 100, 9).is_err());
        assert!(PolarCode::new(101, 100, 9).is_err());
        assert!(PolarCode::new(10, 100, 11).is_err());
        assert!(PolarDecoder::new(11).is_err());
    }

    #[test]
    fn test_encoder_butterfly() {
        // u = [0, .., 0, 1] encodes to the all-ones word
        let mut u = [0u8; 32];
        u[31] = 1;
        let mut x = [0u8; 32];
        PolarEncoder::encode(&mut x, &u, 5);
        assert!(x.iter().all(|&b| b == 1));

        // u = [1, 0, .., 0] encodes to a single one
        let mut u = [0u8; 32];
        u[0] = 1;
        PolarEncoder::encode(&mut x, &u, 5);
        assert_eq!(x[0], 1);
        assert!(x[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_repetition_roundtrip() {
        let code = PolarCode::new(56, 864, 9).unwrap();
        let info: Vec<u8> = (0..56).map(|i| ((i * 5 + 1) % 3 == 0) as u8).collect();
        let matched = encode_and_match(&code, &info, false);
        assert_eq!(matched.len(), 864);
        // Repetition: the buffer wraps after N bits
        assert_eq!(matched[..352], matched[512..]);
        assert_eq!(recover_and_decode(&code, &matched, false), info);
    }

    #[test]
    fn test_puncturing_roundtrip() {
        let code = PolarCode::new(30, 100, 9).unwrap();
        assert_eq!(code.get_selection(), BitSelection::Puncturing);
        let info: Vec<u8> = (0..30).map(|i| (i % 2) as u8).collect();
        let matched = encode_and_match(&code, &info, false);
        assert_eq!(recover_and_decode(&code, &matched, false), info);
    }

    #[test]
    fn test_shortening_roundtrip_with_channel_interleaver() {
        let code = PolarCode::new(60, 100, 9).unwrap();
        assert_eq!(code.get_selection(), BitSelection::Shortening);
        let info: Vec<u8> = (0..60).map(|i| (i % 7 < 3) as u8).collect();
        let matched = encode_and_match(&code, &info, true);
        assert_eq!(recover_and_decode(&code, &matched, true), info);
    }

    #[test]
    fn test_decoder_corrects_errors() {
        let code = PolarCode::new(56, 864, 9).unwrap();
        let info: Vec<u8> = (0..56).map(|i| (i % 4 == 1) as u8).collect();
        let mut matched = encode_and_match(&code, &info, false);
        for i in (0..864).step_by(50) {
            matched[i] ^= 1;
        }
        assert_eq!(recover_and_decode(&code, &matched, false), info);
    }

    #[test]
    fn test_channel_interleaver_pattern() {
        // T = 3 for E = 5: rows [0 1 2] [3 4] [-], read by column
        assert_eq!(channel_interleaver_pattern(5), vec![0, 3, 1, 4, 2]);

        let pattern = channel_interleaver_pattern(864);
        let mut seen = vec![false; 864];
        for &p in &pattern {
            seen[p] = true;
        }
        assert_eq!(pattern.len(), 864);
        assert!(seen.iter().all(|&s| s));
    }
}
