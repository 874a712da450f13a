//! Physical Broadcast Channel (PBCH) Processing
//!
//! Implements PBCH encoding/decoding according to 3GPP TS 38.212 Section 7.1
//! and TS 38.211 Section 7.3.3

use crate::phy::crc::{Crc, CrcKind};
use crate::phy::modem::QpskModem;
use crate::phy::pbch_msg::{PbchMessage, PBCH_A, PBCH_INTERLEAVER};
use crate::phy::polar::{PolarAllocator, PolarCode, PolarDecoder, PolarEncoder, PolarRateMatcher};
use crate::phy::sequence::GoldSequence;
use crate::phy::ssb::{SsbReMap, PBCH_NOF_DATA_RE, SSB_NOF_RE};
use crate::PhyError;
use common::types::{Lmax, Pci};
use common::utils::read_bits;
use num_complex::Complex32;
use tracing::{debug, info, warn};

/// CRC attached to the PBCH payload
const PBCH_CRC: CrcKind = CrcKind::Crc24C;
/// CRC length
const PBCH_CRC_LEN: usize = 24;
/// Payload plus CRC (K)
pub const PBCH_K: usize = PBCH_A + PBCH_CRC_LEN;
/// Polar code n_max
const PBCH_POLAR_N_MAX: usize = 9;
/// Polar code length (N)
pub const PBCH_N: usize = 1 << PBCH_POLAR_N_MAX;
/// Rate matching output size (E)
pub const PBCH_E: usize = 864;
/// Number of modulated symbols
pub const PBCH_M: usize = PBCH_E / 2;
/// Rate matching channel interleaver (I_BIL) is disabled for PBCH
const PBCH_RM_IBIL: bool = false;

const _: () = assert!(PBCH_M == PBCH_NOF_DATA_RE);

/// Payload interleaver slots left unscrambled: SFN 3rd and 2nd LSB, half
/// frame flag and the SSB index / k_SSB bits
const UNSCRAMBLED_SLOTS: [usize; 6] = [1, 2, 10, 11, 12, 13];

/// PBCH cell configuration
#[derive(Debug, Clone)]
pub struct PbchConfig {
    /// Physical cell ID (N_id)
    pci: Pci,
    /// Maximum number of SSB candidates
    l_max: Lmax,
    /// PBCH resource element layout for N_id mod 4
    re_map: SsbReMap,
}

impl PbchConfig {
    /// Create a configuration from raw N_id and L_max values
    pub fn new(n_id: u16, l_max: u32) -> Result<Self, PhyError> {
        let pci = Pci::new(n_id)
            .ok_or_else(|| PhyError::InvalidInput(format!("Invalid N_id: {}", n_id)))?;
        let l_max = Lmax::try_from(l_max)?;
        Ok(Self::from_parts(pci, l_max))
    }

    /// Create a configuration from validated parts
    pub fn from_parts(pci: Pci, l_max: Lmax) -> Self {
        let re_map = SsbReMap::new((pci.0 % 4) as usize);
        Self { pci, l_max, re_map }
    }

    pub fn pci(&self) -> Pci {
        self.pci
    }

    pub fn n_id(&self) -> u16 {
        self.pci.0
    }

    pub fn l_max(&self) -> Lmax {
        self.l_max
    }

    /// PBCH DM-RS frequency shift v = N_id mod 4
    pub fn dmrs_shift(&self) -> usize {
        self.re_map.dmrs_shift()
    }

    pub fn re_map(&self) -> &SsbReMap {
        &self.re_map
    }
}

/// PBCH codec construction arguments
#[derive(Debug, Clone, Copy)]
pub struct PbchArgs {
    /// Allocate the transmit chain
    pub enable_encode: bool,
    /// Allocate the receive chain
    pub enable_decode: bool,
}

impl Default for PbchArgs {
    fn default() -> Self {
        Self {
            enable_encode: true,
            enable_decode: true,
        }
    }
}

/// Transmit chain resources and working buffers
struct PbchEncoder {
    rate_matcher: PolarRateMatcher,
    modem: QpskModem,
    allocated: Vec<u8>,
    coded: Vec<u8>,
    rate_matched: Vec<u8>,
    scrambled: Vec<u8>,
    symbols: Vec<Complex32>,
}

impl PbchEncoder {
    fn new() -> Self {
        Self {
            rate_matcher: PolarRateMatcher::new(),
            modem: QpskModem::new(),
            allocated: vec![0; PBCH_N],
            coded: vec![0; PBCH_N],
            rate_matched: vec![0; PBCH_E],
            scrambled: vec![0; PBCH_E],
            symbols: vec![Complex32::new(0.0, 0.0); PBCH_M],
        }
    }
}

/// Receive chain resources and working buffers
struct PbchDecoder {
    rate_matcher: PolarRateMatcher,
    polar_decoder: PolarDecoder,
    modem: QpskModem,
    symbols: Vec<Complex32>,
    llrs: Vec<f32>,
    coded_llrs: Vec<f32>,
    decoded: Vec<u8>,
}

impl PbchDecoder {
    fn new() -> Result<Self, PhyError> {
        Ok(Self {
            rate_matcher: PolarRateMatcher::new(),
            polar_decoder: PolarDecoder::new(PBCH_POLAR_N_MAX)?,
            modem: QpskModem::new(),
            symbols: vec![Complex32::new(0.0, 0.0); PBCH_M],
            llrs: vec![0.0; PBCH_E],
            coded_llrs: vec![0.0; PBCH_N],
            decoded: vec![0; PBCH_N],
        })
    }
}

/// PBCH codec
///
/// Working buffers are reused between calls, so one instance serves one
/// thread at a time.
pub struct PbchCodec {
    crc: Crc,
    code: PolarCode,
    encoder: Option<PbchEncoder>,
    decoder: Option<PbchDecoder>,
}

impl PbchCodec {
    /// Create a codec with the requested chains
    pub fn new(args: &PbchArgs) -> Result<Self, PhyError> {
        if !args.enable_encode && !args.enable_decode {
            return Err(PhyError::InitializationFailed(
                "Encoder and decoder are disabled, at least one of them shall be active"
                    .to_string(),
            ));
        }

        let code = PolarCode::new(PBCH_K, PBCH_E, PBCH_POLAR_N_MAX)
            .map_err(|e| {
                PhyError::InitializationFailed(format!("Error getting polar code: {}", e))
            })?;
        if code.get_n() != PBCH_N {
            return Err(PhyError::InitializationFailed(format!(
                "Unexpected PBCH polar code length {}",
                code.get_n()
            )));
        }

        let encoder = args.enable_encode.then(PbchEncoder::new);
        let decoder = if args.enable_decode {
            Some(PbchDecoder::new()?)
        } else {
            None
        };

        debug!(
            "PBCH codec ready: K={}, E={}, N={}, encode={}, decode={}",
            PBCH_K,
            PBCH_E,
            code.get_n(),
            args.enable_encode,
            args.enable_decode
        );

        Ok(Self {
            crc: Crc::new(PBCH_CRC),
            code,
            encoder,
            decoder,
        })
    }

    pub fn can_encode(&self) -> bool {
        self.encoder.is_some()
    }

    pub fn can_decode(&self) -> bool {
        self.decoder.is_some()
    }

    /// Encode a PBCH message into the PBCH REs of an SS/PBCH block grid
    ///
    /// Only the 432 PBCH data REs of `ssb_grid` are written.
    pub fn encode(
        &mut self,
        cfg: &PbchConfig,
        msg: &PbchMessage,
        ssb_grid: &mut [Complex32],
    ) -> Result<(), PhyError> {
        let enc = self
            .encoder
            .as_mut()
            .ok_or(PhyError::NotInitialized("PBCH encoder"))?;
        msg.validate(cfg.l_max)?;
        check_grid(ssb_grid.len())?;

        // TS 38.212 7.1.1 PBCH payload generation
        let a = msg.pack(cfg.l_max);

        // 7.1.2 Scrambling
        let mut c = [0u8; PBCH_K];
        scramble_payload(cfg, &a, &mut c[..PBCH_A]);

        // 7.1.3 Transport block CRC attachment
        let checksum = self.crc.attach(&mut c, PBCH_A);
        info!("NR-PBCH: checksum={:06x}", checksum);

        // 7.1.4 Channel coding
        PolarAllocator::allocate(&mut enc.allocated, &c, &self.code);
        PolarEncoder::encode(&mut enc.coded, &enc.allocated, self.code.get_n_log());

        // 7.1.5 Rate matching
        enc.rate_matcher
            .rate_match(&mut enc.rate_matched, &enc.coded, &self.code, PBCH_RM_IBIL)?;

        // TS 38.211 7.3.3.1 Scrambling
        sequence_tx(cfg, msg.ssb_idx).apply_bits(&enc.rate_matched, &mut enc.scrambled);

        // 7.3.3.2 Modulation
        enc.modem.modulate(&enc.scrambled, &mut enc.symbols);

        // 7.3.3.3 Mapping to physical resources
        cfg.re_map.map(&enc.symbols, ssb_grid)
    }

    /// Decode the PBCH message of an SS/PBCH block grid
    ///
    /// `ssb_idx` is the SSB index known to the receiver, typically detected
    /// from the PBCH DM-RS; for L_max = 64 its bits 5..3 are replaced by the
    /// decoded ones. A CRC mismatch is reported as [`PhyError::CrcMismatch`].
    pub fn decode(
        &mut self,
        cfg: &PbchConfig,
        ssb_idx: u8,
        ssb_grid: &[Complex32],
    ) -> Result<PbchMessage, PhyError> {
        let dec = self
            .decoder
            .as_mut()
            .ok_or(PhyError::NotInitialized("PBCH decoder"))?;
        if ssb_idx >= 64 {
            return Err(PhyError::InvalidInput(format!(
                "SSB index {} exceeds 6 bits",
                ssb_idx
            )));
        }
        check_grid(ssb_grid.len())?;

        // TS 38.211 7.3.3.3 Mapping to physical resources
        cfg.re_map.demap(ssb_grid, &mut dec.symbols)?;

        // 7.3.3.2 Modulation
        dec.modem.demodulate_soft(&dec.symbols, &mut dec.llrs);

        // 7.3.3.1 Scrambling
        sequence_tx(cfg, ssb_idx).apply_llr(&mut dec.llrs);

        // TS 38.212 7.1.5 Rate matching
        dec.rate_matcher
            .rate_recover(&mut dec.coded_llrs, &dec.llrs, &self.code, PBCH_RM_IBIL)?;

        // 7.1.4 Channel coding
        dec.polar_decoder
            .decode(&mut dec.decoded, &dec.coded_llrs, &self.code)?;
        let mut c = [0u8; PBCH_K];
        PolarAllocator::extract(&mut c, &dec.decoded, &self.code);

        // 7.1.3 Transport block CRC attachment
        let checksum = read_bits(&c[PBCH_A..]);
        if !self.crc.check(&c, PBCH_K) {
            warn!("NR-PBCH: CRC mismatch, checksum={:06x}", checksum);
            return Err(PhyError::CrcMismatch { checksum });
        }
        info!("NR-PBCH: checksum={:06x}", checksum);

        // 7.1.2 Scrambling
        let mut a = [0u8; PBCH_A];
        scramble_payload(cfg, &c[..PBCH_A], &mut a);

        // 7.1.1 PBCH payload generation
        Ok(PbchMessage::unpack(cfg.l_max, &a, ssb_idx))
    }
}

fn check_grid(len: usize) -> Result<(), PhyError> {
    if len < SSB_NOF_RE {
        return Err(PhyError::InvalidInput(format!(
            "SS/PBCH block grid must hold {} REs, got {}",
            SSB_NOF_RE, len
        )));
    }
    Ok(())
}

/// Sequence bits consumed per value of v by the payload scrambling (M)
fn payload_scrambling_stride(l_max: Lmax) -> usize {
    if l_max.carries_ssb_idx_msb() {
        PBCH_A - 6
    } else {
        PBCH_A - 3
    }
}

/// Whether payload bit `i` is excluded from scrambling
fn is_unscrambled(i: usize) -> bool {
    UNSCRAMBLED_SLOTS.iter().any(|&slot| PBCH_INTERLEAVER[slot] == i)
}

/// Payload scrambling selector v from the SFN 3rd and 2nd LSB
fn payload_scrambling_selector(a: &[u8]) -> usize {
    2 * (a[PBCH_INTERLEAVER[1]] & 1) as usize + (a[PBCH_INTERLEAVER[2]] & 1) as usize
}

/// Scramble (or descramble) the interleaved PBCH payload (TS 38.212 7.1.2)
///
/// Returns the selector v. The selector bits are never scrambled, so the
/// same function inverts itself.
fn scramble_payload(cfg: &PbchConfig, a: &[u8], a_prime: &mut [u8]) -> usize {
    let v = payload_scrambling_selector(a);
    let offset = payload_scrambling_stride(cfg.l_max) * v;

    let mut sequence = GoldSequence::new(cfg.n_id() as u32);
    sequence.advance(offset);

    for (i, (out, &bit)) in a_prime.iter_mut().zip(&a[..PBCH_A]).enumerate() {
        let s = if is_unscrambled(i) { 0 } else { sequence.next_bit() };
        *out = bit ^ s;
    }

    debug!("NR-PBCH: payload scrambling v={} offset={}", v, offset);
    v
}

/// Offset of the bit scrambling sequence, v * E with v from the SSB index LSBs
fn sequence_tx_offset(cfg: &PbchConfig, ssb_idx: u8) -> usize {
    (ssb_idx & cfg.l_max.ssb_idx_lsb_mask()) as usize * PBCH_E
}

/// Bit scrambling sequence positioned for an SSB index (TS 38.211 7.3.3.1)
fn sequence_tx(cfg: &PbchConfig, ssb_idx: u8) -> GoldSequence {
    let offset = sequence_tx_offset(cfg, ssb_idx);
    let mut sequence = GoldSequence::new(cfg.n_id() as u32);
    sequence.advance(offset);
    debug!("NR-PBCH: bit scrambling offset={}", offset);
    sequence
}
