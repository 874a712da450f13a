/// PBCH DMRS (Demodulation Reference Signal) generation and detection
/// Based on 3GPP TS 38.211 Section 7.4.1.4

use crate::phy::pbch::PbchConfig;
use crate::phy::sequence::GoldSequence;
use crate::phy::ssb::PBCH_NOF_DMRS;
use crate::PhyError;
use common::types::Lmax;
use num_complex::Complex32;
use serde::Serialize;
use std::f32::consts::FRAC_1_SQRT_2;
use tracing::debug;

/// Number of i_SSB hypotheses
pub const PBCH_DMRS_NOF_HYPOTHESES: u8 = 8;

/// Compute i_SSB from the SSB index and half frame flag
///
/// For L_max = 4: i_ssb = 2 LSBs of the SSB index + 4 * n_hf.
/// For L_max = 8 or 64: i_ssb = 3 LSBs of the SSB index.
pub fn pbch_dmrs_i_ssb(l_max: Lmax, ssb_idx: u8, hrf: bool) -> u8 {
    match l_max {
        Lmax::L4 => (ssb_idx & 0b11) + 4 * hrf as u8,
        Lmax::L8 | Lmax::L64 => ssb_idx & 0b111,
    }
}

/// Calculate PBCH DMRS initialization value
/// c_init = 2^11 * (i_ssb + 1) * (floor(N_ID/4) + 1) + 2^6 * (i_ssb + 1) + (N_ID mod 4)
pub fn pbch_dmrs_cinit(n_id: u16, i_ssb: u8) -> u32 {
    let i_ssb = i_ssb as u32;
    let n_id_div_4 = (n_id / 4) as u32;
    let n_id_mod_4 = (n_id % 4) as u32;

    (((i_ssb + 1) * (n_id_div_4 + 1)) << 11) + ((i_ssb + 1) << 6) + n_id_mod_4
}

/// Generate the 144 PBCH DMRS symbols for an i_SSB hypothesis
fn generate_i_ssb(n_id: u16, i_ssb: u8, output: &mut [Complex32]) {
    let mut sequence = GoldSequence::new(pbch_dmrs_cinit(n_id, i_ssb));
    for symbol in output.iter_mut() {
        let c0 = sequence.next_bit();
        let c1 = sequence.next_bit();
        *symbol = Complex32::new(
            FRAC_1_SQRT_2 * (1.0 - 2.0 * c0 as f32),
            FRAC_1_SQRT_2 * (1.0 - 2.0 * c1 as f32),
        );
    }
}

/// Generate the PBCH DMRS sequence r(m), m = 0..143
pub fn generate(cfg: &PbchConfig, ssb_idx: u8, hrf: bool) -> [Complex32; PBCH_NOF_DMRS] {
    let mut sequence = [Complex32::new(0.0, 0.0); PBCH_NOF_DMRS];
    let i_ssb = pbch_dmrs_i_ssb(cfg.l_max(), ssb_idx, hrf);
    generate_i_ssb(cfg.n_id(), i_ssb, &mut sequence);
    sequence
}

/// Write the PBCH DMRS into its REs of an SS/PBCH block grid
pub fn put(
    cfg: &PbchConfig,
    ssb_idx: u8,
    hrf: bool,
    ssb_grid: &mut [Complex32],
) -> Result<(), PhyError> {
    let sequence = generate(cfg, ssb_idx, hrf);
    cfg.re_map().map_dmrs(&sequence, ssb_grid)
}

/// PBCH DMRS measurements
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DmrsMeasurement {
    /// Average energy per DMRS resource element
    pub epre: f32,
    /// Reference signal received power, |h|^2
    pub rsrp: f32,
    /// Noise estimate, EPRE - RSRP
    pub n0: f32,
    /// Signal to noise ratio in dB
    pub snr_db: f32,
    /// Flat channel estimate
    #[serde(skip)]
    pub channel: Complex32,
}

impl DmrsMeasurement {
    /// Correlate received DMRS symbols with a reference sequence
    fn from_correlation(received: &[Complex32], reference: &[Complex32]) -> Self {
        let nof_re = received.len() as f32;
        let channel = received
            .iter()
            .zip(reference)
            .map(|(y, r)| y * r.conj())
            .sum::<Complex32>()
            / nof_re;
        let epre = received.iter().map(|y| y.norm_sqr()).sum::<f32>() / nof_re;
        let rsrp = channel.norm_sqr();
        let n0 = (epre - rsrp).max(0.0);
        let snr_db = if n0 > 0.0 {
            10.0 * (rsrp / n0).log10()
        } else {
            f32::INFINITY
        };

        Self {
            epre,
            rsrp,
            n0,
            snr_db,
            channel,
        }
    }
}

/// Measure the PBCH DMRS of a known SSB index
pub fn measure(
    cfg: &PbchConfig,
    ssb_idx: u8,
    hrf: bool,
    ssb_grid: &[Complex32],
) -> Result<DmrsMeasurement, PhyError> {
    let mut received = [Complex32::new(0.0, 0.0); PBCH_NOF_DMRS];
    cfg.re_map().demap_dmrs(ssb_grid, &mut received)?;
    let reference = generate(cfg, ssb_idx, hrf);
    Ok(DmrsMeasurement::from_correlation(&received, &reference))
}

/// Result of the blind PBCH DMRS search
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DmrsDetection {
    /// SSB index LSBs (2 for L_max = 4, 3 otherwise)
    pub ssb_idx: u8,
    /// Half frame flag, only resolved when L_max = 4
    pub hrf: Option<bool>,
    /// Measurements of the winning hypothesis
    pub measurement: DmrsMeasurement,
}

/// Blind search of i_SSB over the 8 hypotheses
pub fn detect(cfg: &PbchConfig, ssb_grid: &[Complex32]) -> Result<DmrsDetection, PhyError> {
    let mut received = [Complex32::new(0.0, 0.0); PBCH_NOF_DMRS];
    cfg.re_map().demap_dmrs(ssb_grid, &mut received)?;

    let mut reference = [Complex32::new(0.0, 0.0); PBCH_NOF_DMRS];
    let mut i_ssb = 0;
    let mut measurement = DmrsMeasurement::default();
    for hypothesis in 0..PBCH_DMRS_NOF_HYPOTHESES {
        generate_i_ssb(cfg.n_id(), hypothesis, &mut reference);
        let meas = DmrsMeasurement::from_correlation(&received, &reference);
        debug!("PBCH DMRS i_ssb={} rsrp={:.4}", hypothesis, meas.rsrp);
        if hypothesis == 0 || meas.rsrp > measurement.rsrp {
            i_ssb = hypothesis;
            measurement = meas;
        }
    }

    let (ssb_idx, hrf) = match cfg.l_max() {
        Lmax::L4 => (i_ssb & 0b11, Some(i_ssb >= 4)),
        Lmax::L8 | Lmax::L64 => (i_ssb, None),
    };

    debug!(
        "PBCH DMRS detected i_ssb={} epre={:.3} rsrp={:.3} snr={:.1}dB",
        i_ssb, measurement.epre, measurement.rsrp, measurement.snr_db
    );

    Ok(DmrsDetection {
        ssb_idx,
        hrf,
        measurement,
    })
}
