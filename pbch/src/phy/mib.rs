//! Master Information Block
//!
//! Typed view of the 24-bit BCCH-BCH payload carried by the PBCH (3GPP TS 38.331)

use crate::PhyError;
use common::types::{Lmax, SubcarrierSpacing};
use common::utils::{read_bits, write_bits};
use serde::{Deserialize, Serialize};

/// BCCH-BCH payload size in bits
pub const MIB_PAYLOAD_SIZE: usize = 24;

/// DMRS position for PDSCH mapping type A
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DmrsTypeAPosition {
    Pos2,
    Pos3,
}

/// MIB (Master Information Block) structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mib {
    /// 6 most significant bits of the system frame number
    pub sfn_6msb: u8,
    /// Subcarrier spacing for SIB1 and common messages
    pub subcarrier_spacing_common: SubcarrierSpacing,
    /// 4 least significant bits of k_SSB
    pub ssb_subcarrier_offset: u8,
    /// DMRS position for PDSCH
    pub dmrs_type_a_position: DmrsTypeAPosition,
    /// PDCCH config SIB1 (CORESET#0 index << 4 | SearchSpace#0 index)
    pub pdcch_config_sib1: u8,
    /// Cell barred
    pub cell_barred: bool,
    /// Intra frequency reselection allowed when barred
    pub intra_freq_reselection: bool,
    /// Spare bit
    pub spare: u8,
}

impl Default for Mib {
    fn default() -> Self {
        Self {
            sfn_6msb: 0,
            subcarrier_spacing_common: SubcarrierSpacing::Scs15,
            ssb_subcarrier_offset: 0,
            dmrs_type_a_position: DmrsTypeAPosition::Pos2,
            // CORESET#0 index 6, SearchSpace#0 index 0
            pdcch_config_sib1: 0x60,
            cell_barred: false,
            intra_freq_reselection: true,
            spare: 0,
        }
    }
}

impl Mib {
    /// Encode to the 24-bit PBCH payload, one bit per element
    pub fn to_payload(&self) -> [u8; MIB_PAYLOAD_SIZE] {
        let mut bits = [0u8; MIB_PAYLOAD_SIZE];

        // CHOICE in BCCH-BCH-MessageType, 0 selects mib
        bits[0] = 0;
        write_bits(&mut bits[1..], self.sfn_6msb as u32, 6);
        bits[7] = match self.subcarrier_spacing_common {
            SubcarrierSpacing::Scs15 | SubcarrierSpacing::Scs60 => 0,
            SubcarrierSpacing::Scs30 | SubcarrierSpacing::Scs120 => 1,
        };
        write_bits(&mut bits[8..], self.ssb_subcarrier_offset as u32, 4);
        bits[12] = match self.dmrs_type_a_position {
            DmrsTypeAPosition::Pos2 => 0,
            DmrsTypeAPosition::Pos3 => 1,
        };
        write_bits(&mut bits[13..], self.pdcch_config_sib1 as u32, 8);
        // ENUMERATED {barred, notBarred}
        bits[21] = if self.cell_barred { 0 } else { 1 };
        // ENUMERATED {allowed, notAllowed}
        bits[22] = if self.intra_freq_reselection { 0 } else { 1 };
        bits[23] = self.spare & 1;

        bits
    }

    /// Decode from the 24-bit PBCH payload
    ///
    /// The subcarrier spacing bit reads as 15/30 kHz below 6 GHz and as
    /// 60/120 kHz when L_max = 64.
    pub fn from_payload(bits: &[u8], l_max: Lmax) -> Result<Self, PhyError> {
        if bits.len() != MIB_PAYLOAD_SIZE {
            return Err(PhyError::InvalidInput(format!(
                "MIB must be {} bits, got {}",
                MIB_PAYLOAD_SIZE,
                bits.len()
            )));
        }
        if bits[0] != 0 {
            return Err(PhyError::InvalidInput(
                "BCCH-BCH message is not a MIB".to_string(),
            ));
        }

        let subcarrier_spacing_common = match (bits[7] & 1, l_max) {
            (0, Lmax::L64) => SubcarrierSpacing::Scs60,
            (_, Lmax::L64) => SubcarrierSpacing::Scs120,
            (0, _) => SubcarrierSpacing::Scs15,
            (_, _) => SubcarrierSpacing::Scs30,
        };

        Ok(Self {
            sfn_6msb: read_bits(&bits[1..7]) as u8,
            subcarrier_spacing_common,
            ssb_subcarrier_offset: read_bits(&bits[8..12]) as u8,
            dmrs_type_a_position: if bits[12] & 1 == 0 {
                DmrsTypeAPosition::Pos2
            } else {
                DmrsTypeAPosition::Pos3
            },
            pdcch_config_sib1: read_bits(&bits[13..21]) as u8,
            cell_barred: bits[21] & 1 == 0,
            intra_freq_reselection: bits[22] & 1 == 0,
            spare: bits[23] & 1,
        })
    }
}
