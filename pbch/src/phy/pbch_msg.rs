//! PBCH Message
//!
//! Per-occasion PBCH content and its payload generation according to
//! 3GPP TS 38.212 Section 7.1.1

use crate::phy::mib::{Mib, MIB_PAYLOAD_SIZE};
use crate::PhyError;
use common::types::Lmax;
use common::utils::{bits_to_hex, read_bits};
use serde::{Deserialize, Serialize};
use std::fmt;

/// BCCH-BCH payload size (A-hat)
pub const PBCH_PAYLOAD_SIZE: usize = MIB_PAYLOAD_SIZE;
/// Generated PBCH payload size (A), the BCH payload plus 8 timing bits
pub const PBCH_A: usize = PBCH_PAYLOAD_SIZE + 8;

/// PBCH payload interleaver pattern G(j) (TS 38.212 Table 7.1.1-1)
pub const PBCH_INTERLEAVER: [usize; PBCH_A] = [
    16, 23, 18, 17, 8, 30, 10, 6, 24, 7, 0, 5, 3, 2, 1, 4,
    9, 11, 12, 13, 14, 15, 19, 20, 21, 22, 25, 26, 27, 28, 29, 31,
];

/// Interleaver slots of the SFN low bits, MSB first
const SLOTS_SFN_4LSB: [usize; 4] = [0, 1, 2, 3];
/// First interleaver slot of payload bits 1..6
const SLOT_PAYLOAD_HEAD: usize = 4;
/// Interleaver slot of the half-frame flag
const SLOT_HRF: usize = 10;
/// Interleaver slots of SSB index bits 5..3, or k_SSB MSB and two reserved bits
const SLOTS_SSB: [usize; 3] = [11, 12, 13];
/// First interleaver slot of payload bit 0 and bits 7..23
const SLOT_PAYLOAD_TAIL: usize = 14;

/// PBCH message of one SS/PBCH block occasion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PbchMessage {
    /// 4 least significant bits of the system frame number
    pub sfn_4lsb: u8,
    /// Half radio frame flag
    pub hrf: bool,
    /// SS/PBCH block candidate index
    pub ssb_idx: u8,
    /// Most significant bit of k_SSB, only carried when L_max is 4 or 8
    pub k_ssb_msb: bool,
    /// BCCH-BCH payload, one bit per element
    pub payload: [u8; PBCH_PAYLOAD_SIZE],
}

impl PbchMessage {
    /// Build the message of one occasion from a MIB
    ///
    /// `sfn` is the full 10-bit frame number and `k_ssb` the 5-bit subcarrier
    /// offset; the fields of `mib` they overlap are overwritten.
    pub fn from_mib(mib: &Mib, sfn: u16, hrf: bool, ssb_idx: u8, k_ssb: u8) -> Self {
        let mib = Mib {
            sfn_6msb: ((sfn >> 4) & 0x3F) as u8,
            ssb_subcarrier_offset: k_ssb & 0xF,
            ..mib.clone()
        };

        Self {
            sfn_4lsb: (sfn & 0xF) as u8,
            hrf,
            ssb_idx,
            k_ssb_msb: (k_ssb >> 4) & 1 == 1,
            payload: mib.to_payload(),
        }
    }

    /// Interpret the payload as a MIB
    pub fn mib(&self, l_max: Lmax) -> Result<Mib, PhyError> {
        Mib::from_payload(&self.payload, l_max)
    }

    /// Full 10-bit system frame number
    pub fn full_sfn(&self) -> u16 {
        ((read_bits(&self.payload[1..7]) as u16) << 4) | (self.sfn_4lsb & 0xF) as u16
    }

    /// Full k_SSB (the MSB is zero when L_max = 64)
    pub fn k_ssb(&self) -> u8 {
        (read_bits(&self.payload[8..12]) as u8) | ((self.k_ssb_msb as u8) << 4)
    }

    /// Check field ranges against the cell configuration
    pub fn validate(&self, l_max: Lmax) -> Result<(), PhyError> {
        if self.sfn_4lsb > 0xF {
            return Err(PhyError::InvalidInput(format!(
                "sfn_4lsb {} exceeds 4 bits",
                self.sfn_4lsb
            )));
        }
        if self.ssb_idx >= 64 {
            return Err(PhyError::InvalidInput(format!(
                "SSB index {} exceeds 6 bits",
                self.ssb_idx
            )));
        }
        if let Some(i) = self.payload.iter().position(|&b| b > 1) {
            return Err(PhyError::InvalidInput(format!(
                "Payload bit {} is {}, expected 0 or 1",
                i, self.payload[i]
            )));
        }
        if l_max.carries_ssb_idx_msb() && self.k_ssb_msb {
            return Err(PhyError::InvalidInput(
                "k_SSB MSB is not carried when L_max is 64".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate the interleaved PBCH payload a (TS 38.212 7.1.1)
    pub fn pack(&self, l_max: Lmax) -> [u8; PBCH_A] {
        let g = &PBCH_INTERLEAVER;
        let mut a = [0u8; PBCH_A];

        for (i, &slot) in SLOTS_SFN_4LSB.iter().enumerate() {
            a[g[slot]] = (self.sfn_4lsb >> (3 - i)) & 1;
        }

        a[g[SLOT_HRF]] = self.hrf as u8;

        if l_max.carries_ssb_idx_msb() {
            // 6th, 5th and 4th bit of the SSB index
            for (i, &slot) in SLOTS_SSB.iter().enumerate() {
                a[g[slot]] = (self.ssb_idx >> (5 - i)) & 1;
            }
        } else {
            a[g[SLOTS_SSB[0]]] = self.k_ssb_msb as u8;
            a[g[SLOTS_SSB[1]]] = 0; // Reserved
            a[g[SLOTS_SSB[2]]] = 0; // Reserved
        }

        let mut j_head = SLOT_PAYLOAD_HEAD;
        let mut j_tail = SLOT_PAYLOAD_TAIL;
        for (i, &bit) in self.payload.iter().enumerate() {
            if (1..7).contains(&i) {
                a[g[j_head]] = bit;
                j_head += 1;
            } else {
                a[g[j_tail]] = bit;
                j_tail += 1;
            }
        }

        a
    }

    /// Recover the message from an interleaved PBCH payload
    ///
    /// `ssb_idx` supplies the SSB index bits not carried in the payload (all of
    /// them for L_max = 4 or 8, bits 2..0 for L_max = 64).
    pub fn unpack(l_max: Lmax, a: &[u8; PBCH_A], ssb_idx: u8) -> Self {
        let g = &PBCH_INTERLEAVER;

        let sfn_4lsb = SLOTS_SFN_4LSB
            .iter()
            .fold(0u8, |acc, &slot| (acc << 1) | (a[g[slot]] & 1));

        let hrf = a[g[SLOT_HRF]] & 1 == 1;

        let (ssb_idx, k_ssb_msb) = if l_max.carries_ssb_idx_msb() {
            let msb = SLOTS_SSB
                .iter()
                .fold(0u8, |acc, &slot| (acc << 1) | (a[g[slot]] & 1));
            ((msb << 3) | (ssb_idx & 0x7), false)
        } else {
            (ssb_idx, a[g[SLOTS_SSB[0]]] & 1 == 1)
        };

        let mut payload = [0u8; PBCH_PAYLOAD_SIZE];
        let mut j_head = SLOT_PAYLOAD_HEAD;
        let mut j_tail = SLOT_PAYLOAD_TAIL;
        for (i, bit) in payload.iter_mut().enumerate() {
            if (1..7).contains(&i) {
                *bit = a[g[j_head]] & 1;
                j_head += 1;
            } else {
                *bit = a[g[j_tail]] & 1;
                j_tail += 1;
            }
        }

        Self {
            sfn_4lsb,
            hrf,
            ssb_idx,
            k_ssb_msb,
            payload,
        }
    }
}

impl fmt::Display for PbchMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sfn_4lsb={} ssb_idx={} k_ssb_msb={} hrf={} payload={}",
            self.sfn_4lsb,
            self.ssb_idx,
            self.k_ssb_msb as u8,
            self.hrf as u8,
            bits_to_hex(&self.payload)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::mib::DmrsTypeAPosition;
    use common::types::SubcarrierSpacing;

    fn message(sfn_4lsb: u8, ssb_idx: u8) -> PbchMessage {
        PbchMessage {
            sfn_4lsb,
            hrf: false,
            ssb_idx,
            k_ssb_msb: false,
            payload: [0; PBCH_PAYLOAD_SIZE],
        }
    }

    #[test]
    fn test_interleaver_is_permutation() {
        let mut seen = [false; PBCH_A];
        for &g in PBCH_INTERLEAVER.iter() {
            assert!(!seen[g]);
            seen[g] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_pack_timing_bits_lmax_4() {
        let g = &PBCH_INTERLEAVER;
        let a = message(0b0101, 2).pack(Lmax::L4);

        assert_eq!([a[g[0]], a[g[1]], a[g[2]], a[g[3]]], [0, 1, 0, 1]);
        assert_eq!(a[g[10]], 0);
        assert_eq!(a[g[11]], 0);
        assert_eq!(a[g[12]], 0);
        assert_eq!(a[g[13]], 0);
        assert_eq!(a.iter().filter(|&&b| b == 1).count(), 2);
    }

    #[test]
    fn test_pack_k_ssb_msb_and_reserved_bits() {
        let g = &PBCH_INTERLEAVER;
        let mut msg = message(0, 63);
        msg.k_ssb_msb = true;
        msg.hrf = true;

        let a = msg.pack(Lmax::L8);
        assert_eq!(a[g[10]], 1);
        assert_eq!(a[g[11]], 1);
        // SSB index bits never reach the payload below FR2
        assert_eq!(a[g[12]], 0);
        assert_eq!(a[g[13]], 0);
    }

    #[test]
    fn test_pack_ssb_idx_msb_lmax_64() {
        let g = &PBCH_INTERLEAVER;
        let a = message(0, 0b101_011).pack(Lmax::L64);
        assert_eq!([a[g[11]], a[g[12]], a[g[13]]], [1, 0, 1]);
    }

    #[test]
    fn test_pack_payload_placement() {
        let g = &PBCH_INTERLEAVER;
        let mut msg = message(0, 0);
        for (i, bit) in msg.payload.iter_mut().enumerate() {
            *bit = (i % 2) as u8;
        }
        let a = msg.pack(Lmax::L4);

        // Payload bits 1..6 occupy slots 4..9
        for i in 1..7 {
            assert_eq!(a[g[i + 3]], msg.payload[i]);
        }
        // Payload bit 0 then bits 7..23 occupy slots 14..31
        assert_eq!(a[g[14]], msg.payload[0]);
        for i in 7..24 {
            assert_eq!(a[g[i + 8]], msg.payload[i]);
        }
    }

    #[test]
    fn test_unpack_inverts_pack() {
        let mut msg = message(0b1010, 3);
        msg.hrf = true;
        msg.k_ssb_msb = true;
        msg.payload[0] = 1;
        msg.payload[5] = 1;
        msg.payload[23] = 1;
        assert_eq!(PbchMessage::unpack(Lmax::L4, &msg.pack(Lmax::L4), 3), msg);

        msg.k_ssb_msb = false;
        msg.ssb_idx = 0b110_011;
        let a = msg.pack(Lmax::L64);
        assert_eq!(PbchMessage::unpack(Lmax::L64, &a, 0b011), msg);
    }

    #[test]
    fn test_unpack_all_ones() {
        let a = [1u8; PBCH_A];

        let msg = PbchMessage::unpack(Lmax::L8, &a, 6);
        assert_eq!(msg.sfn_4lsb, 0xF);
        assert!(msg.hrf);
        assert!(msg.k_ssb_msb);
        assert_eq!(msg.ssb_idx, 6);
        assert_eq!(msg.payload, [1u8; PBCH_PAYLOAD_SIZE]);

        // The payload carries SSB index bits 5..3, the hint only bits 2..0
        let msg = PbchMessage::unpack(Lmax::L64, &a, 0xFA);
        assert_eq!(msg.ssb_idx, 0b111_010);
        assert!(!msg.k_ssb_msb);
    }

    #[test]
    fn test_validate() {
        assert!(message(15, 63).validate(Lmax::L64).is_ok());
        assert!(message(16, 0).validate(Lmax::L4).is_err());
        assert!(message(0, 64).validate(Lmax::L8).is_err());

        let mut msg = message(0, 0);
        msg.payload[3] = 2;
        assert!(msg.validate(Lmax::L4).is_err());

        let mut msg = message(0, 0);
        msg.k_ssb_msb = true;
        assert!(msg.validate(Lmax::L8).is_ok());
        assert!(msg.validate(Lmax::L64).is_err());
    }

    #[test]
    fn test_from_mib() {
        let mib = Mib {
            subcarrier_spacing_common: SubcarrierSpacing::Scs30,
            dmrs_type_a_position: DmrsTypeAPosition::Pos3,
            ..Mib::default()
        };
        let msg = PbchMessage::from_mib(&mib, 1000, true, 1, 0b10110);

        assert_eq!(msg.sfn_4lsb, (1000 & 0xF) as u8);
        assert_eq!(msg.full_sfn(), 1000);
        assert_eq!(msg.k_ssb(), 0b10110);
        assert!(msg.k_ssb_msb);

        let decoded = msg.mib(Lmax::L8).unwrap();
        assert_eq!(decoded.sfn_6msb, (1000 >> 4) as u8);
        assert_eq!(decoded.ssb_subcarrier_offset, 0b0110);
        assert_eq!(decoded.subcarrier_spacing_common, SubcarrierSpacing::Scs30);
        assert_eq!(decoded.dmrs_type_a_position, DmrsTypeAPosition::Pos3);
    }

    #[test]
    fn test_display() {
        let mut msg = message(5, 2);
        msg.payload[0] = 1;
        assert_eq!(
            msg.to_string(),
            "sfn_4lsb=5 ssb_idx=2 k_ssb_msb=0 hrf=0 payload=800000"
        );
    }
}
