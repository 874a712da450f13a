//! Common Types for 5G NR
//!
//! Defines the cell-level identifiers the broadcast channel is keyed by

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building common types from raw values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("Invalid PCI {0}, expected 0..=1007")]
    InvalidPci(u32),

    #[error("Invalid Lmax {0}, expected 4, 8 or 64")]
    InvalidLmax(u32),
}

/// Physical Cell Identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pci(pub u16);

impl Pci {
    /// Maximum valid PCI value (0-1007)
    pub const MAX: u16 = 1007;

    /// Create a new PCI with validation
    pub fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Get the PCI value
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u32> for Pci {
    type Error = TypeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .ok()
            .and_then(Pci::new)
            .ok_or(TypeError::InvalidPci(value))
    }
}

/// Maximum number of candidate SS/PBCH blocks in a half frame (L_max)
///
/// The variant carries the constants that depend on it, so callers never
/// re-derive them from the raw number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum Lmax {
    /// Up to 4 candidates (FR1, carrier at or below 3 GHz)
    L4 = 4,
    /// Up to 8 candidates (FR1)
    L8 = 8,
    /// Up to 64 candidates (FR2)
    L64 = 64,
}

impl Lmax {
    /// Build from the raw candidate count
    pub fn from_value(value: u32) -> Option<Self> {
        Self::from_u32(value)
    }

    /// Raw candidate count
    pub fn value(&self) -> u32 {
        *self as u32
    }

    /// Whether the PBCH payload carries SSB index bits 5..3 instead of k_SSB MSB
    pub fn carries_ssb_idx_msb(&self) -> bool {
        matches!(self, Lmax::L64)
    }

    /// Mask applied to the SSB index to select the PBCH scrambling offset
    /// (TS 38.211 7.3.3.1): 2 LSBs for L_max = 4, 3 LSBs otherwise
    pub fn ssb_idx_lsb_mask(&self) -> u8 {
        match self {
            Lmax::L4 => 0x3,
            Lmax::L8 | Lmax::L64 => 0x7,
        }
    }
}

impl TryFrom<u32> for Lmax {
    type Error = TypeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or(TypeError::InvalidLmax(value))
    }
}

impl From<Lmax> for u32 {
    fn from(l_max: Lmax) -> Self {
        l_max.value()
    }
}

/// Subcarrier spacing values in kHz
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive, Serialize, Deserialize)]
pub enum SubcarrierSpacing {
    /// 15 kHz
    Scs15 = 15,
    /// 30 kHz
    Scs30 = 30,
    /// 60 kHz
    Scs60 = 60,
    /// 120 kHz
    Scs120 = 120,
}

impl SubcarrierSpacing {
    /// Build from a value in kHz
    pub fn from_khz(khz: u32) -> Option<Self> {
        Self::from_u32(khz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pci_validation() {
        assert!(Pci::new(0).is_some());
        assert!(Pci::new(1007).is_some());
        assert!(Pci::new(1008).is_none());
        assert_eq!(Pci::try_from(70_000u32), Err(TypeError::InvalidPci(70_000)));
    }

    #[test]
    fn test_lmax_values() {
        assert_eq!(Lmax::from_value(4), Some(Lmax::L4));
        assert_eq!(Lmax::from_value(8), Some(Lmax::L8));
        assert_eq!(Lmax::from_value(64), Some(Lmax::L64));
        assert_eq!(Lmax::from_value(16), None);
        assert_eq!(Lmax::L64.value(), 64);
        assert!(Lmax::try_from(0u32).is_err());
    }

    #[test]
    fn test_lmax_derived_constants() {
        assert_eq!(Lmax::L4.ssb_idx_lsb_mask(), 0x3);
        assert_eq!(Lmax::L8.ssb_idx_lsb_mask(), 0x7);
        assert!(Lmax::L64.carries_ssb_idx_msb());
        assert!(!Lmax::L8.carries_ssb_idx_msb());
    }

    #[test]
    fn test_subcarrier_spacing_from_khz() {
        assert_eq!(SubcarrierSpacing::from_khz(30), Some(SubcarrierSpacing::Scs30));
        assert_eq!(SubcarrierSpacing::from_khz(240), None);
    }
}
