//! Physical Layer (PHY) Submodules
//!
//! This module contains the 5G NR broadcast channel chain and the coding
//! primitives it is built from, according to 3GPP TS 38.211 and TS 38.212.

pub mod crc;
pub mod dmrs;
pub mod mib;
pub mod modem;
pub mod pbch;
pub mod pbch_msg;
pub mod polar;
pub mod sequence;
pub mod ssb;

// Re-export commonly used types
pub use crc::{Crc, CrcKind};
pub use dmrs::{DmrsDetection, DmrsMeasurement};
pub use mib::{DmrsTypeAPosition, Mib};
pub use pbch::{PbchArgs, PbchCodec, PbchConfig};
pub use pbch_msg::PbchMessage;
pub use polar::{PolarCode, PolarDecoder};
pub use sequence::GoldSequence;
pub use ssb::{SsbReMap, SSB_NOF_RE};
