//! 5G NR Physical Broadcast Channel Library
//!
//! This crate implements the PBCH transmit and receive chains according to
//! 3GPP TS 38.211 and TS 38.212, together with the coding primitives they use.

pub mod phy;

use thiserror::Error;

/// Errors reported by the PHY processing chains
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("{0} not initialized")]
    NotInitialized(&'static str),

    #[error("CRC check failed (checksum={checksum:06x})")]
    CrcMismatch { checksum: u32 },
}

impl From<common::TypeError> for PhyError {
    fn from(err: common::TypeError) -> Self {
        PhyError::InvalidInput(err.to_string())
    }
}
