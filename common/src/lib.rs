//! Common Utilities and Types Library
//!
//! This crate provides shared cell-level types and bit utilities used by the PBCH codec.

pub mod types;
pub mod utils;

// Re-export commonly used items
pub use types::*;
pub use utils::*;
