//! Sampling

mod common;
mod low_discrepancy;

// Re-export
pub use common::*;
pub use low_discrepancy::*;
