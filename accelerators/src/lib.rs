//! Spatial acceleration data structures.

#[macro_use]
extern crate log;

mod bvh;

// Re-export
pub use bvh::*;
