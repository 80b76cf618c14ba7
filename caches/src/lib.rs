//! Global illumination caches.

#[macro_use]
extern crate log;

mod photon_gi;

// Re-export
pub use photon_gi::*;
