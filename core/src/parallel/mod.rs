//! Parallel

mod atomic_float;
mod tokens;

// Re-export
pub use atomic_float::*;
pub use tokens::*;
