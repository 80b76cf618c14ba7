//! Statistics

mod accumulator;
mod macros;
mod registrar;

pub use accumulator::*;
pub use registrar::*;
