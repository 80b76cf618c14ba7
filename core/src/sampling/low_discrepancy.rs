//! Low Discrepancy Sequences

use crate::geometry::*;
use crate::pbrt::*;
use crate::rng::*;

/// Number of prime bases available for radical inverse dimensions.
pub const PRIME_TABLE_SIZE: usize = 64;

/// The first `PRIME_TABLE_SIZE` primes.
#[rustfmt::skip]
pub const PRIMES: [u64; PRIME_TABLE_SIZE] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53,
    59, 61, 67, 71, 73, 79, 83, 89, 97, 101, 103, 107, 109, 113, 127, 131,
    137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223,
    227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307, 311,
];

/// Returns the radical inverse of `a` in the prime base at `base_index`,
/// mirroring its digits around the decimal point.
///
/// * `base_index` - Index into `PRIMES`.
/// * `a`          - The value to invert.
pub fn radical_inverse(base_index: usize, a: u64) -> Float {
    assert!(base_index < PRIME_TABLE_SIZE, "radical inverse base out of range");

    let base = PRIMES[base_index];
    let inv_base = 1.0 / base as f64;
    let mut reversed_digits = 0_u64;
    let mut inv_base_n = 1.0_f64;
    let mut a = a;
    while a > 0 {
        let next = a / base;
        let digit = a - next * base;
        reversed_digits = reversed_digits.wrapping_mul(base).wrapping_add(digit);
        inv_base_n *= inv_base;
        a = next;
    }
    min((reversed_digits as f64 * inv_base_n) as Float, ONE_MINUS_EPSILON)
}

/// Generates the sample dimensions of one path from a Halton sequence. The
/// sequence index identifies the path; successive calls consume successive
/// dimensions. Dimensions beyond the prime table fall back to a PCG stream
/// seeded with the index.
pub struct HaltonSampleSequence {
    /// Global sample index.
    index: u64,

    /// Next dimension to generate.
    dimension: usize,

    /// Fallback for dimensions beyond the prime table.
    rng: RNG,
}

impl HaltonSampleSequence {
    /// Create a new sequence for a sample index.
    ///
    /// * `index` - Global sample index.
    pub fn new(index: u64) -> Self {
        Self {
            index,
            dimension: 0,
            rng: RNG::new(index),
        }
    }

    /// Returns the sample index.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Returns the next 1-D sample value in [0, 1).
    pub fn get_1d(&mut self) -> Float {
        let d = self.dimension;
        self.dimension += 1;
        if d < PRIME_TABLE_SIZE {
            // Index 0 maps every dimension to 0; shift by one.
            radical_inverse(d, self.index + 1)
        } else {
            self.rng.uniform_float()
        }
    }

    /// Returns the next 2-D sample value in [0, 1)^2.
    pub fn get_2d(&mut self) -> Point2f {
        let x = self.get_1d();
        let y = self.get_1d();
        Point2f::new(x, y)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
