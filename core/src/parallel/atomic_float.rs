//! AtomicFloat

use crate::pbrt::Float;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Implement atomic floating point value using `AtomicU32`.
pub struct AtomicFloat {
    /// Bit representation of floating point value.
    bits: AtomicU32,
}

impl AtomicFloat {
    /// Create a new `AtomicFloat`.
    ///
    /// * `v` - The value.
    pub fn new(v: Float) -> Self {
        Self {
            bits: AtomicU32::new(v.to_bits()),
        }
    }

    /// Add a floating point value.
    ///
    /// * `v` - The value to add.
    pub fn add(&self, v: Float) {
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::Relaxed, |old| {
                Some((Float::from_bits(old) + v).to_bits())
            });
    }

    /// Replaces the stored value with `v` if `v` is strictly smaller. Returns
    /// true if the value was replaced.
    ///
    /// * `v` - The candidate value.
    pub fn min(&self, v: Float) -> bool {
        self.bits
            .fetch_update(Ordering::SeqCst, Ordering::Relaxed, |old| {
                if v < Float::from_bits(old) {
                    Some(v.to_bits())
                } else {
                    None
                }
            })
            .is_ok()
    }

    /// Loads the floating point value.
    ///
    /// * `order` - Memory ordering of this operation
    pub fn load(&self, order: Ordering) -> Float {
        Float::from_bits(self.bits.load(order))
    }

    /// Stores the floating point value.
    ///
    /// * `v`     - The value.
    /// * `order` - Memory ordering of this operation
    pub fn store(&self, v: Float, order: Ordering) {
        self.bits.store(v.to_bits(), order);
    }
}

impl Default for AtomicFloat {
    /// Returns the "default value" for `AtomicFloat`.
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clone for AtomicFloat {
    fn clone(&self) -> Self {
        Self {
            bits: AtomicU32::new(self.bits.load(Ordering::SeqCst)),
        }
    }
}

/// Implement atomic double precision value using `AtomicU64`. Used for
/// counters that outgrow `Float` precision such as total sample counts.
pub struct AtomicDouble {
    /// Bit representation of the value.
    bits: AtomicU64,
}

impl AtomicDouble {
    /// Create a new `AtomicDouble`.
    ///
    /// * `v` - The value.
    pub fn new(v: f64) -> Self {
        Self {
            bits: AtomicU64::new(v.to_bits()),
        }
    }

    /// Add a value.
    ///
    /// * `v` - The value to add.
    pub fn add(&self, v: f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::Relaxed, |old| {
                Some((f64::from_bits(old) + v).to_bits())
            });
    }

    /// Loads the value.
    ///
    /// * `order` - Memory ordering of this operation
    pub fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.bits.load(order))
    }

    /// Stores the value.
    ///
    /// * `v`     - The value.
    /// * `order` - Memory ordering of this operation
    pub fn store(&self, v: f64, order: Ordering) {
        self.bits.store(v.to_bits(), order);
    }
}

impl Default for AtomicDouble {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clone for AtomicDouble {
    fn clone(&self) -> Self {
        Self {
            bits: AtomicU64::new(self.bits.load(Ordering::SeqCst)),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
