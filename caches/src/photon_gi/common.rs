//! Photon GI Common

use accelerators::BVHEntry;
use pbrt_core::geometry::*;
use pbrt_core::pbrt::*;
use pbrt_core::spectrum::*;
use pbrt_core::{stat_counter, stat_int_distribution, stat_register_fns};
use std::fmt;

stat_counter!("Photon GI/Photons traced", PHOTONS_TRACED, photon_gi_stats_traced);
stat_counter!("Photon GI/Direct photons", DIRECT_PHOTONS, photon_gi_stats_direct);
stat_counter!("Photon GI/Indirect photons", INDIRECT_PHOTONS, photon_gi_stats_indirect);
stat_counter!("Photon GI/Caustic photons", CAUSTIC_PHOTONS, photon_gi_stats_caustic);
stat_counter!("Photon GI/Radiance photons", RADIANCE_PHOTONS, photon_gi_stats_radiance);
stat_int_distribution!("Photon GI/Path length", PHOTON_PATH_LENGTH, photon_gi_stats_path_length);

stat_register_fns!(
    photon_gi_stats_traced,
    photon_gi_stats_direct,
    photon_gi_stats_indirect,
    photon_gi_stats_caustic,
    photon_gi_stats_radiance,
    photon_gi_stats_path_length,
);

/// Probability of a deposited photon proposing a radiance photon.
pub const RADIANCE_PHOTON_FRACTION: Float = 0.125;

/// Minimum cosine between the normals of a photon and a query point.
pub const NORMAL_COMPATIBILITY: Float = 0.5;

/// Maximum number of entries in a leaf node of the cache BVHs.
pub const MAX_ENTRIES_PER_LEAF: usize = 16;

/// A light-carrying particle deposited on a surface.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Photon {
    /// Landing position.
    pub p: Point3f,

    /// Incoming direction.
    pub d: Vector3f,

    /// Carried flux.
    pub alpha: Spectrum,

    /// Surface normal at the landing position.
    pub n: Normal3f,
}

impl BVHEntry for Photon {
    fn position(&self) -> Point3f {
        self.p
    }
}

/// Precomputed outgoing radiance at a surface point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RadiancePhoton {
    /// Position.
    pub p: Point3f,

    /// Surface normal.
    pub n: Normal3f,

    /// Outgoing radiance.
    pub outgoing_radiance: Spectrum,
}

impl BVHEntry for RadiancePhoton {
    fn position(&self) -> Point3f {
        self.p
    }
}

/// A surface point where a radiance photon will be density-estimated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RadiancePhotonCandidate {
    /// Position.
    pub p: Point3f,

    /// Surface normal.
    pub n: Normal3f,

    /// Diffuse reflectance at the point.
    pub albedo: Spectrum,
}

/// Photon pools, chosen by bounce classification.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PhotonPool {
    /// First bounce from a light.
    Direct = 0,

    /// Everything that is neither direct nor caustic.
    Indirect = 1,

    /// Diffuse hit reached only through specular bounces.
    Caustic = 2,
}

impl PhotonPool {
    /// All pools.
    pub const ALL: [PhotonPool; 3] = [PhotonPool::Direct, PhotonPool::Indirect, PhotonPool::Caustic];

    /// Classify a deposit. Caustics are light paths of specular bounces
    /// only ending on a diffuse surface; once a path has bounced off a
    /// diffuse surface every later deposit is indirect, also after a
    /// specular bounce.
    ///
    /// * `depth`           - Path depth of the hit; 0 is the first hit after leaving the light.
    /// * `specular_bounce` - The path bounced off a specular surface before.
    /// * `diffuse_bounce`  - The path bounced off a non-specular surface before.
    pub fn classify(depth: usize, specular_bounce: bool, diffuse_bounce: bool) -> Self {
        if depth == 0 {
            PhotonPool::Direct
        } else if specular_bounce && !diffuse_bounce {
            PhotonPool::Caustic
        } else {
            PhotonPool::Indirect
        }
    }

    /// Returns the pool index.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for PhotonPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotonPool::Direct => write!(f, "direct"),
            PhotonPool::Indirect => write!(f, "indirect"),
            PhotonPool::Caustic => write!(f, "caustic"),
        }
    }
}

/// Life cycle of a photon GI cache.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PhotonGICacheState {
    /// Created, photons not traced yet.
    Constructed,

    /// Tracing photons and building the BVHs.
    Preprocessing,

    /// Lookups are available.
    Ready,
}

/// Returns the 2-D Simpson kernel weight. It integrates to 1 over the disk of
/// radius `r` once divided by `r^2`.
///
/// * `dist2` - Squared distance.
/// * `r2`    - Squared radius.
#[inline]
pub fn simpson_kernel(dist2: Float, r2: Float) -> Float {
    let s = 1.0 - dist2 / r2;
    if s <= 0.0 {
        0.0
    } else {
        3.0 * INV_PI * s * s
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
