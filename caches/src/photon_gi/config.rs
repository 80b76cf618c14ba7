//! Photon GI Configuration

use pbrt_core::paramset::ParamSet;
use pbrt_core::pbrt::*;

/// How cached radiance is looked up at shading points.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PhotonGILookup {
    /// Kernel weighted average of the radiance photons in range.
    Interpolated,

    /// The nearest radiance photon in range.
    Nearest,
}

/// Photon GI cache settings read from a `ParamSet`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhotonGICacheConfig {
    /// Number of photons to trace. 0 disables the cache.
    pub photon_count: usize,

    /// Maximum photon path depth.
    pub max_path_depth: usize,

    /// Lookup and density estimation radius.
    pub entry_radius: Float,

    /// Lookup method.
    pub lookup: PhotonGILookup,

    /// Include the direct pool in lookups.
    pub direct_enabled: bool,

    /// Number of tracing threads. 0 uses the available parallelism.
    pub threads: usize,
}

impl Default for PhotonGICacheConfig {
    fn default() -> Self {
        Self {
            photon_count: 0,
            max_path_depth: 4,
            entry_radius: 0.15,
            lookup: PhotonGILookup::Interpolated,
            direct_enabled: false,
            threads: 0,
        }
    }
}

impl From<&ParamSet> for PhotonGICacheConfig {
    /// Create a `PhotonGICacheConfig` from a `ParamSet`.
    ///
    /// * `params` - Parameter set.
    fn from(params: &ParamSet) -> Self {
        let defaults = Self::default();

        let lookup_name = params.find_one_string("photongi.lookup", String::from("interpolated"));
        let lookup = match &lookup_name[..] {
            "interpolated" => PhotonGILookup::Interpolated,
            "nearest" => PhotonGILookup::Nearest,
            l => {
                warn!("Photon GI lookup '{}' unknown. Using 'interpolated'.", l);
                PhotonGILookup::Interpolated
            }
        };

        Self {
            photon_count: max(params.find_one_int("photongi.photon.count", 0), 0) as usize,
            max_path_depth: max(
                params.find_one_int("photongi.photon.maxdepth", defaults.max_path_depth as Int),
                0,
            ) as usize,
            entry_radius: params.find_one_float("photongi.entry.radius", defaults.entry_radius),
            lookup,
            direct_enabled: params.find_one_bool("photongi.direct.enabled", defaults.direct_enabled),
            threads: max(params.find_one_int("photongi.threads", 0), 0) as usize,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
