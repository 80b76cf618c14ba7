//! Photon Mapping Based GI Cache

use accelerators::PointBVH;
use pbrt_core::geometry::*;
use pbrt_core::parallel::*;
use pbrt_core::pbrt::*;
use pbrt_core::spectrum::*;
use pbrt_core::stat_inc;
use std::thread;
use std::time::Instant;

mod common;
mod config;
mod scene;
mod trace;

// Re-export
pub use common::*;
pub use config::*;
pub use scene::*;
pub use trace::TracedPhotons;

/// A precomputed irradiance field. Photons are traced from the lights once
/// by `preprocess()`, turned into radiance photons and queried read-only by
/// `get_radiance()` from any number of threads.
pub struct PhotonGICache {
    /// The scene.
    scene: ArcPhotonScene,

    /// Number of photons to trace.
    photon_count: usize,

    /// Maximum photon path depth.
    max_path_depth: usize,

    /// Lookup and density estimation radius.
    entry_radius: Float,

    /// Lookup method.
    lookup: PhotonGILookup,

    /// Include the direct pool in lookups.
    direct_enabled: bool,

    /// Number of tracing threads; 0 uses the available parallelism.
    threads: usize,

    /// Current state.
    state: PhotonGICacheState,

    /// Radiance photon BVH per pool. `None` for pools without radiance photons.
    radiance_photons: [Option<PointBVH<RadiancePhoton>>; 3],
}

impl PhotonGICache {
    /// Create a new photon GI cache with interpolated lookups.
    ///
    /// * `scene`          - The scene.
    /// * `photon_count`   - Number of photons to trace.
    /// * `max_path_depth` - Maximum photon path depth.
    /// * `entry_radius`   - Lookup and density estimation radius.
    pub fn new(scene: ArcPhotonScene, photon_count: usize, max_path_depth: usize, entry_radius: Float) -> Self {
        register_stats();

        Self {
            scene,
            photon_count,
            max_path_depth,
            entry_radius,
            lookup: PhotonGILookup::Interpolated,
            direct_enabled: false,
            threads: 0,
            state: PhotonGICacheState::Constructed,
            radiance_photons: [None, None, None],
        }
    }

    /// Create a photon GI cache from configuration. Returns `None` when the
    /// photon count is 0 which disables the cache.
    ///
    /// * `scene`  - The scene.
    /// * `config` - Configuration.
    pub fn from_config(scene: ArcPhotonScene, config: &PhotonGICacheConfig) -> Result<Option<Self>, String> {
        if config.photon_count == 0 {
            return Ok(None);
        }
        if config.entry_radius <= 0.0 || !config.entry_radius.is_finite() {
            return Err(format!("Photon GI entry radius must be positive: {}", config.entry_radius));
        }
        if config.max_path_depth == 0 {
            return Err(String::from("Photon GI maximum path depth must be at least 1"));
        }

        let mut cache = Self::new(
            scene,
            config.photon_count,
            config.max_path_depth,
            config.entry_radius,
        );
        cache.lookup = config.lookup;
        cache.direct_enabled = config.direct_enabled;
        cache.threads = config.threads;
        Ok(Some(cache))
    }

    /// Returns the current state.
    pub fn state(&self) -> PhotonGICacheState {
        self.state
    }

    /// Returns the number of photons traced by `preprocess()`.
    pub fn photon_count(&self) -> usize {
        self.photon_count
    }

    /// Returns the maximum photon path depth.
    pub fn max_path_depth(&self) -> usize {
        self.max_path_depth
    }

    /// Returns the lookup and density estimation radius.
    pub fn entry_radius(&self) -> Float {
        self.entry_radius
    }

    /// Returns the lookup method.
    pub fn lookup(&self) -> PhotonGILookup {
        self.lookup
    }

    /// Returns true if lookups include the direct pool.
    pub fn is_direct_enabled(&self) -> bool {
        self.direct_enabled
    }

    /// Returns the number of radiance photons in a pool.
    ///
    /// * `pool` - The pool.
    pub fn radiance_photon_count(&self, pool: PhotonPool) -> usize {
        self.radiance_photons[pool.index()].as_ref().map_or(0, |bvh| bvh.len())
    }

    /// Trace the photons and build the radiance photon BVHs. Can only be
    /// called once. Cancellation leaves the cache in the constructed state
    /// and returns an error.
    ///
    /// * `cancel` - Cancellation token checked per photon and per bounce.
    /// * `pause`  - Pause token blocking the tracing threads.
    pub fn preprocess(&mut self, cancel: &CancelToken, pause: &PauseToken) -> Result<(), String> {
        if self.state != PhotonGICacheState::Constructed {
            return Err(format!("PhotonGICache::preprocess(): invalid state {:?}", self.state));
        }
        self.state = PhotonGICacheState::Preprocessing;

        let start = Instant::now();
        let n_threads = if self.threads > 0 {
            self.threads
        } else {
            thread::available_parallelism().map_or(1, |n| n.get())
        };

        let traced = if self.scene.light_count() == 0 {
            warn!("Photon GI cache: the scene has no lights");
            TracedPhotons::default()
        } else {
            info!(
                "Photon GI cache: tracing {} photons with {} threads",
                self.photon_count, n_threads
            );
            trace::trace_photons(
                self.scene.as_ref(),
                self.photon_count,
                self.max_path_depth,
                n_threads,
                cancel,
                pause,
            )
        };

        if cancel.is_cancelled() {
            self.state = PhotonGICacheState::Constructed;
            return Err(String::from("PhotonGICache::preprocess(): cancelled"));
        }

        let TracedPhotons {
            photons, candidates, ..
        } = traced;
        for ((pool, photons), candidates) in PhotonPool::ALL.into_iter().zip(photons).zip(candidates) {
            info!(
                "Photon GI cache: {} {} photons, {} radiance photon candidates",
                photons.len(),
                pool,
                candidates.len()
            );
            self.radiance_photons[pool.index()] = self.build_radiance_photons(photons, &candidates);
        }

        self.state = PhotonGICacheState::Ready;
        info!(
            "Photon GI cache ready in {:.2}s",
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Density-estimate the radiance photon candidates of one pool and build
    /// the BVH over the results.
    ///
    /// * `photons`    - Photons of the pool.
    /// * `candidates` - Radiance photon candidates of the pool.
    fn build_radiance_photons(
        &self,
        photons: Vec<Photon>,
        candidates: &[RadiancePhotonCandidate],
    ) -> Option<PointBVH<RadiancePhoton>> {
        if photons.is_empty() || candidates.is_empty() {
            return None;
        }

        let photons_bvh = PointBVH::new(photons, self.entry_radius, MAX_ENTRIES_PER_LEAF);
        let r2 = self.entry_radius * self.entry_radius;
        let scale = 1.0 / (self.photon_count as Float * r2);

        let radiance_photons: Vec<RadiancePhoton> = candidates
            .iter()
            .map(|candidate| {
                let near =
                    photons_bvh.get_all_near_entries(&candidate.p, self.entry_radius, |photon| {
                        photon.n.dot(&candidate.n) > NORMAL_COMPATIBILITY
                    });

                let mut irradiance = Spectrum::black();
                for photon in near {
                    irradiance += photon.alpha * simpson_kernel(photon.p.distance_squared(&candidate.p), r2);
                }

                RadiancePhoton {
                    p: candidate.p,
                    n: candidate.n,
                    outgoing_radiance: irradiance * scale * candidate.albedo * INV_PI,
                }
            })
            .collect();
        stat_inc!(RADIANCE_PHOTONS, radiance_photons.len() as i64);

        Some(PointBVH::new(radiance_photons, self.entry_radius, MAX_ENTRIES_PER_LEAF))
    }

    /// Returns the cached outgoing radiance at a shading point. Black for
    /// delta BSDFs or before `preprocess()` completes.
    ///
    /// * `bsdf` - The shading point.
    pub fn get_radiance(&self, bsdf: &dyn ShadingPoint) -> Spectrum {
        if self.state != PhotonGICacheState::Ready || bsdf.is_delta() {
            return Spectrum::black();
        }

        let p = bsdf.position();
        let n = bsdf.normal();
        let mut result = Spectrum::black();
        for pool in PhotonPool::ALL {
            if pool == PhotonPool::Direct && !self.direct_enabled {
                continue;
            }
            if let Some(bvh) = self.radiance_photons[pool.index()].as_ref() {
                result += match self.lookup {
                    PhotonGILookup::Interpolated => self.interpolated_radiance(bvh, &p, &n),
                    PhotonGILookup::Nearest => self.nearest_radiance(bvh, &p, &n),
                };
            }
        }
        result
    }

    /// Returns the radiance of the nearest compatible radiance photon.
    fn nearest_radiance(&self, bvh: &PointBVH<RadiancePhoton>, p: &Point3f, n: &Normal3f) -> Spectrum {
        bvh.get_nearest_entry(p, self.entry_radius, |rp| rp.n.dot(n) > NORMAL_COMPATIBILITY)
            .map_or_else(Spectrum::black, |rp| rp.outgoing_radiance)
    }

    /// Returns the kernel weighted average of the compatible radiance photons
    /// in range, or the nearest one when all weights vanish.
    fn interpolated_radiance(&self, bvh: &PointBVH<RadiancePhoton>, p: &Point3f, n: &Normal3f) -> Spectrum {
        let r2 = self.entry_radius * self.entry_radius;
        let mut sum = Spectrum::black();
        let mut weight_sum = 0.0;
        for rp in bvh.get_all_near_entries(p, self.entry_radius, |rp| rp.n.dot(n) > NORMAL_COMPATIBILITY) {
            let w = simpson_kernel(rp.p.distance_squared(p), r2);
            sum += rp.outgoing_radiance * w;
            weight_sum += w;
        }

        if weight_sum > 0.0 {
            sum / weight_sum
        } else {
            self.nearest_radiance(bvh, p, n)
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pbrt_core::paramset::ParamSet;
    use pbrt_core::sampling::*;
    use float_cmp::*;
    use std::sync::Arc;

    const HALF_SIZE: Float = 1.0;
    const LIGHT_HEIGHT: Float = 0.5;
    const FLOOR_ALBEDO: Float = 0.5;

    /// A diffuse floor at z = 0, an optional mirror ceiling at z = 1, both
    /// squares of side 2 centered on the z axis, and an isotropic point
    /// light of power 4 PI at z = 0.5.
    struct Room {
        mirror: bool,
    }

    impl Room {
        fn plane_hit(origin: &Point3f, direction: &Vector3f, z: Float) -> Option<(Float, Point3f)> {
            if direction.z == 0.0 {
                return None;
            }
            let t = (z - origin.z) / direction.z;
            if t <= 1e-4 {
                return None;
            }
            let p = *origin + *direction * t;
            if abs(p.x) <= HALF_SIZE && abs(p.y) <= HALF_SIZE {
                Some((t, Point3f::new(p.x, p.y, z)))
            } else {
                None
            }
        }
    }

    impl PhotonScene for Room {
        fn light_count(&self) -> usize {
            1
        }

        fn sample_light_emission(&self, _u_light: Float, _u0: &Point2f, u1: &Point2f) -> Option<LightEmission> {
            Some(LightEmission {
                origin: Point3f::new(0.0, 0.0, LIGHT_HEIGHT),
                direction: uniform_sample_sphere(u1),
                // Unit intensity divided by the direction pdf.
                flux: Spectrum::new(1.0 / uniform_sphere_pdf()),
            })
        }

        fn intersect(&self, origin: &Point3f, direction: &Vector3f) -> Option<PhotonHit> {
            let floor = Self::plane_hit(origin, direction, 0.0).map(|(t, p)| {
                (
                    t,
                    PhotonHit {
                        p,
                        n: Normal3f::new(0.0, 0.0, 1.0),
                        albedo: Spectrum::new(FLOOR_ALBEDO),
                        is_delta: false,
                    },
                )
            });
            let ceiling = if self.mirror {
                Self::plane_hit(origin, direction, 1.0).map(|(t, p)| {
                    (
                        t,
                        PhotonHit {
                            p,
                            n: Normal3f::new(0.0, 0.0, -1.0),
                            albedo: Spectrum::black(),
                            is_delta: true,
                        },
                    )
                })
            } else {
                None
            };

            match (floor, ceiling) {
                (Some(f), Some(c)) => Some(if f.0 < c.0 { f.1 } else { c.1 }),
                (Some(f), None) => Some(f.1),
                (None, Some(c)) => Some(c.1),
                (None, None) => None,
            }
        }

        fn sample_bsdf(&self, hit: &PhotonHit, wo: &Vector3f, u: &Point2f) -> Option<BSDFSample> {
            if hit.is_delta {
                let wi = Vector3f::new(-wo.x, -wo.y, wo.z);
                Some(BSDFSample {
                    wi,
                    f: Spectrum::new(1.0 / abs(wi.z)),
                    pdf: 1.0,
                })
            } else {
                let wi = cosine_sample_hemisphere(u);
                Some(BSDFSample {
                    wi,
                    f: hit.albedo * INV_PI,
                    pdf: cosine_hemisphere_pdf(wi.z),
                })
            }
        }
    }

    struct Point {
        p: Point3f,
        n: Normal3f,
        delta: bool,
    }

    impl ShadingPoint for Point {
        fn position(&self) -> Point3f {
            self.p
        }

        fn normal(&self) -> Normal3f {
            self.n
        }

        fn is_delta(&self) -> bool {
            self.delta
        }
    }

    fn floor_center() -> Point {
        Point {
            p: Point3f::zero(),
            n: Normal3f::new(0.0, 0.0, 1.0),
            delta: false,
        }
    }

    fn config(photon_count: Int, direct: bool) -> PhotonGICacheConfig {
        let mut ps = ParamSet::new();
        ps.add_int("photongi.photon.count", &[photon_count]);
        ps.add_float("photongi.entry.radius", &[0.1]);
        ps.add_bool("photongi.direct.enabled", &[direct]);
        ps.add_int("photongi.threads", &[2]);
        PhotonGICacheConfig::from(&ps)
    }

    #[test]
    fn zero_photons_disables_the_cache() {
        let scene: ArcPhotonScene = Arc::new(Room { mirror: false });
        let cache = PhotonGICache::from_config(scene, &config(0, true)).unwrap();
        assert!(cache.is_none());
    }

    #[test]
    fn invalid_configuration() {
        let scene: ArcPhotonScene = Arc::new(Room { mirror: false });
        let mut cfg = config(10, true);
        cfg.entry_radius = 0.0;
        assert!(PhotonGICache::from_config(Arc::clone(&scene), &cfg).is_err());

        let mut cfg = config(10, true);
        cfg.max_path_depth = 0;
        assert!(PhotonGICache::from_config(scene, &cfg).is_err());
    }

    #[test]
    fn direct_radiance_matches_point_light() {
        let scene: ArcPhotonScene = Arc::new(Room { mirror: false });
        let mut cache = PhotonGICache::from_config(scene, &config(40000, true)).unwrap().unwrap();
        assert_eq!(cache.state(), PhotonGICacheState::Constructed);
        assert_eq!(cache.get_radiance(&floor_center()), Spectrum::black());

        cache.preprocess(&CancelToken::new(), &PauseToken::new()).unwrap();
        assert_eq!(cache.state(), PhotonGICacheState::Ready);
        assert_eq!(cache.photon_count(), 40000);
        assert!(cache.radiance_photon_count(PhotonPool::Direct) > 0);
        assert_eq!(cache.radiance_photon_count(PhotonPool::Indirect), 0);
        assert_eq!(cache.radiance_photon_count(PhotonPool::Caustic), 0);

        // E = power / (4 PI h^2) below the light, L = E * albedo / PI.
        let expected = 1.0 / (LIGHT_HEIGHT * LIGHT_HEIGHT) * FLOOR_ALBEDO * INV_PI;
        let l = cache.get_radiance(&floor_center());
        assert!(approx_eq!(Float, l[0], expected, epsilon = 0.25 * expected), "{l} vs {expected}");

        // No lookup on delta surfaces or from the back side.
        let mut p = floor_center();
        p.delta = true;
        assert_eq!(cache.get_radiance(&p), Spectrum::black());
        p.delta = false;
        p.n = Normal3f::new(0.0, 0.0, -1.0);
        assert_eq!(cache.get_radiance(&p), Spectrum::black());

        // Second call is an error.
        assert!(cache.preprocess(&CancelToken::new(), &PauseToken::new()).is_err());
    }

    #[test]
    fn mirror_ceiling_creates_caustics() {
        let scene: ArcPhotonScene = Arc::new(Room { mirror: true });
        let mut cfg = config(40000, false);
        cfg.entry_radius = 0.2;
        let mut cache = PhotonGICache::from_config(scene, &cfg).unwrap().unwrap();
        cache.preprocess(&CancelToken::new(), &PauseToken::new()).unwrap();
        assert!(cache.radiance_photon_count(PhotonPool::Caustic) > 0);
        assert!(cache.radiance_photon_count(PhotonPool::Indirect) > 0);

        // Direct light is excluded; the caustic alone is the virtual light
        // mirrored at z = 1.5.
        let caustic_only = 1.0 / (1.5 * 1.5) * FLOOR_ALBEDO * INV_PI;
        let l = cache.get_radiance(&floor_center());
        assert!(l[0] > 0.75 * caustic_only, "{l} vs {caustic_only}");
    }

    #[test]
    fn nearest_lookup() {
        let scene: ArcPhotonScene = Arc::new(Room { mirror: false });
        let mut cfg = config(20000, true);
        cfg.lookup = PhotonGILookup::Nearest;
        let mut cache = PhotonGICache::from_config(scene, &cfg).unwrap().unwrap();
        cache.preprocess(&CancelToken::new(), &PauseToken::new()).unwrap();

        let l = cache.get_radiance(&floor_center());
        assert!(!l.is_black());

        // Outside the floor nothing is in range.
        let mut p = floor_center();
        p.p = Point3f::new(5.0, 5.0, 0.0);
        assert_eq!(cache.get_radiance(&p), Spectrum::black());
    }

    #[test]
    fn cancelled_preprocess() {
        let scene: ArcPhotonScene = Arc::new(Room { mirror: false });
        let mut cache = PhotonGICache::new(scene, 1000, 4, 0.1);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(cache.preprocess(&cancel, &PauseToken::new()).is_err());
        assert_eq!(cache.state(), PhotonGICacheState::Constructed);
    }
}
