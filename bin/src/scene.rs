//! Procedural scene: a top-down view of a checkered floor lit by a point
//! light, with a mirror ceiling casting a caustic.

use caches::*;
use pbrt_core::film::*;
use pbrt_core::geometry::*;
use pbrt_core::pbrt::*;
use pbrt_core::rng::RNG;
use pbrt_core::sampling::*;
use pbrt_core::spectrum::*;

/// Half the side of the square floor and ceiling.
const HALF_SIZE: Float = 1.0;

/// Height of the point light.
const LIGHT_HEIGHT: Float = 0.5;

/// Height of the mirror ceiling.
const CEILING_HEIGHT: Float = 1.0;

/// Light intensity.
const INTENSITY: Float = 1.0;

/// Height of the camera looking straight down.
const CAMERA_HEIGHT: Float = 3.0;

/// Probability of a sample turning into a firefly.
const FIREFLY_PROBABILITY: Float = 0.001;

/// Checkered floor albedos.
const ALBEDOS: [Float; 2] = [0.7, 0.3];

/// The floor, ceiling and light.
#[derive(Copy, Clone, Debug, Default)]
pub struct Room;

impl Room {
    /// Returns the checker cell material of a floor point.
    fn material(p: &Point3f) -> u32 {
        let cx = ((p.x + HALF_SIZE) * 4.0).floor() as i64;
        let cy = ((p.y + HALF_SIZE) * 4.0).floor() as i64;
        ((cx + cy) & 1) as u32
    }

    /// Returns the floor albedo at a point.
    fn albedo(p: &Point3f) -> Spectrum {
        Spectrum::new(ALBEDOS[Self::material(p) as usize])
    }

    /// Returns the ray parameter and hit point of a ray and a horizontal
    /// square at height `z`.
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

    /// Returns the direct radiance reflected towards the camera from a floor point.
    fn direct_radiance(p: &Point3f) -> Spectrum {
        let to_light = Point3f::new(0.0, 0.0, LIGHT_HEIGHT) - *p;
        let dist2 = to_light.length_squared();
        let cos_theta = to_light.z / dist2.sqrt();
        Self::albedo(p) * INV_PI * (INTENSITY * cos_theta / dist2)
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
            flux: Spectrum::new(INTENSITY / uniform_sphere_pdf()),
        })
    }

    fn intersect(&self, origin: &Point3f, direction: &Vector3f) -> Option<PhotonHit> {
        let floor = Self::plane_hit(origin, direction, 0.0);
        let ceiling = Self::plane_hit(origin, direction, CEILING_HEIGHT);
        let hit_floor = match (floor, ceiling) {
            (Some((tf, _)), Some((tc, _))) => tf < tc,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };

        if hit_floor {
            floor.map(|(_, p)| PhotonHit {
                p,
                n: Normal3f::new(0.0, 0.0, 1.0),
                albedo: Self::albedo(&p),
                is_delta: false,
            })
        } else {
            ceiling.map(|(_, p)| PhotonHit {
                p,
                n: Normal3f::new(0.0, 0.0, -1.0),
                albedo: Spectrum::black(),
                is_delta: true,
            })
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
            let pdf = cosine_hemisphere_pdf(wi.z);
            (pdf > 0.0).then(|| BSDFSample {
                wi,
                f: hit.albedo * INV_PI,
                pdf,
            })
        }
    }
}

/// A floor point queried for cached radiance.
struct FloorPoint(Point3f);

impl ShadingPoint for FloorPoint {
    fn position(&self) -> Point3f {
        self.0
    }

    fn normal(&self) -> Normal3f {
        Normal3f::new(0.0, 0.0, 1.0)
    }

    fn is_delta(&self) -> bool {
        false
    }
}

/// Generates sample results for film positions.
pub struct SampleGenerator<'a> {
    /// Film width.
    width: usize,

    /// Film height.
    height: usize,

    /// Channels populated in each sample.
    channels: FilmChannels,

    /// Number of radiance groups.
    groups: usize,

    /// Optional photon GI cache.
    cache: Option<&'a PhotonGICache>,
}

impl<'a> SampleGenerator<'a> {
    /// Create a new sample generator for a film.
    ///
    /// * `film`  - The film.
    /// * `cache` - Optional photon GI cache.
    pub fn new(film: &Film, cache: Option<&'a PhotonGICache>) -> Self {
        Self {
            width: film.get_width(),
            height: film.get_height(),
            channels: film.get_channels(),
            groups: film.get_radiance_group_count(),
            cache,
        }
    }

    /// Returns the sample at a film position.
    ///
    /// * `film_x` - Sub-pixel film x-coordinate.
    /// * `film_y` - Sub-pixel film y-coordinate.
    /// * `rng`    - Random number generator.
    pub fn sample(&self, film_x: Float, film_y: Float, rng: &mut RNG) -> SampleResult {
        let mut sr = SampleResult::new(self.channels, self.groups);
        sr.set_film_position(film_x, film_y);

        // Orthographic camera looking down onto the floor.
        let p = Point3f::new(
            2.0 * HALF_SIZE * (film_x / self.width as Float) - HALF_SIZE,
            HALF_SIZE - 2.0 * HALF_SIZE * (film_y / self.height as Float),
            0.0,
        );

        let mut direct = Room::direct_radiance(&p);
        if rng.uniform_float() < FIREFLY_PROBABILITY {
            direct *= 1000.0;
        }
        let indirect = self
            .cache
            .map_or_else(Spectrum::black, |cache| cache.get_radiance(&FloorPoint(p)));

        if self.groups > 1 {
            sr.radiance[0] = direct;
            sr.radiance[1] = indirect;
        } else {
            sr.radiance[0] = direct + indirect;
        }
        sr.alpha = 1.0;
        sr.depth = CAMERA_HEIGHT;
        sr.position = p;
        sr.shading_normal = Normal3f::new(0.0, 0.0, 1.0);
        sr.geometry_normal = sr.shading_normal;
        sr.material_id = Room::material(&p);
        sr.albedo = Room::albedo(&p);
        sr.ray_count = 1.0;
        sr
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
