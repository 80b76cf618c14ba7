//! Scene collaborators driven by the photon GI cache.

use pbrt_core::geometry::*;
use pbrt_core::pbrt::*;
use pbrt_core::spectrum::*;
use std::sync::Arc;

/// A particle leaving a light source.
#[derive(Copy, Clone, Debug)]
pub struct LightEmission {
    /// Ray origin.
    pub origin: Point3f,

    /// Normalized ray direction.
    pub direction: Vector3f,

    /// Flux carried by the particle, already divided by the light selection
    /// and emission probabilities.
    pub flux: Spectrum,
}

/// A ray-surface intersection.
#[derive(Copy, Clone, Debug)]
pub struct PhotonHit {
    /// Hit point.
    pub p: Point3f,

    /// Shading normal facing the incoming ray.
    pub n: Normal3f,

    /// Diffuse reflectance at the hit point.
    pub albedo: Spectrum,

    /// The surface only scatters in discrete directions.
    pub is_delta: bool,
}

/// An outgoing direction sampled from the BSDF at a hit.
#[derive(Copy, Clone, Debug)]
pub struct BSDFSample {
    /// Sampled direction.
    pub wi: Vector3f,

    /// BSDF value for the sampled pair of directions.
    pub f: Spectrum,

    /// Probability density of the sampled direction.
    pub pdf: Float,
}

/// Light sampling, intersection and BSDF sampling for photon tracing. Ray
/// origins passed to `intersect()` are surface points; implementations skip
/// hits within a small epsilon of the origin.
pub trait PhotonScene {
    /// Returns the number of lights.
    fn light_count(&self) -> usize;

    /// Selects a light and emits a particle from it. Returns `None` when the
    /// emission carries no flux.
    ///
    /// * `u_light` - Sample used to select the light.
    /// * `u0`      - Sample for the position on the light.
    /// * `u1`      - Sample for the emitted direction.
    fn sample_light_emission(&self, u_light: Float, u0: &Point2f, u1: &Point2f) -> Option<LightEmission>;

    /// Returns the nearest surface hit along a ray.
    ///
    /// * `origin`    - Ray origin.
    /// * `direction` - Normalized ray direction.
    fn intersect(&self, origin: &Point3f, direction: &Vector3f) -> Option<PhotonHit>;

    /// Samples a scattered direction. Returns `None` when the surface absorbs
    /// the particle.
    ///
    /// * `hit` - The surface hit.
    /// * `wo`  - Direction towards the previous path vertex.
    /// * `u`   - Sample for the direction.
    fn sample_bsdf(&self, hit: &PhotonHit, wo: &Vector3f, u: &Point2f) -> Option<BSDFSample>;
}

/// Atomic reference counted `PhotonScene`.
pub type ArcPhotonScene = Arc<dyn PhotonScene + Send + Sync>;

/// A surface point queried for cached radiance.
pub trait ShadingPoint {
    /// Returns the position.
    fn position(&self) -> Point3f;

    /// Returns the shading normal.
    fn normal(&self) -> Normal3f;

    /// Returns true if the BSDF at the point is a delta distribution.
    fn is_delta(&self) -> bool;
}
