//! Sample Result

use super::{FilmChannels, RadianceChannelScale};
use crate::geometry::*;
use crate::pbrt::*;
use crate::spectrum::*;

/// Value of one sample field routed into a channel buffer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SampleValue {
    Scalar(Float),
    Pair([Float; 2]),
    Triple([Float; 3]),
    Id(u32),
}

/// The per path sample output of an integrator. `channels` records which
/// fields are populated.
#[derive(Clone, Debug)]
pub struct SampleResult {
    /// Sub-pixel film x-coordinate.
    pub film_x: Float,

    /// Sub-pixel film y-coordinate.
    pub film_y: Float,

    /// Pixel x-coordinate.
    pub pixel_x: usize,

    /// Pixel y-coordinate.
    pub pixel_y: usize,

    /// Populated fields.
    channels: FilmChannels,

    /// Radiance per radiance group.
    pub radiance: Vec<Spectrum>,

    pub alpha: Float,
    pub depth: Float,
    pub position: Point3f,
    pub geometry_normal: Normal3f,
    pub shading_normal: Normal3f,
    pub material_id: u32,
    pub object_id: u32,
    pub uv: Point2f,
    pub ray_count: Float,
    pub albedo: Spectrum,
    pub direct_diffuse: Spectrum,
    pub direct_glossy: Spectrum,
    pub emission: Spectrum,
    pub indirect_diffuse: Spectrum,
    pub indirect_glossy: Spectrum,
    pub indirect_specular: Spectrum,
    pub direct_shadow_mask: Float,
    pub indirect_shadow_mask: Float,
    pub irradiance: Spectrum,
}

impl SampleResult {
    /// Create a new `SampleResult` with black radiance for each group.
    ///
    /// * `channels`             - Populated fields.
    /// * `radiance_group_count` - Number of radiance groups.
    pub fn new(channels: FilmChannels, radiance_group_count: usize) -> Self {
        Self {
            film_x: 0.0,
            film_y: 0.0,
            pixel_x: 0,
            pixel_y: 0,
            channels,
            radiance: vec![Spectrum::black(); radiance_group_count],
            alpha: 1.0,
            depth: INFINITY,
            position: Point3f::default(),
            geometry_normal: Normal3f::default(),
            shading_normal: Normal3f::default(),
            material_id: u32::MAX,
            object_id: u32::MAX,
            uv: Point2f::default(),
            ray_count: 0.0,
            albedo: Spectrum::black(),
            direct_diffuse: Spectrum::black(),
            direct_glossy: Spectrum::black(),
            emission: Spectrum::black(),
            indirect_diffuse: Spectrum::black(),
            indirect_glossy: Spectrum::black(),
            indirect_specular: Spectrum::black(),
            direct_shadow_mask: 0.0,
            indirect_shadow_mask: 0.0,
            irradiance: Spectrum::black(),
        }
    }

    /// Sets the film position and derives the pixel coordinates.
    ///
    /// * `film_x` - Sub-pixel film x-coordinate.
    /// * `film_y` - Sub-pixel film y-coordinate.
    pub fn set_film_position(&mut self, film_x: Float, film_y: Float) {
        self.film_x = film_x;
        self.film_y = film_y;
        self.pixel_x = film_x.max(0.0) as usize;
        self.pixel_y = film_y.max(0.0) as usize;
    }

    /// Returns the populated fields.
    pub fn channels(&self) -> FilmChannels {
        self.channels
    }

    /// Returns true if all fields in `kind` are populated.
    ///
    /// * `kind` - Channel kinds.
    pub fn has_channel(&self, kind: FilmChannels) -> bool {
        self.channels.contains(kind)
    }

    /// Returns the sum of the radiance groups, each scaled by its channel
    /// scale when one is given. Disabled groups are skipped.
    ///
    /// * `scales` - Optional radiance channel scales.
    pub fn get_spectrum(&self, scales: Option<&[RadianceChannelScale]>) -> Spectrum {
        let mut c = Spectrum::black();
        for (i, r) in self.radiance.iter().enumerate() {
            match scales.and_then(|s| s.get(i)) {
                Some(scale) if !scale.enabled => {}
                Some(scale) => c += scale.scale(r),
                None => c += *r,
            }
        }
        c
    }

    /// Clamps every radiance group component to `[min, max]`.
    ///
    /// * `min` - Lower bound.
    /// * `max` - Upper bound.
    pub fn clamp_radiance(&mut self, min: Float, max: Float) {
        for r in self.radiance.iter_mut() {
            *r = r.clamp(min, max);
        }
    }

    /// Returns true if no radiance group has a NaN, infinite or negative
    /// component and the alpha is finite.
    pub fn is_valid(&self) -> bool {
        self.radiance
            .iter()
            .all(|r| !r.is_nan_or_inf() && r.min_component_value() >= 0.0)
            && self.alpha.is_finite()
    }

    /// Returns the value routed into a single value channel kind.
    ///
    /// * `kind` - A single channel kind.
    pub fn value(&self, kind: FilmChannels) -> Option<SampleValue> {
        let v = match kind {
            FilmChannels::ALPHA => SampleValue::Scalar(self.alpha),
            FilmChannels::DEPTH => SampleValue::Scalar(self.depth),
            FilmChannels::POSITION => SampleValue::Triple([self.position.x, self.position.y, self.position.z]),
            FilmChannels::GEOMETRY_NORMAL => SampleValue::Triple(normal_components(&self.geometry_normal)),
            FilmChannels::SHADING_NORMAL | FilmChannels::AVG_SHADING_NORMAL => {
                SampleValue::Triple(normal_components(&self.shading_normal))
            }
            FilmChannels::MATERIAL_ID => SampleValue::Id(self.material_id),
            FilmChannels::OBJECT_ID => SampleValue::Id(self.object_id),
            FilmChannels::DIRECT_DIFFUSE => SampleValue::Triple(self.direct_diffuse.to_rgb()),
            FilmChannels::DIRECT_GLOSSY => SampleValue::Triple(self.direct_glossy.to_rgb()),
            FilmChannels::EMISSION => SampleValue::Triple(self.emission.to_rgb()),
            FilmChannels::INDIRECT_DIFFUSE => SampleValue::Triple(self.indirect_diffuse.to_rgb()),
            FilmChannels::INDIRECT_GLOSSY => SampleValue::Triple(self.indirect_glossy.to_rgb()),
            FilmChannels::INDIRECT_SPECULAR => SampleValue::Triple(self.indirect_specular.to_rgb()),
            FilmChannels::DIRECT_SHADOW_MASK => SampleValue::Scalar(self.direct_shadow_mask),
            FilmChannels::INDIRECT_SHADOW_MASK => SampleValue::Scalar(self.indirect_shadow_mask),
            FilmChannels::UV => SampleValue::Pair(self.uv.into()),
            FilmChannels::RAYCOUNT => SampleValue::Scalar(self.ray_count),
            FilmChannels::IRRADIANCE => SampleValue::Triple(self.irradiance.to_rgb()),
            FilmChannels::ALBEDO => SampleValue::Triple(self.albedo.to_rgb()),
            FilmChannels::MATERIAL_ID_COLOR => SampleValue::Triple(material_id_color(self.material_id)),
            _ => return None,
        };
        Some(v)
    }

    /// Returns the sum of the finite radiance groups among the first `groups`.
    ///
    /// * `groups` - Number of groups the film accumulates.
    pub fn merged_finite_radiance(&self, groups: usize) -> Spectrum {
        self.radiance
            .iter()
            .take(groups)
            .filter(|r| !r.is_nan_or_inf())
            .fold(Spectrum::black(), |acc, r| acc + *r)
    }
}

/// Unpacks the low 24 bits of a material ID into an RGB pseudo colour.
///
/// * `id` - Material ID.
pub fn material_id_color(id: u32) -> [Float; 3] {
    [
        (id & 0xff) as Float / 255.0,
        ((id >> 8) & 0xff) as Float / 255.0,
        ((id >> 16) & 0xff) as Float / 255.0,
    ]
}

fn normal_components(n: &Normal3f) -> [Float; 3] {
    [n.x, n.y, n.z]
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
