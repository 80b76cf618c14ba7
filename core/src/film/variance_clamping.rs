//! Variance Clamping

use super::{Film, FilmChannels, SampleResult};
use crate::pbrt::*;

/// Firefly suppression. A contribution is clamped to the running pixel
/// average plus or minus `sqrt_variance_clamp_max_value`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VarianceClamping {
    /// Square root of the maximum allowed variance; 0 disables clamping.
    pub sqrt_variance_clamp_max_value: Float,
}

impl VarianceClamping {
    /// Create a new `VarianceClamping`.
    ///
    /// * `sqrt_variance_clamp_max_value` - Square root of the maximum allowed variance.
    pub fn new(sqrt_variance_clamp_max_value: Float) -> Self {
        Self {
            sqrt_variance_clamp_max_value,
        }
    }

    /// Returns true if clamping is enabled.
    pub fn has_clamping(&self) -> bool {
        self.sqrt_variance_clamp_max_value > 0.0
    }

    /// Clamps a weighted pixel `[r * w, g * w, b * w, w]` against an expected
    /// weighted pixel of the same layout. Returns `value` unchanged when the
    /// expected pixel has no weight.
    ///
    /// * `expected` - Already accumulated pixel.
    /// * `value`    - Pixel to clamp.
    pub fn clamp(&self, expected: [Float; 4], value: [Float; 4]) -> [Float; 4] {
        if expected[3] <= 0.0 {
            return value;
        }
        let k = 1.0 / expected[3];
        let s = self.sqrt_variance_clamp_max_value;
        let mut out = value;
        for i in 0..3 {
            let e = expected[i] * k;
            let lo = max(e - s, 0.0);
            let hi = e + s;
            out[i] = clamp(value[i], lo * value[3], hi * value[3]);
        }
        out
    }

    /// Clamps every radiance group of a sample against the merged radiance
    /// of the sample's pixel.
    ///
    /// * `film` - The film holding the running average.
    /// * `sr`   - The sample to clamp.
    pub fn clamp_sample(&self, film: &Film, sr: &mut SampleResult) {
        let expected = film.get_pixel_from_merged_sample_buffers(
            FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED | FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED,
            None,
            sr.pixel_x + sr.pixel_y * film.get_width(),
        );
        let lo = expected.iter().cloned().fold(INFINITY, Float::min);
        let hi = expected.iter().cloned().fold(-INFINITY, Float::max);
        let s = self.sqrt_variance_clamp_max_value;
        sr.clamp_radiance(max(lo - s, 0.0), hi + s);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::*;
    use proptest::prelude::*;

    #[test]
    fn clamp_without_expected_weight_is_noop() {
        let vc = VarianceClamping::new(1.0);
        let v = [100.0, 0.0, 5.0, 1.0];
        assert_eq!(vc.clamp([0.0; 4], v), v);
    }

    #[test]
    fn clamp_bounds_to_average_plus_minus_sqrt_variance() {
        let vc = VarianceClamping::new(1.0);
        // Expected average (2, 0.5, 10) with weight 2.
        let expected = [4.0, 1.0, 20.0, 2.0];
        // Value average (10, 0, 10) with weight 0.5.
        let value = [5.0, 0.0, 5.0, 0.5];
        let c = vc.clamp(expected, value);
        assert_eq!(c, [1.5, 0.0, 5.0, 0.5]);
        assert!(vc.has_clamping());
        assert!(!VarianceClamping::default().has_clamping());
    }

    #[test]
    fn clamp_sample_uses_merged_pixel() {
        let mut film = Film::new(2, 1, None).unwrap();
        film.add_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, None).unwrap();
        film.init().unwrap();

        let mut sr = SampleResult::new(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 1);
        sr.radiance[0] = Spectrum::from_rgb(1.0, 2.0, 3.0);
        film.add_sample(1, 0, &sr, 1.0);

        sr.set_film_position(1.5, 0.5);
        sr.radiance[0] = Spectrum::from_rgb(0.0, 50.0, 3.0);
        VarianceClamping::new(0.5).clamp_sample(&film, &mut sr);
        assert_eq!(sr.radiance[0], Spectrum::from_rgb(0.5, 3.5, 3.0));
    }

    proptest! {
        #[test]
        fn clamped_average_stays_in_bounds(
            e in prop::array::uniform3(0.0f32..10.0),
            v in prop::array::uniform3(0.0f32..100.0),
            w in 0.1f32..4.0,
            s in 0.1f32..2.0,
        ) {
            let vc = VarianceClamping::new(s);
            let c = vc.clamp([e[0], e[1], e[2], 1.0], [v[0] * w, v[1] * w, v[2] * w, w]);
            prop_assert_eq!(c[3], w);
            for i in 0..3 {
                let avg = c[i] / w;
                prop_assert!(avg >= max(e[i] - s, 0.0) - 1e-3);
                prop_assert!(avg <= e[i] + s + 1e-3);
            }
        }
    }
}
