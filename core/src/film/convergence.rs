//! Film Convergence Test

use super::{Film, FilmChannels};
use crate::pbrt::*;

/// Statistical convergence test run on the output of image pipeline 0.
/// Each test compares the current image to the one of the previous test
/// and counts the pixels that still change more than the threshold.
#[derive(Clone, Debug)]
pub struct FilmConvTest {
    /// Maximum per pixel change of a converged pixel.
    threshold: Float,

    /// Average samples per pixel before the first test.
    warmup: u32,

    /// Average samples per pixel between tests.
    test_step: u32,

    /// Blur the per pixel error with a 3x3 box filter.
    use_filter: bool,

    /// Image of the previous test.
    reference: Option<Vec<[Float; 3]>>,

    /// Total sample count at the previous test.
    last_sample_count: f64,

    /// Result of the previous test.
    todo_pixel_count: usize,
}

impl FilmConvTest {
    /// Create a new `FilmConvTest`.
    ///
    /// * `threshold`  - Maximum per pixel change of a converged pixel.
    /// * `warmup`     - Average samples per pixel before the first test.
    /// * `test_step`  - Average samples per pixel between tests.
    /// * `use_filter` - Blur the per pixel error with a 3x3 box filter.
    pub fn new(threshold: Float, warmup: u32, test_step: u32, use_filter: bool) -> Self {
        Self {
            threshold,
            warmup,
            test_step,
            use_filter,
            reference: None,
            last_sample_count: 0.0,
            todo_pixel_count: usize::MAX,
        }
    }

    /// Returns the threshold.
    pub fn threshold(&self) -> Float {
        self.threshold
    }

    /// Drops the reference image so the next test starts over.
    pub fn reset(&mut self) {
        self.reference = None;
        self.last_sample_count = 0.0;
        self.todo_pixel_count = usize::MAX;
    }

    /// Runs the test and returns the number of pixels not yet converged. The
    /// caller executes image pipeline 0 beforehand.
    ///
    /// * `film` - The film.
    pub fn test(&mut self, film: &Film) -> usize {
        let pixel_count = film.get_pixel_count();
        let total = film.get_total_sample_count();
        let spp = total / pixel_count as f64;

        if self.todo_pixel_count == usize::MAX {
            self.todo_pixel_count = pixel_count;
        }

        if spp <= self.warmup as f64 {
            return self.todo_pixel_count;
        }
        if self.reference.is_some() && total - self.last_sample_count < self.test_step as f64 * pixel_count as f64 {
            return self.todo_pixel_count;
        }
        self.last_sample_count = total;

        let current = match film.channel_buffer(FilmChannels::IMAGEPIPELINE, 0) {
            Ok(b) => {
                let b = b.as_float();
                (0..pixel_count).map(|i| b.get_pixel_by_index::<3>(i)).collect::<Vec<_>>()
            }
            Err(e) => {
                warn!("Convergence test skipped: {e}");
                return self.todo_pixel_count;
            }
        };

        let reference = match self.reference.take() {
            Some(r) => r,
            None => {
                debug!("Convergence test reference image captured at {spp:.2} spp");
                self.reference = Some(current);
                return self.todo_pixel_count;
            }
        };

        let mut error: Vec<Float> = current
            .iter()
            .zip(reference.iter())
            .map(|(c, r)| (0..3).fold(0.0, |e: Float, i| max(e, abs(c[i] - r[i]))))
            .collect();
        if self.use_filter {
            error = box_filter_3x3(&error, film.get_width(), film.get_height());
        }

        let conv = film
            .channel_buffer(FilmChannels::CONVERGENCE, 0)
            .ok()
            .map(|b| b.as_float());
        let width = film.get_width();
        let mut todo = 0;
        let mut max_error: Float = 0.0;
        for (i, e) in error.iter().enumerate() {
            let converged = *e <= self.threshold;
            if !converged {
                todo += 1;
            }
            max_error = max(max_error, *e);
            if let Some(c) = conv {
                c.set_pixel(i % width, i / width, [if converged { 0.0 } else { *e }]);
            }
        }

        self.reference = Some(current);

        debug!(
            "Convergence test: {todo} of {pixel_count} pixels above threshold {} (max error {max_error})",
            self.threshold
        );
        self.todo_pixel_count = todo;
        todo
    }
}

/// Averages each value with its neighbours in a 3x3 window clipped to the image.
///
/// * `v`      - Values in row major order.
/// * `width`  - Image width.
/// * `height` - Image height.
fn box_filter_3x3(v: &[Float], width: usize, height: usize) -> Vec<Float> {
    let mut out = vec![0.0; v.len()];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            let mut n = 0;
            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    sum += v[nx + ny * width];
                    n += 1;
                }
            }
            out[x + y * width] = sum / n as Float;
        }
    }
    out
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::{ImagePipeline, SampleResult};
    use crate::spectrum::*;
    use float_cmp::approx_eq;

    fn film_with_pipeline() -> Film {
        let mut film = Film::new(2, 2, None).unwrap();
        film.add_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, None).unwrap();
        film.add_channel(FilmChannels::CONVERGENCE, None).unwrap();
        film.set_image_pipelines(vec![ImagePipeline::new()]).unwrap();
        film.init().unwrap();
        film
    }

    fn splat(film: &Film, v: Float) {
        let mut sr = SampleResult::new(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 1);
        sr.radiance[0] = Spectrum::new(v);
        for y in 0..2 {
            for x in 0..2 {
                film.add_sample(x, y, &sr, 1.0);
            }
        }
        film.add_sample_count(4.0);
    }

    #[test]
    fn box_filter_averages_clipped_window() {
        let v = [9.0, 0.0, 0.0, 0.0];
        let f = box_filter_3x3(&v, 2, 2);
        assert!(f.iter().all(|x| approx_eq!(Float, *x, 2.25)));
    }

    #[test]
    fn warmup_step_and_threshold() {
        let film = film_with_pipeline();
        let mut t = FilmConvTest::new(0.01, 2, 2, false);

        // Still warming up.
        splat(&film, 1.0);
        film.execute_image_pipeline(0).unwrap();
        assert_eq!(t.test(&film), 4);

        // First real test captures the reference.
        splat(&film, 1.0);
        splat(&film, 1.0);
        film.execute_image_pipeline(0).unwrap();
        assert_eq!(t.test(&film), 4);
        assert!(t.reference.is_some());

        // Less than a test step later the previous result is returned.
        splat(&film, 1.0);
        film.execute_image_pipeline(0).unwrap();
        assert_eq!(t.test(&film), 4);

        // Unchanged image: every pixel converged.
        splat(&film, 1.0);
        film.execute_image_pipeline(0).unwrap();
        assert_eq!(t.test(&film), 0);
        let conv = film.channel_buffer(FilmChannels::CONVERGENCE, 0).unwrap().as_float();
        assert_eq!(conv.get_pixel::<1>(1, 1), [0.0]);

        // The image changed a lot: nothing converged.
        splat(&film, 5.0);
        splat(&film, 5.0);
        film.execute_image_pipeline(0).unwrap();
        assert_eq!(t.test(&film), 4);
        assert!(conv.get_pixel::<1>(0, 0)[0] > 0.01);

        t.reset();
        assert!(t.reference.is_none());
    }
}
