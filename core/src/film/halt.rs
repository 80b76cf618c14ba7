//! Halt Conditions

use super::Film;
use crate::pbrt::*;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// Conditions ending a render. A value of 0 disables the time and samples
/// per pixel conditions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HaltConditions {
    /// Render time in seconds.
    pub halt_time: f64,

    /// Average samples per pixel over the sub-region.
    pub halt_spp: f64,

    /// Convergence test threshold; 0 disables the test unless the film has a
    /// CONVERGENCE channel.
    pub halt_threshold: Float,

    /// Convergence test warm-up in samples per pixel.
    pub halt_threshold_warmup: u32,

    /// Samples per pixel between convergence tests.
    pub halt_threshold_step: u32,

    /// Blur the convergence test error.
    pub halt_threshold_filter: bool,

    /// Whether the convergence test result ends the render.
    pub halt_threshold_stop_rendering: bool,
}

impl Default for HaltConditions {
    fn default() -> Self {
        Self {
            halt_time: 0.0,
            halt_spp: 0.0,
            halt_threshold: 0.0,
            halt_threshold_warmup: 64,
            halt_threshold_step: 64,
            halt_threshold_filter: true,
            halt_threshold_stop_rendering: true,
        }
    }
}

impl Film {
    /// Sets the halt conditions. The convergence test is configured at `init()`.
    ///
    /// * `halt` - The halt conditions.
    pub fn set_halt_conditions(&mut self, halt: HaltConditions) {
        self.halt = halt;
    }

    /// Returns the halt conditions.
    pub fn get_halt_conditions(&self) -> &HaltConditions {
        &self.halt
    }

    /// Returns true if a convergence test runs with the halt tests.
    pub fn has_convergence_test(&self) -> bool {
        self.conv_test.is_some()
    }

    /// Evaluates the halt conditions in order: render time, samples per
    /// pixel over the sub-region and the convergence test. The first
    /// condition met sets the convergence to 1. Does nothing once the
    /// convergence is 1.
    pub fn run_halt_tests(&self) {
        if self.get_convergence() == 1.0 {
            return;
        }

        if self.halt.halt_time > 0.0 && self.get_total_time() > self.halt.halt_time {
            info!("Halt condition: time 100%, rendering done");
            self.set_convergence(1.0);
            return;
        }

        let [x0, x1, y0, y1] = self.sub_region;
        let region_pixels = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
        let spp = self.get_total_sample_count() / region_pixels;
        if self.halt.halt_spp > 0.0 && spp > self.halt.halt_spp {
            info!("Halt condition: samples per pixel 100%, rendering done");
            self.set_convergence(1.0);
            return;
        }

        if let Some(conv_test) = self.conv_test.as_ref() {
            if let Err(e) = self.execute_image_pipeline(0) {
                warn!("Convergence test skipped: {e}");
                return;
            }

            let todo = conv_test.lock().unwrap_or_else(|e| e.into_inner()).test(self);
            let convergence = clamp(1.0 - todo as Float / self.get_pixel_count() as Float, 0.0, 1.0);
            self.reported_convergence.store(convergence, Ordering::SeqCst);
            if self.halt.halt_threshold_stop_rendering {
                self.set_convergence(convergence);
                if convergence == 1.0 {
                    info!("Halt condition: convergence 100%, rendering done");
                }
            } else {
                debug!("Convergence {:.2}%", convergence * 100.0);
            }
        }
    }

    /// Restarts the convergence test.
    pub fn reset_halt_tests(&self) {
        if let Some(conv_test) = self.conv_test.as_ref() {
            conv_test.lock().unwrap_or_else(|e| e.into_inner()).reset();
        }
    }

    /// Fills every buffer with its clear value and zeroes the total sample
    /// count. CONVERGENCE and the convergence value survive.
    pub fn clear(&self) {
        for (kind, buffers) in self.buffers.iter() {
            if let Some(fill) = kind.policy().clear_fill {
                buffers.iter().for_each(|b| b.clear(fill));
            }
        }
        self.total_sample_count.store(0.0, Ordering::SeqCst);
    }

    /// Clears the film, zeroes the convergence and restarts the timer. The
    /// convergence test is reset separately with `reset_halt_tests()`.
    pub fn reset(&self) {
        self.clear();
        self.set_convergence(0.0);
        self.restart_timer();
    }

    /// Sets the convergence.
    ///
    /// * `convergence` - Convergence in `[0, 1]`.
    pub fn set_convergence(&self, convergence: Float) {
        self.convergence.store(convergence, Ordering::SeqCst);
    }

    /// Returns the convergence; 1 means rendering is done.
    pub fn get_convergence(&self) -> Float {
        self.convergence.load(Ordering::SeqCst)
    }

    /// Returns the result of the last convergence test, also when the test
    /// does not stop rendering.
    pub fn get_reported_convergence(&self) -> Float {
        self.reported_convergence.load(Ordering::SeqCst)
    }

    /// Returns the seconds since sampling started.
    pub fn get_total_time(&self) -> f64 {
        self.start_time
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed()
            .as_secs_f64()
    }

    /// Returns the average number of samples per second since sampling started.
    pub fn get_avg_sample_sec(&self) -> f64 {
        let t = self.get_total_time();
        if t > 0.0 {
            self.get_total_sample_count() / t
        } else {
            0.0
        }
    }

    pub(super) fn restart_timer(&self) {
        *self.start_time.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::{FilmChannels, ImagePipeline, SampleResult};
    use crate::spectrum::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn halt_spp_over_sub_region() {
        let mut film = Film::new(4, 4, Some([1, 2, 1, 2])).unwrap();
        film.add_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, None).unwrap();
        film.set_halt_conditions(HaltConditions {
            halt_spp: 10.0,
            ..Default::default()
        });
        film.init().unwrap();
        assert!(!film.has_convergence_test());

        film.add_sample_count(40.0);
        film.run_halt_tests();
        assert_eq!(film.get_convergence(), 0.0);

        film.add_sample_count(1.0);
        film.run_halt_tests();
        assert_eq!(film.get_convergence(), 1.0);

        // Done stays done.
        film.clear();
        film.run_halt_tests();
        assert_eq!(film.get_convergence(), 1.0);
    }

    #[test]
    fn halt_time() {
        let mut film = Film::new(1, 1, None).unwrap();
        film.set_halt_conditions(HaltConditions {
            halt_time: 0.01,
            ..Default::default()
        });
        film.init().unwrap();
        thread::sleep(Duration::from_millis(30));
        film.run_halt_tests();
        assert_eq!(film.get_convergence(), 1.0);

        film.reset();
        assert_eq!(film.get_convergence(), 0.0);
        assert!(film.get_total_time() < 0.01);
    }

    #[test]
    fn clear_then_halt_test_does_not_converge() {
        let mut film = Film::new(2, 2, None).unwrap();
        film.add_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, None).unwrap();
        film.add_channel(FilmChannels::SAMPLECOUNT, None).unwrap();
        film.add_channel(FilmChannels::DEPTH, None).unwrap();
        film.set_halt_conditions(HaltConditions {
            halt_spp: 1.0,
            ..Default::default()
        });
        film.init().unwrap();

        let mut sr = SampleResult::new(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED | FilmChannels::DEPTH, 1);
        sr.radiance[0] = Spectrum::new(1.0);
        sr.depth = 2.0;
        film.add_sample(0, 0, &sr, 1.0);
        film.add_sample_count(3.0);

        film.clear();
        assert_eq!(film.get_total_sample_count(), 0.0);
        let rad = film.channel_buffer(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 0).unwrap().as_float();
        assert_eq!(rad.get_pixel::<4>(0, 0), [0.0; 4]);
        let n = film.channel_buffer(FilmChannels::SAMPLECOUNT, 0).unwrap().as_uint();
        assert_eq!(n.get_pixel::<1>(0, 0), [0]);
        let d = film.channel_buffer(FilmChannels::DEPTH, 0).unwrap().as_float();
        assert!(d.get_pixel::<1>(0, 0)[0].is_infinite());

        film.run_halt_tests();
        assert_eq!(film.get_convergence(), 0.0);
    }

    #[test]
    fn default_halt_never_converges() {
        let mut film = Film::new(2, 2, None).unwrap();
        film.add_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, None).unwrap();
        film.set_image_pipelines(vec![ImagePipeline::new()]).unwrap();
        film.init().unwrap();
        assert!(!film.has_convergence_test());

        let mut sr = SampleResult::new(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 1);
        sr.radiance[0] = Spectrum::new(1.0);
        for _ in 0..200 {
            for y in 0..2 {
                for x in 0..2 {
                    film.add_sample(x, y, &sr, 1.0);
                }
            }
            film.add_sample_count(4.0);
            film.run_halt_tests();
        }
        assert_eq!(film.get_convergence(), 0.0);
        assert_eq!(film.get_reported_convergence(), 0.0);
    }

    #[test]
    fn convergence_test_drives_convergence() {
        let mut film = Film::new(2, 2, None).unwrap();
        film.add_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, None).unwrap();
        film.set_image_pipelines(vec![ImagePipeline::new()]).unwrap();
        film.set_halt_conditions(HaltConditions {
            halt_threshold: 0.01,
            halt_threshold_warmup: 1,
            halt_threshold_step: 1,
            halt_threshold_filter: false,
            ..Default::default()
        });
        film.init().unwrap();
        assert!(film.has_convergence_test());

        let mut sr = SampleResult::new(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 1);
        sr.radiance[0] = Spectrum::new(1.0);
        let pass = |film: &Film| {
            for y in 0..2 {
                for x in 0..2 {
                    film.add_sample(x, y, &sr, 1.0);
                }
            }
            film.add_sample_count(4.0);
            film.run_halt_tests();
        };

        // Warm-up, then the reference capture.
        pass(&film);
        pass(&film);
        assert_eq!(film.get_convergence(), 0.0);

        // Unchanged image: converged.
        pass(&film);
        assert_eq!(film.get_convergence(), 1.0);
        assert_eq!(film.get_reported_convergence(), 1.0);
    }

    #[test]
    fn convergence_reported_without_stopping() {
        let mut film = Film::new(1, 1, None).unwrap();
        film.add_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, None).unwrap();
        film.add_channel(FilmChannels::CONVERGENCE, None).unwrap();
        film.set_image_pipelines(vec![ImagePipeline::new()]).unwrap();
        film.set_halt_conditions(HaltConditions {
            halt_threshold: 0.02,
            halt_threshold_warmup: 0,
            halt_threshold_step: 0,
            halt_threshold_stop_rendering: false,
            ..Default::default()
        });
        film.init().unwrap();

        let mut sr = SampleResult::new(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 1);
        sr.radiance[0] = Spectrum::new(0.5);
        for _ in 0..2 {
            film.add_sample(0, 0, &sr, 1.0);
            film.add_sample_count(1.0);
            film.run_halt_tests();
        }
        assert_eq!(film.get_reported_convergence(), 1.0);
        assert_eq!(film.get_convergence(), 0.0);

        // CONVERGENCE survives a clear.
        film.clear();
        let c = film.channel_buffer(FilmChannels::CONVERGENCE, 0).unwrap().as_float();
        assert_eq!(c.get_pixel::<1>(0, 0), [0.0]);
        film.reset_halt_tests();
    }
}
