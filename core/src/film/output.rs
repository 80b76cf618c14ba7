//! Film Output

use super::{Film, FilmChannels, RadianceChannelScale};
use crate::pbrt::*;
use crate::spectrum::*;
use crossbeam_channel::{bounded, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A background image pipeline execution.
pub(super) struct AsyncPipelineJob {
    /// Receives the execution result.
    result: Receiver<Result<(), String>>,

    /// The worker thread.
    handle: JoinHandle<()>,
}

impl Film {
    /// Returns the merged radiance of a pixel: per pixel normalized radiance
    /// divided by its weight plus per screen normalized radiance scaled by
    /// `pixel_count / total_sample_count`. Each radiance group is scaled by
    /// its channel scale and skipped when disabled.
    ///
    /// * `channels` - Radiance channel kinds to merge.
    /// * `scales`   - Optional radiance channel scales.
    /// * `index`    - Pixel index `x + y * width`.
    pub fn get_pixel_from_merged_sample_buffers(
        &self,
        channels: FilmChannels,
        scales: Option<&[RadianceChannelScale]>,
        index: usize,
    ) -> [Float; 3] {
        let scaled = |group: usize, c: Spectrum| -> Option<Spectrum> {
            match scales.and_then(|s| s.get(group)) {
                Some(s) if !s.enabled => None,
                Some(s) => Some(s.scale(&c)),
                None => Some(c),
            }
        };

        let mut c = Spectrum::black();

        if channels.contains(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED) {
            for (i, b) in self
                .channel_buffers(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED)
                .iter()
                .enumerate()
            {
                let p = b.as_float().get_pixel_by_index::<4>(index);
                if p[3] > 0.0 {
                    let w = 1.0 / p[3];
                    if let Some(s) = scaled(i, Spectrum::from_rgb(p[0] * w, p[1] * w, p[2] * w)) {
                        c += s;
                    }
                }
            }
        }

        if channels.contains(FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED) {
            let total = self.get_total_sample_count();
            let factor = if total > 0.0 {
                (self.get_pixel_count() as f64 / total) as Float
            } else {
                0.0
            };
            for (i, b) in self
                .channel_buffers(FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED)
                .iter()
                .enumerate()
            {
                let p = b.as_float().get_pixel_by_index::<3>(index);
                if let Some(s) = scaled(i, Spectrum::from(p) * factor) {
                    c += s;
                }
            }
        }

        c.to_rgb()
    }

    /// Returns true if any radiance group received a contribution at a pixel.
    ///
    /// * `per_pixel`  - Look at the per pixel normalized radiance.
    /// * `per_screen` - Look at the per screen normalized radiance.
    /// * `index`      - Pixel index `x + y * width`.
    pub fn has_samples(&self, per_pixel: bool, per_screen: bool, index: usize) -> bool {
        let pp = per_pixel
            && self
                .channel_buffers(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED)
                .iter()
                .any(|b| b.as_float().get_pixel_by_index::<4>(index)[3] > 0.0);
        let ps = per_screen
            && self
                .channel_buffers(FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED)
                .iter()
                .any(|b| b.as_float().get_pixel_by_index::<3>(index).iter().any(|v| *v != 0.0));
        pp || ps
    }

    /// Merges the radiance buffers into an IMAGEPIPELINE buffer and applies
    /// the pipeline's plugins. Executions are serialized.
    ///
    /// * `index` - Image pipeline index.
    pub fn execute_image_pipeline(&self, index: usize) -> Result<(), String> {
        let ip = self.image_pipelines.get(index).ok_or_else(|| {
            format!(
                "execute_image_pipeline(): index {index} out of range, {} image pipelines",
                self.image_pipelines.len()
            )
        })?;
        let _lock = self.pipeline_lock.lock().unwrap_or_else(|e| e.into_inner());

        let out = self.channel_buffer(FilmChannels::IMAGEPIPELINE, index)?.as_float();
        let per_pixel = self.has_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED);
        let per_screen = self.has_channel(FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED);
        let scales = Some(ip.radiance_channel_scales.as_slice());

        for i in 0..self.get_pixel_count() {
            let c = if self.has_samples(per_pixel, per_screen, i) {
                self.get_pixel_from_merged_sample_buffers(
                    FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED | FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED,
                    scales,
                    i,
                )
            } else {
                [0.0; 3]
            };
            out.set_pixel(i % self.width, i / self.width, c);
        }

        ip.apply(self, index)
    }

    /// Starts executing an image pipeline on a background thread. Only one
    /// execution can be in flight per film.
    ///
    /// * `index` - Image pipeline index.
    pub fn async_execute_image_pipeline(self: &Arc<Self>, index: usize) -> Result<(), String> {
        let mut job = self.async_job.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(j) = job.as_ref() {
            if !j.handle.is_finished() {
                return Err(String::from(
                    "async_execute_image_pipeline(): an image pipeline execution is already running",
                ));
            }
        }
        if let Some(j) = job.take() {
            if j.handle.join().is_err() {
                warn!("Previous asynchronous image pipeline execution panicked");
            }
        }

        let (tx, rx) = bounded(1);
        let film = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(format!("image-pipeline-{index}"))
            .spawn(move || {
                let r = film.execute_image_pipeline(index);
                if let Err(e) = r.as_ref() {
                    error!("Image pipeline {index}: {e}");
                }
                // The receiver is gone if the film was dropped.
                let _ = tx.send(r);
            })
            .map_err(|e| format!("async_execute_image_pipeline(): {e}"))?;

        *job = Some(AsyncPipelineJob { result: rx, handle });
        Ok(())
    }

    /// Waits for the asynchronous image pipeline execution and returns its
    /// result. Returns `Ok(())` when nothing is running.
    pub fn wait_async_execute_image_pipeline(&self) -> Result<(), String> {
        let job = self.async_job.lock().unwrap_or_else(|e| e.into_inner()).take();
        match job {
            Some(AsyncPipelineJob { result, handle }) => {
                handle
                    .join()
                    .map_err(|_| String::from("image pipeline execution panicked"))?;
                result
                    .recv()
                    .map_err(|e| format!("image pipeline execution result lost: {e}"))?
            }
            None => Ok(()),
        }
    }

    /// Returns true if no asynchronous image pipeline execution is running.
    pub fn has_done_async_execute_image_pipeline(&self) -> bool {
        self.async_job
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(true, |j| j.handle.is_finished())
    }

    /// Returns the average luminance of the pixels with samples in an
    /// IMAGEPIPELINE buffer.
    ///
    /// * `index` - Image pipeline index.
    pub fn get_film_y(&self, index: usize) -> Result<Float, String> {
        let (sum, n) = self.fold_image_pipeline(index, |c| Spectrum::from(c).y())?;
        Ok(if n > 0 { sum / n as Float } else { 0.0 })
    }

    /// Returns the largest component of the pixels with samples in an
    /// IMAGEPIPELINE buffer.
    ///
    /// * `index` - Image pipeline index.
    pub fn get_film_max_value(&self, index: usize) -> Result<Float, String> {
        let buffer = self.channel_buffer(FilmChannels::IMAGEPIPELINE, index)?.as_float();
        let per_pixel = self.has_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED);
        let per_screen = self.has_channel(FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED);
        Ok((0..self.get_pixel_count())
            .filter(|i| self.has_samples(per_pixel, per_screen, *i))
            .map(|i| {
                let c = buffer.get_pixel_by_index::<3>(i);
                max(c[0], max(c[1], c[2]))
            })
            .fold(0.0, Float::max))
    }

    /// Sums `f` over the pixels with samples in an IMAGEPIPELINE buffer.
    fn fold_image_pipeline<F>(&self, index: usize, f: F) -> Result<(Float, usize), String>
    where
        F: Fn([Float; 3]) -> Float,
    {
        let buffer = self.channel_buffer(FilmChannels::IMAGEPIPELINE, index)?.as_float();
        let per_pixel = self.has_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED);
        let per_screen = self.has_channel(FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED);
        Ok((0..self.get_pixel_count())
            .filter(|i| self.has_samples(per_pixel, per_screen, *i))
            .fold((0.0, 0), |(sum, n), i| (sum + f(buffer.get_pixel_by_index::<3>(i)), n + 1)))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
