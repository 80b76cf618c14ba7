//! Accelerator Backend

use super::{Film, FilmChannels};
use crate::pbrt::*;
use std::sync::Arc;

/// Optional device capability a film can hand channel buffers to. Image
/// pipeline plugins that report `can_use_backend()` run through it; all
/// device buffer transfers and kernel dispatch stay behind this interface.
pub trait AcceleratorBackend: Send + Sync {
    /// Returns the backend name.
    fn name(&self) -> &str;

    /// Copies a channel buffer to device memory.
    ///
    /// * `kind`  - Channel kind.
    /// * `index` - Buffer index within the kind.
    /// * `data`  - Components in storage order.
    fn upload_channel(&self, kind: FilmChannels, index: usize, data: &[Float]) -> Result<(), String>;

    /// Copies a channel buffer from device memory.
    ///
    /// * `kind`  - Channel kind.
    /// * `index` - Buffer index within the kind.
    /// * `data`  - Receives the components in storage order.
    fn download_channel(&self, kind: FilmChannels, index: usize, data: &mut [Float]) -> Result<(), String>;

    /// Runs a compiled kernel.
    ///
    /// * `kernel` - Kernel name.
    /// * `width`  - Work width.
    /// * `height` - Work height.
    fn execute_kernel(&self, kernel: &str, width: usize, height: usize) -> Result<(), String>;

    /// Blocks until queued device work completes.
    fn synchronize(&self) -> Result<(), String>;
}

/// Shared handle to a backend.
pub type ArcAcceleratorBackend = Arc<Box<dyn AcceleratorBackend>>;

impl Film {
    /// Attaches or detaches the accelerator backend.
    ///
    /// * `backend` - The backend or `None`.
    pub fn set_backend(&self, backend: Option<Box<dyn AcceleratorBackend>>) {
        if let Some(b) = backend.as_ref() {
            info!("Film: using accelerator backend '{}'", b.name());
        }
        self.backend.store(backend.map(Arc::new));
    }

    /// Returns the accelerator backend if one is attached.
    pub fn backend(&self) -> Option<ArcAcceleratorBackend> {
        self.backend.load_full()
    }

    /// Uploads an IMAGEPIPELINE buffer to the backend.
    ///
    /// * `index`   - Image pipeline index.
    /// * `backend` - The backend.
    pub(crate) fn upload_image_pipeline(&self, index: usize, backend: &dyn AcceleratorBackend) -> Result<(), String> {
        let buffer = self.channel_buffer(FilmChannels::IMAGEPIPELINE, index)?;
        let data: Vec<Float> = buffer.bits().map(Float::from_bits).collect();
        backend.upload_channel(FilmChannels::IMAGEPIPELINE, index, &data)
    }

    /// Downloads an IMAGEPIPELINE buffer from the backend.
    ///
    /// * `index`   - Image pipeline index.
    /// * `backend` - The backend.
    pub(crate) fn download_image_pipeline(&self, index: usize, backend: &dyn AcceleratorBackend) -> Result<(), String> {
        let buffer = self.channel_buffer(FilmChannels::IMAGEPIPELINE, index)?;
        let mut data = vec![0.0; buffer.len()];
        backend.download_channel(FilmChannels::IMAGEPIPELINE, index, &mut data)?;
        backend.synchronize()?;
        for (i, v) in data.into_iter().enumerate() {
            buffer.set_bits(i, v.to_bits());
        }
        Ok(())
    }
}
