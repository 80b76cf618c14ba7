//! Film

use crate::parallel::{AtomicDouble, AtomicFloat};
use crate::pbrt::*;
use crate::{stat_counter, stat_inc, stat_memory_counter, stat_register_fns, stats::*};
use arc_swap::ArcSwapOption;
use std::collections::BTreeMap;
use std::sync::{atomic::Ordering, Mutex};
use std::time::Instant;

mod accumulate;
mod backend;
mod channels;
mod config;
mod convergence;
mod frame_buffer;
mod halt;
mod image_pipeline;
mod merge;
mod output;
mod persistence;
mod sample_result;
mod variance_clamping;

// Re-export.
pub use backend::*;
pub use channels::*;
pub use config::*;
pub use convergence::*;
pub use frame_buffer::*;
pub use halt::*;
pub use image_pipeline::*;
pub use sample_result::*;
pub use variance_clamping::*;

stat_memory_counter!("Memory/Film buffers", FILM_BUFFER_MEMORY, film_stats_memory);
stat_counter!(
    "Film/Non-finite radiance contributions dropped",
    FILM_DROPPED_CONTRIBUTIONS,
    film_stats_dropped,
);

stat_register_fns!(film_stats_memory, film_stats_dropped);

/// Largest number of pixel components a film allocates over all its buffers.
pub const MAX_FILM_COMPONENTS: usize = 1 << 30;

/// The sample accumulation buffer of one render. It owns a set of channel
/// buffers keyed by channel kind, the image pipelines deriving displayable
/// images from them, and the halt test state.
///
/// Configuration methods take `&mut self` and are only valid before
/// `init()`. Accumulation, merging, halt tests and pipeline execution take
/// `&self`; the film can be shared between rendering threads.
pub struct Film {
    /// Width in pixels.
    width: usize,

    /// Height in pixels.
    height: usize,

    /// Rendered region `[x0, x1, y0, y1]` with inclusive bounds.
    sub_region: [usize; 4],

    /// Active channel kinds.
    channels: FilmChannels,

    /// Channel buffers of the active kinds.
    buffers: BTreeMap<FilmChannels, Vec<ChannelBuffer>>,

    /// Number of radiance groups.
    radiance_group_count: usize,

    /// IDs of the MATERIAL_ID_MASK buffers.
    mask_material_ids: Vec<u32>,

    /// IDs of the BY_MATERIAL_ID buffers.
    by_material_ids: Vec<u32>,

    /// IDs of the OBJECT_ID_MASK buffers.
    mask_object_ids: Vec<u32>,

    /// IDs of the BY_OBJECT_ID buffers.
    by_object_ids: Vec<u32>,

    /// Image pipelines.
    image_pipelines: Vec<ImagePipeline>,

    /// Halt conditions.
    halt: HaltConditions,

    /// Convergence test.
    conv_test: Option<Mutex<FilmConvTest>>,

    /// Number of samples accumulated since the last clear.
    total_sample_count: AtomicDouble,

    /// Convergence; 1 means rendering is done.
    convergence: AtomicFloat,

    /// Last convergence test result, also when it does not stop rendering.
    reported_convergence: AtomicFloat,

    /// Start of sampling.
    start_time: Mutex<Instant>,

    /// Whether `init()` has been called.
    initialized: bool,

    /// Whether a data channel is active.
    has_data_channel: bool,

    /// Whether a composing channel is active.
    has_composing_channel: bool,

    /// Optional accelerator backend.
    backend: ArcSwapOption<Box<dyn AcceleratorBackend>>,

    /// Serializes image pipeline executions.
    pipeline_lock: Mutex<()>,

    /// In-flight asynchronous image pipeline execution.
    async_job: Mutex<Option<output::AsyncPipelineJob>>,
}

impl Film {
    /// Create a new `Film`.
    ///
    /// * `width`      - Width in pixels.
    /// * `height`     - Height in pixels.
    /// * `sub_region` - Optional rendered region `[x0, x1, y0, y1]` with
    ///                  inclusive bounds. Defaults to the whole film.
    pub fn new(width: usize, height: usize, sub_region: Option<[usize; 4]>) -> Result<Self, String> {
        register_stats();

        check_dimensions(width, height)?;

        let sub_region = match sub_region {
            Some(r) if r[0] <= r[1] && r[1] < width && r[2] <= r[3] && r[3] < height => r,
            Some(r) => {
                return Err(format!(
                    "Film sub-region {r:?} is not inside the {width}x{height} film"
                ))
            }
            None => [0, width - 1, 0, height - 1],
        };

        Ok(Self {
            width,
            height,
            sub_region,
            channels: FilmChannels::empty(),
            buffers: BTreeMap::new(),
            radiance_group_count: 1,
            mask_material_ids: vec![],
            by_material_ids: vec![],
            mask_object_ids: vec![],
            by_object_ids: vec![],
            image_pipelines: vec![],
            halt: HaltConditions::default(),
            conv_test: None,
            total_sample_count: AtomicDouble::new(0.0),
            convergence: AtomicFloat::new(0.0),
            reported_convergence: AtomicFloat::new(0.0),
            start_time: Mutex::new(Instant::now()),
            initialized: false,
            has_data_channel: false,
            has_composing_channel: false,
            backend: ArcSwapOption::const_empty(),
            pipeline_lock: Mutex::new(()),
            async_job: Mutex::new(None),
        })
    }

    /// Returns an error once the configuration is locked.
    fn check_not_initialized(&self, op: &str) -> Result<(), String> {
        if self.initialized {
            Err(format!("{op}: the film is already initialized"))
        } else {
            Ok(())
        }
    }

    /// Activates a channel kind. Mask and by-ID kinds take the ID of the
    /// buffer to add and can be added once per ID.
    ///
    /// * `kind` - A single channel kind.
    /// * `id`   - Material or object ID for mask and by-ID kinds.
    pub fn add_channel(&mut self, kind: FilmChannels, id: Option<u32>) -> Result<(), String> {
        self.check_not_initialized("add_channel()")?;
        if kind.bits().count_ones() != 1 {
            return Err(format!("add_channel(): expected a single channel kind, got {kind:?}"));
        }

        let policy = kind.policy();
        if let Some(ids) = self.ids_for_mut(policy.multiplicity) {
            let id = id.ok_or_else(|| format!("add_channel(): channel {} requires an ID", policy.name))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        self.channels |= kind;
        Ok(())
    }

    /// Deactivates a channel kind and forgets its IDs.
    ///
    /// * `kind` - A single channel kind.
    pub fn remove_channel(&mut self, kind: FilmChannels) -> Result<(), String> {
        self.check_not_initialized("remove_channel()")?;
        if kind.bits().count_ones() != 1 {
            return Err(format!("remove_channel(): expected a single channel kind, got {kind:?}"));
        }
        if let Some(ids) = self.ids_for_mut(kind.policy().multiplicity) {
            ids.clear();
        }
        self.channels.remove(kind);
        Ok(())
    }

    /// Returns true if all kinds in `kind` are active.
    ///
    /// * `kind` - Channel kinds.
    pub fn has_channel(&self, kind: FilmChannels) -> bool {
        self.channels.contains(kind)
    }

    /// Returns the active channel kinds.
    pub fn get_channels(&self) -> FilmChannels {
        self.channels
    }

    /// Returns the number of buffers allocated for a channel kind.
    ///
    /// * `kind` - A single channel kind.
    pub fn get_channel_count(&self, kind: FilmChannels) -> usize {
        self.buffers.get(&kind).map_or(0, |b| b.len())
    }

    /// Returns the buffers of a channel kind; empty if the kind is inactive.
    ///
    /// * `kind` - A single channel kind.
    pub fn channel_buffers(&self, kind: FilmChannels) -> &[ChannelBuffer] {
        self.buffers.get(&kind).map_or(&[], |b| b.as_slice())
    }

    /// Returns one buffer of a channel kind.
    ///
    /// * `kind`  - A single channel kind.
    /// * `index` - Buffer index (radiance group, image pipeline or ID index).
    pub fn channel_buffer(&self, kind: FilmChannels, index: usize) -> Result<&ChannelBuffer, String> {
        self.buffers
            .get(&kind)
            .and_then(|b| b.get(index))
            .ok_or_else(|| format!("Film has no {kind:?} buffer with index {index}"))
    }

    /// Sets the number of radiance groups.
    ///
    /// * `count` - Number of radiance groups.
    pub fn set_radiance_group_count(&mut self, count: usize) -> Result<(), String> {
        self.check_not_initialized("set_radiance_group_count()")?;
        if count == 0 {
            return Err(String::from("set_radiance_group_count(): at least one radiance group is required"));
        }
        self.radiance_group_count = count;
        Ok(())
    }

    /// Returns the number of radiance groups.
    pub fn get_radiance_group_count(&self) -> usize {
        self.radiance_group_count
    }

    /// Returns the material IDs of the MATERIAL_ID_MASK buffers.
    pub fn get_mask_material_ids(&self) -> &[u32] {
        &self.mask_material_ids
    }

    /// Returns the material IDs of the BY_MATERIAL_ID buffers.
    pub fn get_by_material_ids(&self) -> &[u32] {
        &self.by_material_ids
    }

    /// Returns the object IDs of the OBJECT_ID_MASK buffers.
    pub fn get_mask_object_ids(&self) -> &[u32] {
        &self.mask_object_ids
    }

    /// Returns the object IDs of the BY_OBJECT_ID buffers.
    pub fn get_by_object_ids(&self) -> &[u32] {
        &self.by_object_ids
    }

    /// Returns the ID list deciding the buffer count of a multiplicity.
    fn ids_for(&self, multiplicity: Multiplicity) -> Option<&[u32]> {
        match multiplicity {
            Multiplicity::PerMaskMaterialId => Some(&self.mask_material_ids),
            Multiplicity::PerByMaterialId => Some(&self.by_material_ids),
            Multiplicity::PerMaskObjectId => Some(&self.mask_object_ids),
            Multiplicity::PerByObjectId => Some(&self.by_object_ids),
            _ => None,
        }
    }

    fn ids_for_mut(&mut self, multiplicity: Multiplicity) -> Option<&mut Vec<u32>> {
        match multiplicity {
            Multiplicity::PerMaskMaterialId => Some(&mut self.mask_material_ids),
            Multiplicity::PerByMaterialId => Some(&mut self.by_material_ids),
            Multiplicity::PerMaskObjectId => Some(&mut self.mask_object_ids),
            Multiplicity::PerByObjectId => Some(&mut self.by_object_ids),
            _ => None,
        }
    }

    /// Replaces the image pipelines. After `init()` the number of pipelines
    /// cannot change.
    ///
    /// * `pipelines` - The image pipelines.
    pub fn set_image_pipelines(&mut self, pipelines: Vec<ImagePipeline>) -> Result<(), String> {
        if self.initialized && pipelines.len() != self.image_pipelines.len() {
            return Err(format!(
                "set_image_pipelines(): the film is initialized with {} image pipelines, got {}",
                self.image_pipelines.len(),
                pipelines.len()
            ));
        }
        self.image_pipelines = pipelines;
        if self.initialized {
            let n = self.radiance_group_count;
            self.image_pipelines
                .iter_mut()
                .filter(|ip| ip.radiance_channel_scales.len() < n)
                .for_each(|ip| ip.set_radiance_group_count(n));
        }
        Ok(())
    }

    /// Replaces one image pipeline.
    ///
    /// * `index`    - Image pipeline index.
    /// * `pipeline` - The image pipeline.
    pub fn set_image_pipeline(&mut self, index: usize, pipeline: ImagePipeline) -> Result<(), String> {
        let n = self.image_pipelines.len();
        let slot = self
            .image_pipelines
            .get_mut(index)
            .ok_or_else(|| format!("set_image_pipeline(): index {index} out of range, {n} image pipelines"))?;
        *slot = pipeline;
        Ok(())
    }

    /// Returns an image pipeline.
    ///
    /// * `index` - Image pipeline index.
    pub fn get_image_pipeline(&self, index: usize) -> Option<&ImagePipeline> {
        self.image_pipelines.get(index)
    }

    /// Returns a mutable image pipeline.
    ///
    /// * `index` - Image pipeline index.
    pub fn get_image_pipeline_mut(&mut self, index: usize) -> Option<&mut ImagePipeline> {
        self.image_pipelines.get_mut(index)
    }

    /// Returns the number of image pipelines.
    pub fn get_image_pipeline_count(&self) -> usize {
        self.image_pipelines.len()
    }

    /// Locks the configuration and allocates the channel buffers.
    pub fn init(&mut self) -> Result<(), String> {
        self.check_not_initialized("init()")?;

        if !self.image_pipelines.is_empty() {
            self.channels |= FilmChannels::IMAGEPIPELINE;
        }
        let n = self.radiance_group_count;
        self.image_pipelines
            .iter_mut()
            .filter(|ip| ip.radiance_channel_scales.len() < n)
            .for_each(|ip| ip.set_radiance_group_count(n));

        let wants_conv_test = self.has_channel(FilmChannels::CONVERGENCE) || self.halt.halt_threshold > 0.0;
        self.conv_test = if wants_conv_test && self.has_channel(FilmChannels::IMAGEPIPELINE) {
            Some(Mutex::new(FilmConvTest::new(
                self.halt.halt_threshold,
                self.halt.halt_threshold_warmup,
                self.halt.halt_threshold_step,
                self.halt.halt_threshold_filter,
            )))
        } else {
            if self.has_channel(FilmChannels::CONVERGENCE) {
                warn!("Film: CONVERGENCE requires an image pipeline, the convergence test is disabled");
            }
            None
        };

        self.check_components(self.width, self.height)?;
        self.initialized = true;
        self.resize(self.width, self.height)
    }

    /// Resizes the film. An initialized film reallocates every buffer and
    /// restarts its statistics. The sub-region is reset to the whole film if
    /// it no longer fits.
    ///
    /// * `width`  - Width in pixels.
    /// * `height` - Height in pixels.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), String> {
        check_dimensions(width, height)?;
        if self.initialized {
            self.check_components(width, height)?;
        }
        self.width = width;
        self.height = height;
        if self.sub_region[1] >= width || self.sub_region[3] >= height {
            self.sub_region = [0, width - 1, 0, height - 1];
        }

        if self.initialized {
            self.allocate();
            if let Some(t) = self.conv_test.as_ref() {
                t.lock().unwrap_or_else(|e| e.into_inner()).reset();
            }
            self.total_sample_count.store(0.0, Ordering::SeqCst);
            self.set_convergence(0.0);
            self.reported_convergence.store(0.0, Ordering::SeqCst);
            self.restart_timer();
        }
        Ok(())
    }

    /// Returns the number of buffers a channel kind owns.
    fn buffer_count(&self, policy: &ChannelPolicy) -> usize {
        match policy.multiplicity {
            Multiplicity::Single => 1,
            Multiplicity::PerRadianceGroup => self.radiance_group_count,
            Multiplicity::PerImagePipeline => self.image_pipelines.len(),
            m => self.ids_for(m).map_or(0, |ids| ids.len()),
        }
    }

    /// Returns an error if the active channels of a `width` x `height` film
    /// need more than `MAX_FILM_COMPONENTS` components.
    fn check_components(&self, width: usize, height: usize) -> Result<(), String> {
        let per_pixel = self.channels.kinds().try_fold(0_usize, |acc, kind| {
            let p = kind.policy();
            self.buffer_count(p)
                .checked_mul(p.channels)
                .and_then(|n| acc.checked_add(n))
        });
        match per_pixel.and_then(|n| n.checked_mul(width * height)) {
            Some(n) if n <= MAX_FILM_COMPONENTS => Ok(()),
            _ => Err(format!(
                "Film {width}x{height} buffers exceed {MAX_FILM_COMPONENTS} components"
            )),
        }
    }

    /// Allocates the buffers of every active kind with its initial fill.
    fn allocate(&mut self) {
        let (w, h) = (self.width, self.height);
        let mut buffers = BTreeMap::new();
        for kind in self.channels.kinds() {
            let p = kind.policy();
            let list: Vec<ChannelBuffer> = (0..self.buffer_count(p))
                .map(|_| match p.component {
                    ComponentType::Float => ChannelBuffer::Float(GenericFrameBuffer::new(
                        p.channels,
                        p.weight_channels,
                        w,
                        h,
                        p.init_fill.as_float(),
                    )),
                    ComponentType::UInt => ChannelBuffer::UInt(GenericFrameBuffer::new(
                        p.channels,
                        p.weight_channels,
                        w,
                        h,
                        p.init_fill.as_uint(),
                    )),
                })
                .collect();
            buffers.insert(kind, list);
        }
        self.buffers = buffers;
        self.has_data_channel = self.channels.has_role(ChannelRole::Data);
        self.has_composing_channel = self.channels.has_role(ChannelRole::Composing);

        let memory = self.memory_size();
        stat_inc!(FILM_BUFFER_MEMORY, memory as u64);

        let names: Vec<&str> = self.channels.kinds().map(|k| k.name()).collect();
        info!("Film resolution: {}x{}", w, h);
        info!("Film channels: {}", names.join(" "));
        info!("Film buffer memory: {} kBytes", memory / 1024);
    }

    /// Returns the memory allocated by the channel buffers in bytes.
    pub fn memory_size(&self) -> usize {
        self.buffers.values().flatten().map(|b| b.memory_size()).sum()
    }

    /// Returns true once `init()` succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns true if a data channel is active.
    pub fn has_data_channel(&self) -> bool {
        self.has_data_channel
    }

    /// Returns true if a composing channel is active.
    pub fn has_composing_channel(&self) -> bool {
        self.has_composing_channel
    }

    /// Returns the width in pixels.
    pub fn get_width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    pub fn get_height(&self) -> usize {
        self.height
    }

    /// Returns `width * height`.
    pub fn get_pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Returns the rendered region `[x0, x1, y0, y1]` with inclusive bounds.
    pub fn get_sub_region(&self) -> [usize; 4] {
        self.sub_region
    }

    /// Copies the configuration that may change between renders from another
    /// film: channels, IDs, radiance group count, image pipelines and halt
    /// conditions.
    ///
    /// * `film` - The film to copy from.
    pub fn copy_dynamic_settings(&mut self, film: &Film) -> Result<(), String> {
        self.check_not_initialized("copy_dynamic_settings()")?;
        self.channels = film.channels;
        self.mask_material_ids = film.mask_material_ids.clone();
        self.by_material_ids = film.by_material_ids.clone();
        self.mask_object_ids = film.mask_object_ids.clone();
        self.by_object_ids = film.by_object_ids.clone();
        self.radiance_group_count = film.radiance_group_count;
        self.image_pipelines = film.image_pipelines.iter().map(|ip| ip.copy()).collect();
        self.halt = film.halt;
        Ok(())
    }
}

/// Returns an error for an empty film or one with more pixels than
/// `MAX_FILM_COMPONENTS`.
fn check_dimensions(width: usize, height: usize) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err(format!("Film size must be non zero, got {width}x{height}"));
    }
    match width.checked_mul(height) {
        Some(n) if n <= MAX_FILM_COMPONENTS => Ok(()),
        _ => Err(format!("Film size {width}x{height} is too large")),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_is_an_error() {
        assert!(Film::new(0, 4, None).is_err());
        assert!(Film::new(4, 0, None).is_err());
        assert!(Film::new(4, 4, Some([0, 4, 0, 1])).is_err());
    }

    #[test]
    fn oversized_film_is_an_error() {
        assert!(Film::new(usize::MAX / 2, 4, None).is_err());
        assert!(Film::new(MAX_FILM_COMPONENTS, 2, None).is_err());

        let mut film = Film::new(1 << 15, 1 << 15, None).unwrap();
        film.set_radiance_group_count(4).unwrap();
        film.add_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, None).unwrap();
        assert!(film.init().is_err());
        assert!(!film.is_initialized());
        assert_eq!(film.memory_size(), 0);
    }

    #[test]
    fn default_sub_region_covers_the_film() {
        let film = Film::new(8, 6, None).unwrap();
        assert_eq!(film.get_sub_region(), [0, 7, 0, 5]);
        assert_eq!(film.get_pixel_count(), 48);
        assert_eq!(film.get_radiance_group_count(), 1);
    }

    #[test]
    fn init_locks_configuration() {
        let mut film = Film::new(4, 4, None).unwrap();
        film.add_channel(FilmChannels::DEPTH, None).unwrap();
        film.init().unwrap();
        assert!(film.is_initialized());
        assert!(film.init().is_err());
        assert!(film.add_channel(FilmChannels::UV, None).is_err());
        assert!(film.remove_channel(FilmChannels::DEPTH).is_err());
        assert!(film.set_radiance_group_count(2).is_err());
    }

    #[test]
    fn buffers_follow_policy_multiplicity_and_fill() {
        let mut film = Film::new(3, 2, None).unwrap();
        film.set_radiance_group_count(3).unwrap();
        film.add_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, None).unwrap();
        film.add_channel(FilmChannels::MATERIAL_ID_MASK, Some(7)).unwrap();
        film.add_channel(FilmChannels::MATERIAL_ID_MASK, Some(9)).unwrap();
        film.add_channel(FilmChannels::MATERIAL_ID_MASK, Some(7)).unwrap();
        film.add_channel(FilmChannels::DEPTH, None).unwrap();
        film.add_channel(FilmChannels::OBJECT_ID, None).unwrap();
        film.set_image_pipelines(vec![ImagePipeline::new(), ImagePipeline::new()]).unwrap();
        film.init().unwrap();

        assert_eq!(film.get_channel_count(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED), 3);
        assert_eq!(film.get_channel_count(FilmChannels::MATERIAL_ID_MASK), 2);
        assert_eq!(film.get_mask_material_ids(), &[7, 9]);
        assert_eq!(film.get_channel_count(FilmChannels::IMAGEPIPELINE), 2);
        assert!(film.has_channel(FilmChannels::IMAGEPIPELINE));
        assert!(film.has_data_channel());
        assert!(film.has_composing_channel());

        let depth = film.channel_buffer(FilmChannels::DEPTH, 0).unwrap().as_float();
        assert!(depth.get_pixel::<1>(2, 1)[0].is_infinite());
        let ids = film.channel_buffer(FilmChannels::OBJECT_ID, 0).unwrap().as_uint();
        assert_eq!(ids.get_pixel::<1>(0, 0), [u32::MAX]);
        assert!(film.channel_buffer(FilmChannels::UV, 0).is_err());
        assert_eq!(
            film.get_image_pipeline(1).map(|ip| ip.radiance_channel_scales.len()),
            Some(3)
        );
        assert!(film.memory_size() > 0);
    }

    #[test]
    fn mask_channel_requires_id() {
        let mut film = Film::new(2, 2, None).unwrap();
        assert!(film.add_channel(FilmChannels::BY_OBJECT_ID, None).is_err());
        assert!(film
            .add_channel(FilmChannels::DEPTH | FilmChannels::UV, None)
            .is_err());
        film.add_channel(FilmChannels::BY_OBJECT_ID, Some(1)).unwrap();
        film.remove_channel(FilmChannels::BY_OBJECT_ID).unwrap();
        assert!(film.get_by_object_ids().is_empty());
        assert!(!film.has_channel(FilmChannels::BY_OBJECT_ID));
    }

    #[test]
    fn pipeline_index_out_of_range() {
        let mut film = Film::new(2, 2, None).unwrap();
        assert!(film.set_image_pipeline(0, ImagePipeline::new()).is_err());
        film.set_image_pipelines(vec![ImagePipeline::new()]).unwrap();
        film.set_image_pipeline(0, ImagePipeline::new()).unwrap();
        film.init().unwrap();
        assert!(film.execute_image_pipeline(3).is_err());
        assert!(film.set_image_pipelines(vec![]).is_err());
    }

    #[test]
    fn resize_reallocates() {
        let mut film = Film::new(4, 4, Some([1, 2, 1, 2])).unwrap();
        film.add_channel(FilmChannels::SAMPLECOUNT, None).unwrap();
        film.init().unwrap();
        film.add_sample_count(10.0);
        assert!(film.resize(0, 1).is_err());
        film.resize(2, 2).unwrap();
        assert_eq!(film.get_sub_region(), [0, 1, 0, 1]);
        assert_eq!(film.get_total_sample_count(), 0.0);
        assert_eq!(
            film.channel_buffer(FilmChannels::SAMPLECOUNT, 0).unwrap().len(),
            4
        );
    }

    #[test]
    fn copy_dynamic_settings_copies_configuration() {
        let mut src = Film::new(2, 2, None).unwrap();
        src.add_channel(FilmChannels::BY_MATERIAL_ID, Some(3)).unwrap();
        src.set_radiance_group_count(2).unwrap();
        src.set_image_pipelines(vec![ImagePipeline::new()]).unwrap();
        src.set_halt_conditions(HaltConditions {
            halt_spp: 8.0,
            ..Default::default()
        });

        let mut dst = Film::new(2, 2, None).unwrap();
        dst.copy_dynamic_settings(&src).unwrap();
        assert!(dst.has_channel(FilmChannels::BY_MATERIAL_ID));
        assert_eq!(dst.get_by_material_ids(), &[3]);
        assert_eq!(dst.get_radiance_group_count(), 2);
        assert_eq!(dst.get_image_pipeline_count(), 1);
        assert_eq!(dst.get_halt_conditions().halt_spp, 8.0);
    }
}
