//! Image Pipeline

use super::{AcceleratorBackend, Film};
use crate::pbrt::*;
use crate::spectrum::*;
use std::any::Any;

/// A post-processing transform. Plugins read the film's channel buffers and
/// write only the IMAGEPIPELINE buffer of the pipeline being executed.
pub trait ImagePipelinePlugin: Send + Sync {
    /// Returns the plugin name. Backend capable plugins also use it as the
    /// kernel name.
    fn name(&self) -> &str;

    /// Returns a boxed copy of the plugin.
    fn copy_box(&self) -> Box<dyn ImagePipelinePlugin>;

    /// Applies the plugin on the host.
    ///
    /// * `film`  - The film.
    /// * `index` - Image pipeline index.
    fn apply(&self, film: &Film, index: usize);

    /// Returns true if the plugin can run on an accelerator backend.
    fn can_use_backend(&self) -> bool {
        false
    }

    /// Applies the plugin on an accelerator backend. The IMAGEPIPELINE
    /// buffer is already in device memory.
    ///
    /// * `film`    - The film.
    /// * `index`   - Image pipeline index.
    /// * `backend` - The backend.
    fn apply_backend(&self, film: &Film, index: usize, backend: &dyn AcceleratorBackend) -> Result<(), String> {
        let _ = index;
        backend.execute_kernel(self.name(), film.get_width(), film.get_height())
    }

    /// Returns the plugin as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Per radiance group scale applied when the radiance groups are merged.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RadianceChannelScale {
    /// Scale applied to all components.
    pub global_scale: Float,

    /// Colour temperature in Kelvin; 0 disables the white point scale.
    pub temperature: Float,

    /// Per component scale.
    pub rgb_scale: Spectrum,

    /// Use the reciprocal of the temperature white point.
    pub reverse: bool,

    /// Normalize the white point to unit luminance.
    pub normalize: bool,

    /// Disabled groups are skipped when merging.
    pub enabled: bool,

    /// Effective scale computed by `init()`.
    pub(super) scale: Spectrum,
}

impl Default for RadianceChannelScale {
    fn default() -> Self {
        Self {
            global_scale: 1.0,
            temperature: 0.0,
            rgb_scale: Spectrum::new(1.0),
            reverse: false,
            normalize: false,
            enabled: true,
            scale: Spectrum::new(1.0),
        }
    }
}

impl RadianceChannelScale {
    /// Computes the effective scale. Call after changing any field.
    pub fn init(&mut self) {
        let mut white = Spectrum::from(temperature_to_white_point(self.temperature));
        if self.normalize {
            let y = white.y();
            if y > 0.0 {
                white /= y;
            }
        }
        if self.reverse {
            let c = white.to_rgb();
            white = Spectrum::from_rgb(reciprocal(c[0]), reciprocal(c[1]), reciprocal(c[2]));
        }
        self.scale = self.rgb_scale * white * self.global_scale;
    }

    /// Returns the effective scale.
    pub fn get_scale(&self) -> Spectrum {
        self.scale
    }

    /// Scales a radiance value.
    ///
    /// * `v` - The radiance.
    pub fn scale(&self, v: &Spectrum) -> Spectrum {
        *v * self.scale
    }
}

fn reciprocal(v: Float) -> Float {
    if v > 0.0 {
        1.0 / v
    } else {
        0.0
    }
}

/// An ordered chain of plugins with per radiance group scales.
#[derive(Default)]
pub struct ImagePipeline {
    /// The plugins, applied in order.
    plugins: Vec<Box<dyn ImagePipelinePlugin>>,

    /// Per radiance group scales.
    pub radiance_channel_scales: Vec<RadianceChannelScale>,
}

impl ImagePipeline {
    /// Create a new empty `ImagePipeline`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plugin.
    ///
    /// * `plugin` - The plugin.
    pub fn add_plugin(&mut self, plugin: Box<dyn ImagePipelinePlugin>) {
        self.plugins.push(plugin);
    }

    /// Returns the plugins.
    pub fn plugins(&self) -> &[Box<dyn ImagePipelinePlugin>] {
        &self.plugins
    }

    /// Returns true if at least one plugin can use a backend.
    pub fn can_use_backend(&self) -> bool {
        self.plugins.iter().any(|p| p.can_use_backend())
    }

    /// Returns the first plugin of type `P`.
    pub fn get_plugin<P: 'static>(&self) -> Option<&P> {
        self.plugins.iter().find_map(|p| p.as_any().downcast_ref::<P>())
    }

    /// Resizes the radiance channel scales to the radiance group count.
    ///
    /// * `count` - Radiance group count.
    pub fn set_radiance_group_count(&mut self, count: usize) {
        self.radiance_channel_scales.resize(count, RadianceChannelScale::default());
    }

    /// Sets the scale of a radiance group, growing the list if needed.
    ///
    /// * `index` - Radiance group index.
    /// * `scale` - The scale.
    pub fn set_radiance_channel_scale(&mut self, index: usize, scale: RadianceChannelScale) {
        if index >= self.radiance_channel_scales.len() {
            self.radiance_channel_scales
                .resize(index + 1, RadianceChannelScale::default());
        }
        self.radiance_channel_scales[index] = scale;
        self.radiance_channel_scales[index].init();
    }

    /// Returns a copy with copied plugins and default radiance scales.
    pub fn copy(&self) -> Self {
        Self {
            plugins: self.plugins.iter().map(|p| p.copy_box()).collect(),
            radiance_channel_scales: vec![],
        }
    }

    /// Applies the plugins in order. Around backend capable plugins the
    /// IMAGEPIPELINE buffer moves to the backend and back only when the next
    /// plugin runs elsewhere.
    ///
    /// * `film`  - The film.
    /// * `index` - Image pipeline index.
    pub fn apply(&self, film: &Film, index: usize) -> Result<(), String> {
        let handle = film.backend();
        let backend: Option<&dyn AcceleratorBackend> = handle.as_deref().map(|b| &**b);
        let mut image_on_host = true;

        for plugin in self.plugins.iter() {
            match backend.filter(|_| plugin.can_use_backend()) {
                Some(b) => {
                    if image_on_host {
                        film.upload_image_pipeline(index, b)?;
                    }
                    plugin.apply_backend(film, index, b)?;
                    image_on_host = false;
                }
                None => {
                    if let (false, Some(b)) = (image_on_host, backend) {
                        film.download_image_pipeline(index, b)?;
                    }
                    plugin.apply(film, index);
                    image_on_host = true;
                }
            }
        }

        if let (false, Some(b)) = (image_on_host, backend) {
            film.download_image_pipeline(index, b)?;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    struct Gain(Float);

    impl ImagePipelinePlugin for Gain {
        fn name(&self) -> &str {
            "Gain"
        }

        fn copy_box(&self) -> Box<dyn ImagePipelinePlugin> {
            Box::new(Gain(self.0))
        }

        fn apply(&self, _film: &Film, _index: usize) {}

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn default_scale_is_identity() {
        let mut s = RadianceChannelScale::default();
        s.init();
        let v = Spectrum::from_rgb(0.1, 0.2, 0.3);
        assert_eq!(s.scale(&v), v);
    }

    #[test]
    fn global_and_rgb_scale_multiply() {
        let mut s = RadianceChannelScale {
            global_scale: 2.0,
            rgb_scale: Spectrum::from_rgb(1.0, 0.5, 0.0),
            ..Default::default()
        };
        s.init();
        assert_eq!(s.scale(&Spectrum::new(1.0)), Spectrum::from_rgb(2.0, 1.0, 0.0));
    }

    #[test]
    fn temperature_tints_and_reverse_inverts() {
        let mut warm = RadianceChannelScale {
            temperature: 2500.0,
            ..Default::default()
        };
        warm.init();
        let w = warm.get_scale();
        assert!(w[0] > w[2]);
        assert!(approx_eq!(Float, w.max_component_value(), 1.0, epsilon = 1e-5));

        let mut rev = warm;
        rev.reverse = true;
        rev.init();
        let r = rev.get_scale();
        assert!(approx_eq!(Float, r[2] * w[2], 1.0, epsilon = 1e-4));
    }

    #[test]
    fn plugin_lookup_and_copy() {
        let mut ip = ImagePipeline::new();
        ip.add_plugin(Box::new(Gain(3.0)));
        ip.set_radiance_channel_scale(2, RadianceChannelScale::default());
        assert_eq!(ip.radiance_channel_scales.len(), 3);
        assert_eq!(ip.get_plugin::<Gain>().map(|g| g.0), Some(3.0));
        assert!(!ip.can_use_backend());

        let c = ip.copy();
        assert_eq!(c.plugins().len(), 1);
        assert!(c.radiance_channel_scales.is_empty());
    }
}
