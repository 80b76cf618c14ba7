//! Film Configuration

use super::{Film, FilmChannels, HaltConditions, ImagePipeline, Multiplicity, VarianceClamping};
use crate::paramset::ParamSet;
use crate::pbrt::*;

/// Film settings read from a `ParamSet`.
#[derive(Clone, Debug, PartialEq)]
pub struct FilmConfig {
    /// Width in pixels.
    pub width: usize,

    /// Height in pixels.
    pub height: usize,

    /// Rendered region `[x0, x1, y0, y1]` with inclusive bounds.
    pub sub_region: Option<[usize; 4]>,

    /// Channel names.
    pub channels: Vec<String>,

    /// Number of radiance groups.
    pub radiance_groups: usize,

    /// IDs of the MATERIAL_ID_MASK buffers.
    pub mask_material_ids: Vec<u32>,

    /// IDs of the BY_MATERIAL_ID buffers.
    pub by_material_ids: Vec<u32>,

    /// IDs of the OBJECT_ID_MASK buffers.
    pub mask_object_ids: Vec<u32>,

    /// IDs of the BY_OBJECT_ID buffers.
    pub by_object_ids: Vec<u32>,

    /// Number of image pipelines.
    pub image_pipelines: usize,

    /// Halt conditions.
    pub halt: HaltConditions,

    /// Variance clamping applied by the caller.
    pub variance_clamping: VarianceClamping,
}

fn to_ids(values: Vec<Int>) -> Vec<u32> {
    values.into_iter().filter(|v| *v >= 0).map(|v| v as u32).collect()
}

impl From<&ParamSet> for FilmConfig {
    /// Create a `FilmConfig` from a `ParamSet`.
    ///
    /// * `params` - Parameter set.
    fn from(params: &ParamSet) -> Self {
        let width = max(params.find_one_int("width", 640), 1) as usize;
        let height = max(params.find_one_int("height", 480), 1) as usize;

        let sub_region = match params.find_int("subregion").as_slice() {
            [x0, x1, y0, y1] if *x0 >= 0 && *y0 >= 0 && x0 <= x1 && y0 <= y1 => {
                Some([*x0 as usize, *x1 as usize, *y0 as usize, *y1 as usize])
            }
            [] => None,
            r => {
                warn!("Ignoring invalid film sub-region {:?}", r);
                None
            }
        };

        let defaults = HaltConditions::default();
        let halt = HaltConditions {
            halt_time: max(params.find_one_float("halttime", 0.0), 0.0) as f64,
            halt_spp: max(params.find_one_int("haltspp", 0), 0) as f64,
            halt_threshold: max(params.find_one_float("haltthreshold", defaults.halt_threshold), 0.0),
            halt_threshold_warmup: max(
                params.find_one_int("haltthresholdwarmup", defaults.halt_threshold_warmup as Int),
                0,
            ) as u32,
            halt_threshold_step: max(
                params.find_one_int("haltthresholdstep", defaults.halt_threshold_step as Int),
                1,
            ) as u32,
            halt_threshold_filter: params.find_one_bool("haltthresholdfilter", defaults.halt_threshold_filter),
            halt_threshold_stop_rendering: params
                .find_one_bool("haltthresholdstoprendering", defaults.halt_threshold_stop_rendering),
        };

        Self {
            width,
            height,
            sub_region,
            channels: params.find_string("channels"),
            radiance_groups: max(params.find_one_int("radiancegroups", 1), 1) as usize,
            mask_material_ids: to_ids(params.find_int("maskmaterialids")),
            by_material_ids: to_ids(params.find_int("bymaterialids")),
            mask_object_ids: to_ids(params.find_int("maskobjectids")),
            by_object_ids: to_ids(params.find_int("byobjectids")),
            image_pipelines: max(params.find_one_int("imagepipelines", 0), 0) as usize,
            halt,
            variance_clamping: VarianceClamping::new(max(params.find_one_float("varianceclamping", 0.0), 0.0)),
        }
    }
}

impl TryFrom<&FilmConfig> for Film {
    type Error = String;

    /// Create an uninitialized `Film` from a `FilmConfig`. Mask and by-ID
    /// channels get one buffer per configured ID; a non-empty ID list adds
    /// its channel even when the channel is not named. The image pipelines
    /// are created empty so plugins can be attached before `init()`.
    ///
    /// * `config` - Film configuration.
    fn try_from(config: &FilmConfig) -> Result<Self, Self::Error> {
        let mut film = Film::new(config.width, config.height, config.sub_region)?;
        film.set_radiance_group_count(config.radiance_groups)?;

        let mut kinds = FilmChannels::empty();
        for name in config.channels.iter() {
            kinds |= FilmChannels::from_name(name)?;
        }
        for (kind, ids) in [
            (FilmChannels::MATERIAL_ID_MASK, &config.mask_material_ids),
            (FilmChannels::BY_MATERIAL_ID, &config.by_material_ids),
            (FilmChannels::OBJECT_ID_MASK, &config.mask_object_ids),
            (FilmChannels::BY_OBJECT_ID, &config.by_object_ids),
        ] {
            if !ids.is_empty() {
                kinds |= kind;
            }
        }

        for kind in kinds.kinds() {
            let ids = match kind.policy().multiplicity {
                Multiplicity::PerMaskMaterialId => Some(&config.mask_material_ids),
                Multiplicity::PerByMaterialId => Some(&config.by_material_ids),
                Multiplicity::PerMaskObjectId => Some(&config.mask_object_ids),
                Multiplicity::PerByObjectId => Some(&config.by_object_ids),
                _ => None,
            };
            match ids {
                Some(ids) if ids.is_empty() => {
                    return Err(format!("Film channel {} requires at least one ID", kind.name()))
                }
                Some(ids) => ids.iter().try_for_each(|id| film.add_channel(kind, Some(*id)))?,
                None => film.add_channel(kind, None)?,
            }
        }

        film.set_halt_conditions(config.halt);
        film.set_image_pipelines((0..config.image_pipelines).map(|_| ImagePipeline::new()).collect())?;
        Ok(film)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FilmConfig::from(&ParamSet::new());
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 480);
        assert_eq!(config.sub_region, None);
        assert!(config.channels.is_empty());
        assert_eq!(config.radiance_groups, 1);
        assert_eq!(config.image_pipelines, 0);
        assert_eq!(config.halt, HaltConditions::default());
        assert!(!config.variance_clamping.has_clamping());
    }

    #[test]
    fn film_from_params() {
        let mut ps = ParamSet::new();
        ps.add_int("width", &[8]);
        ps.add_int("height", &[4]);
        ps.add_int("subregion", &[2, 5, 0, 3]);
        ps.add_string(
            "channels",
            &[
                "radiance_per_pixel_normalized".to_string(),
                "DEPTH".to_string(),
                "BY_MATERIAL_ID".to_string(),
            ],
        );
        ps.add_int("radiancegroups", &[2]);
        ps.add_int("bymaterialids", &[4, 9]);
        ps.add_int("maskobjectids", &[1]);
        ps.add_int("haltspp", &[32]);
        ps.add_float("varianceclamping", &[5.0]);
        ps.add_int("imagepipelines", &[1]);

        let config = FilmConfig::from(&ps);
        assert_eq!(config.halt.halt_spp, 32.0);
        assert!(config.variance_clamping.has_clamping());

        let mut film = Film::try_from(&config).unwrap();
        assert_eq!(film.get_sub_region(), [2, 5, 0, 3]);
        assert_eq!(film.get_radiance_group_count(), 2);
        assert_eq!(film.get_by_material_ids(), &[4, 9]);
        assert_eq!(film.get_mask_object_ids(), &[1]);
        assert!(film.has_channel(FilmChannels::DEPTH | FilmChannels::OBJECT_ID_MASK));
        assert_eq!(film.get_halt_conditions().halt_spp, 32.0);

        film.init().unwrap();
        assert_eq!(film.get_channel_count(FilmChannels::BY_MATERIAL_ID), 2);
        assert_eq!(film.get_channel_count(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED), 2);
        assert!(film.has_channel(FilmChannels::IMAGEPIPELINE));
        assert_eq!(film.get_halt_conditions().halt_threshold, 0.0);
        assert!(!film.has_convergence_test());
    }

    #[test]
    fn bad_channel_configuration_is_an_error() {
        let mut ps = ParamSet::new();
        ps.add_string("channels", &["NOT_A_CHANNEL".to_string()]);
        assert!(Film::try_from(&FilmConfig::from(&ps)).is_err());

        ps.add_string("channels", &["MATERIAL_ID_MASK".to_string()]);
        assert!(Film::try_from(&FilmConfig::from(&ps)).is_err());
    }
}
