//! Command line options.

use clap::{Parser, ValueEnum};
use pbrt_core::paramset::ParamSet;
use pbrt_core::pbrt::*;

/// How worker threads share the film.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AccumulationMode {
    /// Each thread owns whole tiles and uses the non-atomic entry points.
    Exclusive,

    /// Threads splat anywhere in the frame through the atomic entry points.
    Shared,
}

/// Film engine options.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Accumulates a procedurally lit scene into a film.", long_about = None)]
pub struct Options {
    /// Film width.
    #[arg(long, value_name = "NUM", default_value_t = 128)]
    pub width: usize,

    /// Film height.
    #[arg(long, value_name = "NUM", default_value_t = 128)]
    pub height: usize,

    /// Number of threads to use for rendering.
    #[arg(
        long = "threads",
        short = 't',
        value_name = "NUM",
        default_value_t = 0,
        help = "Number of rendering threads; 0 uses all logical CPUs."
    )]
    n_threads: usize,

    /// Samples per pixel per pass.
    #[arg(long, value_name = "NUM", default_value_t = 4)]
    pub spp: usize,

    /// Halt once the average samples per pixel exceeds this value.
    #[arg(long = "halt-spp", value_name = "NUM", default_value_t = 64)]
    pub halt_spp: usize,

    /// Halt after this many seconds.
    #[arg(long = "halt-time", value_name = "SECONDS", default_value_t = 0.0)]
    pub halt_time: Float,

    /// Convergence test threshold; 0 disables the test.
    #[arg(long = "halt-threshold", value_name = "FLOAT", default_value_t = 0.0)]
    pub halt_threshold: Float,

    /// Accumulation mode.
    #[arg(long, value_enum, default_value_t = AccumulationMode::Exclusive)]
    pub mode: AccumulationMode,

    /// Number of radiance groups. Group 0 receives direct light, group 1 the
    /// photon cache.
    #[arg(long, value_name = "NUM", default_value_t = 1)]
    pub groups: usize,

    /// Variance clamping maximum value; 0 disables clamping.
    #[arg(long = "variance-clamping", value_name = "FLOAT", default_value_t = 0.0)]
    pub variance_clamping: Float,

    /// Number of photons traced for the photon GI cache; 0 disables it.
    #[arg(long, value_name = "NUM", default_value_t = 0)]
    pub photons: usize,

    /// Tile size in pixels for the exclusive mode.
    #[arg(long = "tilesize", value_name = "NUM", default_value_t = 16)]
    pub tile_size: usize,

    /// Save the film when done.
    #[arg(long, value_name = "FILE")]
    pub save: Option<String>,

    /// Resume rendering a saved film.
    #[arg(long, value_name = "FILE")]
    pub load: Option<String>,

    /// Merge a saved film into the result.
    #[arg(long, value_name = "FILE")]
    pub merge: Option<String>,

    /// Suppress the progress bar and statistics.
    #[arg(long)]
    pub quiet: bool,
}

impl Options {
    /// Returns the number of threads to use.
    pub fn threads(&self) -> usize {
        let max_threads = std::thread::available_parallelism().map_or(1, |n| n.get());
        match self.n_threads {
            0 => max_threads,
            n if n > max_threads => {
                warn!("Num threads > max logical CPUs {}", max_threads);
                max_threads
            }
            n => n,
        }
    }

    /// Returns the film and photon cache parameters.
    pub fn to_paramset(&self) -> ParamSet {
        let mut channels = vec![
            "RADIANCE_PER_PIXEL_NORMALIZED",
            "ALPHA",
            "DEPTH",
            "POSITION",
            "SHADING_NORMAL",
            "MATERIAL_ID",
            "SAMPLECOUNT",
        ];
        if self.halt_threshold > 0.0 {
            channels.push("CONVERGENCE");
        }

        let mut ps = ParamSet::new();
        ps.add_int("width", &[self.width as Int]);
        ps.add_int("height", &[self.height as Int]);
        ps.add_string("channels", &channels.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        ps.add_int("radiancegroups", &[max(self.groups, 1) as Int]);
        ps.add_int("imagepipelines", &[1]);
        ps.add_int("haltspp", &[self.halt_spp as Int]);
        ps.add_float("halttime", &[self.halt_time]);
        ps.add_float("haltthreshold", &[self.halt_threshold]);
        ps.add_int("haltthresholdwarmup", &[max(self.spp, 1) as Int]);
        ps.add_int("haltthresholdstep", &[max(self.spp, 1) as Int]);
        ps.add_float("varianceclamping", &[self.variance_clamping]);
        ps.add_int("photongi.photon.count", &[self.photons as Int]);
        ps.add_bool("photongi.direct.enabled", &[false]);
        ps.add_int("photongi.threads", &[self.threads() as Int]);
        ps
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use caches::PhotonGICacheConfig;
    use pbrt_core::film::*;

    #[test]
    fn parse_options() {
        let options = Options::parse_from([
            "film-engine",
            "--width",
            "32",
            "--height",
            "16",
            "--mode",
            "shared",
            "--groups",
            "2",
            "--halt-threshold",
            "0.05",
            "--photons",
            "1000",
        ]);
        assert_eq!(options.mode, AccumulationMode::Shared);
        assert_eq!(options.spp, 4);

        let ps = options.to_paramset();
        let config = FilmConfig::from(&ps);
        assert_eq!(config.width, 32);
        assert_eq!(config.height, 16);
        assert_eq!(config.radiance_groups, 2);
        assert_eq!(config.image_pipelines, 1);
        assert_eq!(config.halt.halt_spp, 64.0);

        let film = Film::try_from(&config).unwrap();
        assert!(film.has_channel(FilmChannels::CONVERGENCE | FilmChannels::DEPTH));

        let pgc = PhotonGICacheConfig::from(&ps);
        assert_eq!(pgc.photon_count, 1000);
        assert!(!pgc.direct_enabled);
    }
}
