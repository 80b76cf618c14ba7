//! Render driver.

use crate::options::*;
use crate::scene::*;
use caches::*;
use pbrt_core::film::*;
use pbrt_core::parallel::*;
use pbrt_core::pbrt::*;
use pbrt_core::rng::RNG;
use pbrt_core::{print_stats, report_stats};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::sync::Arc;
use std::thread;

/// Number of samples handed to a worker at a time in the shared mode.
const SAMPLE_BATCH_SIZE: usize = 4096;

/// Progress bar resolution.
const PROGRESS_STEPS: u64 = 1000;

/// A rectangle of pixels `[x0, x1) x [y0, y1)`.
#[derive(Copy, Clone, Debug)]
struct Tile {
    index: usize,
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
}

/// Shared state of a render pass.
struct Pass<'a> {
    film: &'a Film,
    generator: &'a SampleGenerator<'a>,
    variance_clamping: VarianceClamping,
    spp: usize,
    seed: u64,
    cancel: &'a CancelToken,
    pause: &'a PauseToken,
}

impl<'a> Pass<'a> {
    /// Generate, clamp and return a sample for a pixel.
    fn sample(&self, x: usize, y: usize, rng: &mut RNG) -> SampleResult {
        let mut sr = self.generator.sample(
            x as Float + rng.uniform_float(),
            y as Float + rng.uniform_float(),
            rng,
        );
        if self.variance_clamping.has_clamping() {
            self.variance_clamping.clamp_sample(self.film, &mut sr);
        }
        sr
    }

    /// Render `spp` samples for every pixel of a tile through the
    /// non-atomic entry point.
    fn render_tile(&self, tile: &Tile) {
        let mut rng = RNG::new(self.seed.wrapping_add(tile.index as u64));
        for y in tile.y0..tile.y1 {
            if self.cancel.is_cancelled() {
                return;
            }
            self.pause.wait_while_paused(self.cancel);
            for x in tile.x0..tile.x1 {
                for _ in 0..self.spp {
                    let sr = self.sample(x, y, &mut rng);
                    self.film.add_sample(x, y, &sr, 1.0);
                }
            }
        }
    }

    /// Render a batch of samples at random pixels of the sub-region through
    /// the atomic entry point.
    fn render_batch(&self, batch: usize, count: usize) {
        let [x0, x1, y0, y1] = self.film.get_sub_region();
        let (w, h) = ((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
        let mut rng = RNG::new(self.seed.wrapping_add(batch as u64));
        for _ in 0..count {
            if self.cancel.is_cancelled() {
                return;
            }
            let x = x0 + rng.bounded_uniform_u32(w) as usize;
            let y = y0 + rng.bounded_uniform_u32(h) as usize;
            let sr = self.sample(x, y, &mut rng);
            self.film.atomic_add_sample(x, y, &sr, 1.0);
        }
    }
}

/// Render one pass in exclusive mode; each worker owns whole tiles.
fn render_exclusive(pass: &Pass, tile_size: usize, n_threads: usize) {
    let [x0, x1, y0, y1] = pass.film.get_sub_region();
    let tile_size = max(tile_size, 1);
    let mut tiles = vec![];
    for ty in (y0..=y1).step_by(tile_size) {
        for tx in (x0..=x1).step_by(tile_size) {
            tiles.push(Tile {
                index: tiles.len(),
                x0: tx,
                x1: min(tx + tile_size, x1 + 1),
                y0: ty,
                y1: min(ty + tile_size, y1 + 1),
            });
        }
    }

    thread::scope(|scope| {
        let (tx_worker, rx_worker) = crossbeam_channel::bounded::<Tile>(n_threads);

        // Spawn worker threads.
        for _ in 0..n_threads {
            let rx_worker = rx_worker.clone();
            scope.spawn(move || {
                for tile in rx_worker.iter() {
                    pass.render_tile(&tile);
                }
                report_stats!();
            });
        }
        drop(rx_worker); // Drop extra since we've cloned one for each worker.

        // Send work.
        for tile in tiles {
            if tx_worker.send(tile).is_err() {
                break;
            }
        }
    });
}

/// Render one pass in shared mode; every worker splats anywhere.
fn render_shared(pass: &Pass, n_threads: usize) {
    let [x0, x1, y0, y1] = pass.film.get_sub_region();
    let total = (x1 - x0 + 1) * (y1 - y0 + 1) * pass.spp;

    thread::scope(|scope| {
        let (tx_worker, rx_worker) = crossbeam_channel::bounded::<(usize, usize)>(n_threads);

        for _ in 0..n_threads {
            let rx_worker = rx_worker.clone();
            scope.spawn(move || {
                for (batch, count) in rx_worker.iter() {
                    pass.render_batch(batch, count);
                }
                report_stats!();
            });
        }
        drop(rx_worker);

        let mut remaining = total;
        let mut batch = 0;
        while remaining > 0 {
            let count = min(remaining, SAMPLE_BATCH_SIZE);
            if tx_worker.send((batch, count)).is_err() {
                break;
            }
            remaining -= count;
            batch += 1;
        }
    });
}

/// Load a saved film.
///
/// * `path` - File path.
fn load_film(path: &str) -> Result<Film, String> {
    let file = File::open(path).map_err(|e| format!("Unable to open '{path}': {e}"))?;
    let film = Film::load(BufReader::new(file))?;
    info!("Loaded {}x{} film from '{}'", film.get_width(), film.get_height(), path);
    Ok(film)
}

/// Save a film.
///
/// * `film` - The film.
/// * `path` - File path.
fn save_film(film: &Film, path: &str) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("Unable to create '{path}': {e}"))?;
    film.save(BufWriter::new(file))?;
    info!("Saved film to '{}'", path);
    Ok(())
}

/// Returns the progress bar.
///
/// * `quiet` - Hide the progress bar.
fn progress_bar(quiet: bool) -> Result<ProgressBar, String> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent:>3}% {msg}",
    )
    .map_err(|e| format!("Invalid progress bar template: {e}"))?
    .progress_chars("=> ");
    let pb = ProgressBar::new(PROGRESS_STEPS);
    pb.set_style(style);
    Ok(pb)
}

/// Returns the fraction of the render done according to the halt conditions.
///
/// * `film` - The film.
fn progress(film: &Film) -> f64 {
    if film.get_convergence() >= 1.0 {
        return 1.0;
    }

    let halt = film.get_halt_conditions();
    let [x0, x1, y0, y1] = film.get_sub_region();
    let spp = film.get_total_sample_count() / ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;

    let mut done = film.get_reported_convergence() as f64;
    if halt.halt_spp > 0.0 {
        done = done.max(spp / halt.halt_spp);
    }
    if halt.halt_time > 0.0 {
        done = done.max(film.get_total_time() / halt.halt_time);
    }
    done.clamp(0.0, 1.0)
}

/// Render the procedural scene.
///
/// * `options` - Command line options.
pub fn render(options: &Options) -> Result<(), String> {
    let params = options.to_paramset();

    let film = match options.load.as_deref() {
        Some(path) => load_film(path)?,
        None => {
            let mut film = Film::try_from(&FilmConfig::from(&params))?;
            film.init()?;
            film
        }
    };
    let film = Arc::new(film);
    let variance_clamping = FilmConfig::from(&params).variance_clamping;

    let cancel = CancelToken::new();
    let pause = PauseToken::new();

    let scene: ArcPhotonScene = Arc::new(Room);
    let mut cache = PhotonGICache::from_config(scene, &PhotonGICacheConfig::from(&params))?;
    if let Some(cache) = cache.as_mut() {
        cache.preprocess(&cancel, &pause)?;
    }

    let generator = SampleGenerator::new(&film, cache.as_ref());
    let n_threads = options.threads();
    let spp = max(options.spp, 1);
    let [x0, x1, y0, y1] = film.get_sub_region();
    let samples_per_pass = ((x1 - x0 + 1) * (y1 - y0 + 1) * spp) as f64;
    let halt = *film.get_halt_conditions();
    let has_halt_condition = halt.halt_spp > 0.0 || halt.halt_time > 0.0 || film.has_convergence_test();

    info!(
        "Rendering {}x{} film with {} threads in {:?} mode",
        film.get_width(),
        film.get_height(),
        n_threads,
        options.mode
    );

    let pb = progress_bar(options.quiet)?;
    let mut seed = film.get_total_sample_count() as u64;
    loop {
        let pass = Pass {
            film: &film,
            generator: &generator,
            variance_clamping,
            spp,
            seed,
            cancel: &cancel,
            pause: &pause,
        };
        match options.mode {
            AccumulationMode::Exclusive => render_exclusive(&pass, options.tile_size, n_threads),
            AccumulationMode::Shared => render_shared(&pass, n_threads),
        }
        film.add_sample_count(samples_per_pass);
        seed = seed.wrapping_add(samples_per_pass as u64);

        // The convergence test runs the pipeline synchronously.
        film.wait_async_execute_image_pipeline()?;
        film.run_halt_tests();

        pb.set_position((progress(&film) * PROGRESS_STEPS as f64) as u64);
        pb.set_message(format!("{:.0} samples/sec", film.get_avg_sample_sec()));

        if film.get_convergence() >= 1.0 || !has_halt_condition {
            break;
        }

        // Preview while the next pass renders.
        film.async_execute_image_pipeline(0)?;
    }
    film.wait_async_execute_image_pipeline()?;
    pb.finish();

    if let Some(path) = options.merge.as_deref() {
        let other = load_film(path)?;
        if other.get_width() != film.get_width() || other.get_height() != film.get_height() {
            return Err(format!(
                "Cannot merge {}x{} film '{}' into {}x{} film",
                other.get_width(),
                other.get_height(),
                path,
                film.get_width(),
                film.get_height()
            ));
        }
        film.add_film_all(&other);
    }

    film.execute_image_pipeline(0)?;
    info!(
        "Done: {} samples in {:.2}s, luminance {:.4}, max value {:.4}, convergence {:.2}",
        film.get_total_sample_count(),
        film.get_total_time(),
        film.get_film_y(0)?,
        film.get_film_max_value(0)?,
        film.get_reported_convergence()
    );

    if let Some(path) = options.save.as_deref() {
        save_film(&film, path)?;
    }

    report_stats!();
    if !options.quiet {
        print_stats!();
    }
    Ok(())
}
