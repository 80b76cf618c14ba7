//! Photon tracing.

use super::common::*;
use super::scene::*;
use pbrt_core::geometry::*;
use pbrt_core::parallel::*;
use pbrt_core::pbrt::*;
use pbrt_core::sampling::HaltonSampleSequence;
use pbrt_core::{report_stats, stat_dist, stat_inc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

/// Number of photons handed to a worker at a time.
const PHOTON_BATCH_SIZE: usize = 1024;

/// Path depth after which Russian roulette may end a photon path.
const RUSSIAN_ROULETTE_DEPTH: usize = 2;

/// Photons and radiance photon candidates traced by one worker, handed to
/// the orchestrator when the worker finishes.
#[derive(Default)]
pub struct TracedPhotons {
    /// Deposited photons per pool.
    pub photons: [Vec<Photon>; 3],

    /// Radiance photon candidates per pool.
    pub candidates: [Vec<RadiancePhotonCandidate>; 3],

    /// Number of photon paths traced.
    pub traced: usize,
}

impl TracedPhotons {
    /// Moves the contents of another set of traced photons into this one.
    ///
    /// * `other` - The photons to take.
    pub fn append(&mut self, mut other: TracedPhotons) {
        for pool in PhotonPool::ALL {
            let i = pool.index();
            self.photons[i].append(&mut other.photons[i]);
            self.candidates[i].append(&mut other.candidates[i]);
        }
        self.traced += other.traced;
    }
}

/// Trace photons with `n_threads` workers. Batches of photon counts are sent
/// over a channel and every worker returns its own `TracedPhotons` over a
/// second channel; the global counter is the only shared mutable state.
///
/// * `scene`          - The scene.
/// * `photon_count`   - Number of photons to trace.
/// * `max_path_depth` - Maximum photon path depth.
/// * `n_threads`      - Number of worker threads.
/// * `cancel`         - Cancellation token.
/// * `pause`          - Pause token.
pub fn trace_photons(
    scene: &(dyn PhotonScene + Send + Sync),
    photon_count: usize,
    max_path_depth: usize,
    n_threads: usize,
    cancel: &CancelToken,
    pause: &PauseToken,
) -> TracedPhotons {
    let global_counter = AtomicU64::new(0);
    let (tx_result, rx_result) = crossbeam_channel::unbounded::<TracedPhotons>();

    thread::scope(|scope| {
        let (tx_worker, rx_worker) = crossbeam_channel::bounded::<usize>(n_threads);

        // Spawn worker threads.
        for i in 0..n_threads {
            let rx_worker = rx_worker.clone();
            let tx_result = tx_result.clone();
            let global_counter = &global_counter;
            let spawned = thread::Builder::new()
                .name(format!("photon-trace-{i}"))
                .spawn_scoped(scope, move || {
                    let mut traced = TracedPhotons::default();
                    for batch in rx_worker.iter() {
                        for _ in 0..batch {
                            if cancel.is_cancelled() {
                                break;
                            }
                            pause.wait_while_paused(cancel);

                            let index = global_counter.fetch_add(1, Ordering::Relaxed);
                            trace_photon(scene, index, max_path_depth, cancel, pause, &mut traced);
                            traced.traced += 1;
                        }
                    }
                    report_stats!();
                    if tx_result.send(traced).is_err() {
                        error!("Photon trace results dropped");
                    }
                });
            if let Err(e) = spawned {
                error!("Unable to spawn photon trace thread: {e}");
            }
        }
        drop(rx_worker); // Drop extra since we've cloned one for each worker.

        // Send work.
        let mut remaining = photon_count;
        while remaining > 0 && !cancel.is_cancelled() {
            let batch = min(remaining, PHOTON_BATCH_SIZE);
            if tx_worker.send(batch).is_err() {
                break;
            }
            remaining -= batch;
        }
    });
    drop(tx_result);

    let mut result = TracedPhotons::default();
    for traced in rx_result.iter() {
        result.append(traced);
    }
    result
}

/// Trace a single photon path and deposit photons at non-specular hits.
///
/// * `scene`          - The scene.
/// * `index`          - Global sample index of the path.
/// * `max_path_depth` - Maximum photon path depth.
/// * `cancel`         - Cancellation token.
/// * `pause`          - Pause token.
/// * `traced`         - Receives the deposits.
fn trace_photon(
    scene: &(dyn PhotonScene + Send + Sync),
    index: u64,
    max_path_depth: usize,
    cancel: &CancelToken,
    pause: &PauseToken,
    traced: &mut TracedPhotons,
) {
    stat_inc!(PHOTONS_TRACED, 1);

    let mut sampler = HaltonSampleSequence::new(index);
    let u_light = sampler.get_1d();
    let u0 = sampler.get_2d();
    let u1 = sampler.get_2d();
    let emission = match scene.sample_light_emission(u_light, &u0, &u1) {
        Some(emission) if !emission.flux.is_black() => emission,
        _ => return,
    };

    let mut beta = emission.flux;
    let mut origin = emission.origin;
    let mut direction = emission.direction;
    let mut specular_bounce = false;
    let mut diffuse_bounce = false;

    let mut depth = 0;
    while depth < max_path_depth {
        if cancel.is_cancelled() {
            break;
        }
        pause.wait_while_paused(cancel);

        let hit = match scene.intersect(&origin, &direction) {
            Some(hit) => hit,
            None => break,
        };

        if !hit.is_delta {
            let pool = PhotonPool::classify(depth, specular_bounce, diffuse_bounce);
            traced.photons[pool.index()].push(Photon {
                p: hit.p,
                d: direction,
                alpha: beta,
                n: hit.n,
            });
            match pool {
                PhotonPool::Direct => stat_inc!(DIRECT_PHOTONS, 1),
                PhotonPool::Indirect => stat_inc!(INDIRECT_PHOTONS, 1),
                PhotonPool::Caustic => stat_inc!(CAUSTIC_PHOTONS, 1),
            }

            if sampler.get_1d() < RADIANCE_PHOTON_FRACTION {
                traced.candidates[pool.index()].push(RadiancePhotonCandidate {
                    p: hit.p,
                    n: hit.n,
                    albedo: hit.albedo,
                });
            }
            diffuse_bounce = true;
        } else {
            specular_bounce = true;
        }

        // Sample new photon direction.
        let wo = -direction;
        let u = sampler.get_2d();
        let bs = match scene.sample_bsdf(&hit, &wo, &u) {
            Some(bs) if bs.pdf > 0.0 && !bs.f.is_black() => bs,
            _ => break,
        };
        let mut bnew = beta * bs.f * bs.wi.abs_dot(&hit.n) / bs.pdf;

        // Possibly terminate photon path with Russian roulette.
        if depth >= RUSSIAN_ROULETTE_DEPTH {
            let beta_y = beta.y();
            let q = if beta_y > 0.0 {
                max(0.0, 1.0 - bnew.y() / beta_y)
            } else {
                1.0
            };
            if sampler.get_1d() < q {
                break;
            }
            bnew /= 1.0 - q;
        }
        if bnew.is_black() {
            break;
        }

        beta = bnew;
        origin = hit.p;
        direction = bs.wi;
        depth += 1;
    }

    stat_dist!(PHOTON_PATH_LENGTH, depth as i64);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
