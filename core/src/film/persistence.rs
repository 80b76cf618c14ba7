//! Film Persistence

use super::{Film, FilmChannels, HaltConditions, ImagePipeline, RadianceChannelScale};
use crate::pbrt::*;
use crate::spectrum::*;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use std::sync::atomic::Ordering;

/// File magic "FILM".
const FILM_MAGIC: u32 = 0x4d4c_4946;

/// Layout version.
const FILM_VERSION: u32 = 1;

/// Little endian writer counting the bytes written.
struct FilmWriter<W: Write> {
    w: W,
    bytes: usize,
}

impl<W: Write> FilmWriter<W> {
    fn u8(&mut self, v: u8) -> Result<(), String> {
        self.bytes += 1;
        self.w.write_u8(v).map_err(|e| format!("Film::save(): {e}"))
    }

    fn bool(&mut self, v: bool) -> Result<(), String> {
        self.u8(v as u8)
    }

    fn u32(&mut self, v: u32) -> Result<(), String> {
        self.bytes += 4;
        self.w
            .write_u32::<LittleEndian>(v)
            .map_err(|e| format!("Film::save(): {e}"))
    }

    fn u64(&mut self, v: u64) -> Result<(), String> {
        self.bytes += 8;
        self.w
            .write_u64::<LittleEndian>(v)
            .map_err(|e| format!("Film::save(): {e}"))
    }

    fn usize(&mut self, v: usize) -> Result<(), String> {
        self.u64(v as u64)
    }

    fn f32(&mut self, v: Float) -> Result<(), String> {
        self.u32(v.to_bits())
    }

    fn f64(&mut self, v: f64) -> Result<(), String> {
        self.u64(v.to_bits())
    }

    fn ids(&mut self, ids: &[u32]) -> Result<(), String> {
        self.usize(ids.len())?;
        ids.iter().try_for_each(|id| self.u32(*id))
    }
}

/// Little endian reader.
struct FilmReader<R: Read> {
    r: R,
}

impl<R: Read> FilmReader<R> {
    fn u8(&mut self) -> Result<u8, String> {
        self.r.read_u8().map_err(|e| format!("Film::load(): {e}"))
    }

    fn bool(&mut self) -> Result<bool, String> {
        Ok(self.u8()? != 0)
    }

    fn u32(&mut self) -> Result<u32, String> {
        self.r
            .read_u32::<LittleEndian>()
            .map_err(|e| format!("Film::load(): {e}"))
    }

    fn u64(&mut self) -> Result<u64, String> {
        self.r
            .read_u64::<LittleEndian>()
            .map_err(|e| format!("Film::load(): {e}"))
    }

    fn usize(&mut self) -> Result<usize, String> {
        let v = self.u64()?;
        usize::try_from(v).map_err(|e| format!("Film::load(): {e}"))
    }

    /// Reads a length and rejects values above `limit`.
    fn len(&mut self, what: &str, limit: usize) -> Result<usize, String> {
        let n = self.usize()?;
        if n > limit {
            Err(format!("Film::load(): corrupt {what} count {n}"))
        } else {
            Ok(n)
        }
    }

    fn f32(&mut self) -> Result<Float, String> {
        Ok(Float::from_bits(self.u32()?))
    }

    fn f64(&mut self) -> Result<f64, String> {
        Ok(f64::from_bits(self.u64()?))
    }

    fn ids(&mut self) -> Result<Vec<u32>, String> {
        let n = self.len("ID", 1 << 20)?;
        (0..n).map(|_| self.u32()).collect()
    }
}

impl Film {
    /// Writes the film configuration, statistics and every channel buffer.
    /// Image pipeline plugins are not written.
    ///
    /// * `w` - The writer.
    pub fn save<W: Write>(&self, w: W) -> Result<(), String> {
        if !self.initialized {
            return Err(String::from("Film::save(): the film is not initialized"));
        }

        let mut out = FilmWriter { w, bytes: 0 };
        out.u32(FILM_MAGIC)?;
        out.u32(FILM_VERSION)?;

        out.usize(self.width)?;
        out.usize(self.height)?;
        for v in self.sub_region {
            out.usize(v)?;
        }
        out.u32(self.channels.bits())?;
        out.usize(self.radiance_group_count)?;
        out.ids(&self.mask_material_ids)?;
        out.ids(&self.by_material_ids)?;
        out.ids(&self.mask_object_ids)?;
        out.ids(&self.by_object_ids)?;

        out.usize(self.image_pipelines.len())?;
        for ip in self.image_pipelines.iter() {
            out.usize(ip.radiance_channel_scales.len())?;
            for s in ip.radiance_channel_scales.iter() {
                out.f32(s.global_scale)?;
                out.f32(s.temperature)?;
                for c in s.rgb_scale.to_rgb() {
                    out.f32(c)?;
                }
                out.bool(s.reverse)?;
                out.bool(s.normalize)?;
                out.bool(s.enabled)?;
            }
        }

        let h = &self.halt;
        out.f64(h.halt_time)?;
        out.f64(h.halt_spp)?;
        out.f32(h.halt_threshold)?;
        out.u32(h.halt_threshold_warmup)?;
        out.u32(h.halt_threshold_step)?;
        out.bool(h.halt_threshold_filter)?;
        out.bool(h.halt_threshold_stop_rendering)?;

        out.f64(self.get_total_sample_count())?;
        out.f32(self.get_convergence())?;
        out.f32(self.get_reported_convergence())?;

        for (kind, buffers) in self.buffers.iter() {
            out.u32(kind.bits())?;
            out.usize(buffers.len())?;
            for b in buffers.iter() {
                out.usize(b.len())?;
                for bits in b.bits() {
                    out.u32(bits)?;
                }
            }
        }

        out.w.flush().map_err(|e| format!("Film::save(): {e}"))?;
        info!("Film saved: {} bytes", out.bytes);
        Ok(())
    }

    /// Reads a film written by `save()`. The returned film is initialized
    /// and its image pipelines carry the saved radiance channel scales and
    /// no plugins.
    ///
    /// * `r` - The reader.
    pub fn load<R: Read>(r: R) -> Result<Film, String> {
        let mut inp = FilmReader { r };

        let magic = inp.u32()?;
        if magic != FILM_MAGIC {
            return Err(format!("Film::load(): bad magic {magic:#010x}"));
        }
        let version = inp.u32()?;
        if version != FILM_VERSION {
            return Err(format!("Film::load(): unsupported version {version}"));
        }

        let width = inp.usize()?;
        let height = inp.usize()?;
        let mut sub_region = [0; 4];
        for v in sub_region.iter_mut() {
            *v = inp.usize()?;
        }
        let mut film = Film::new(width, height, Some(sub_region))?;

        let bits = inp.u32()?;
        film.channels =
            FilmChannels::from_bits(bits).ok_or_else(|| format!("Film::load(): unknown channel bits {bits:#x}"))?;
        film.set_radiance_group_count(inp.len("radiance group", 1 << 16)?)?;
        film.mask_material_ids = inp.ids()?;
        film.by_material_ids = inp.ids()?;
        film.mask_object_ids = inp.ids()?;
        film.by_object_ids = inp.ids()?;

        let pipeline_count = inp.len("image pipeline", 1 << 16)?;
        let mut pipelines = Vec::with_capacity(pipeline_count);
        for _ in 0..pipeline_count {
            let mut ip = ImagePipeline::new();
            let scale_count = inp.len("radiance channel scale", 1 << 16)?;
            for i in 0..scale_count {
                let global_scale = inp.f32()?;
                let temperature = inp.f32()?;
                let rgb_scale = Spectrum::from_rgb(inp.f32()?, inp.f32()?, inp.f32()?);
                let scale = RadianceChannelScale {
                    global_scale,
                    temperature,
                    rgb_scale,
                    reverse: inp.bool()?,
                    normalize: inp.bool()?,
                    enabled: inp.bool()?,
                    ..Default::default()
                };
                ip.set_radiance_channel_scale(i, scale);
            }
            pipelines.push(ip);
        }
        film.set_image_pipelines(pipelines)?;

        film.set_halt_conditions(HaltConditions {
            halt_time: inp.f64()?,
            halt_spp: inp.f64()?,
            halt_threshold: inp.f32()?,
            halt_threshold_warmup: inp.u32()?,
            halt_threshold_step: inp.u32()?,
            halt_threshold_filter: inp.bool()?,
            halt_threshold_stop_rendering: inp.bool()?,
        });

        let total_sample_count = inp.f64()?;
        let convergence = inp.f32()?;
        let reported_convergence = inp.f32()?;

        film.init()?;
        film.set_sample_count(total_sample_count);
        film.set_convergence(convergence);
        film.reported_convergence.store(reported_convergence, Ordering::SeqCst);

        for _ in 0..film.buffers.len() {
            let bits = inp.u32()?;
            let kind = FilmChannels::from_bits(bits)
                .filter(|k| k.bits().count_ones() == 1)
                .ok_or_else(|| format!("Film::load(): bad channel kind {bits:#x}"))?;
            let buffers = film.channel_buffers(kind);
            let count = inp.usize()?;
            if count != buffers.len() {
                return Err(format!(
                    "Film::load(): {} has {count} buffers, expected {}",
                    kind.name(),
                    buffers.len()
                ));
            }
            for b in buffers.iter() {
                let len = inp.usize()?;
                if len != b.len() {
                    return Err(format!(
                        "Film::load(): {} buffer has {len} components, expected {}",
                        kind.name(),
                        b.len()
                    ));
                }
                for i in 0..len {
                    b.set_bits(i, inp.u32()?);
                }
            }
        }

        info!("Film loaded: {}x{}, {} samples", width, height, total_sample_count);
        Ok(film)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
