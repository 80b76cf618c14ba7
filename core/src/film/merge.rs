//! Film Merging

use super::{ChannelBuffer, Film, FilmChannels, MergePolicy, VarianceClamping};

/// Source and destination rectangles of a merge.
#[derive(Copy, Clone, Debug)]
struct MergeRect {
    src_x: usize,
    src_y: usize,
    width: usize,
    height: usize,
    dst_x: usize,
    dst_y: usize,
}

impl MergeRect {
    /// Returns `(dst_x, dst_y, src_x, src_y)` for every pixel of the rectangle.
    fn pixels(&self) -> impl Iterator<Item = (usize, usize, usize, usize)> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).map(move |x| (self.dst_x + x, self.dst_y + y, self.src_x + x, self.src_y + y))
        })
    }
}

impl Film {
    /// Adds a rectangle of another film into this one. Sample counters are
    /// summed and every channel kind both films have is merged with its
    /// merge policy; DEPTH is merged last so the depth test of the replaced
    /// kinds sees the destination depth before the merge.
    ///
    /// * `src`          - The film to add.
    /// * `src_offset_x` - Source rectangle x-offset.
    /// * `src_offset_y` - Source rectangle y-offset.
    /// * `src_width`    - Rectangle width.
    /// * `src_height`   - Rectangle height.
    /// * `dst_offset_x` - Destination x-offset.
    /// * `dst_offset_y` - Destination y-offset.
    #[allow(clippy::too_many_arguments)]
    pub fn add_film(
        &self,
        src: &Film,
        src_offset_x: usize,
        src_offset_y: usize,
        src_width: usize,
        src_height: usize,
        dst_offset_x: usize,
        dst_offset_y: usize,
    ) {
        let rect = MergeRect {
            src_x: src_offset_x,
            src_y: src_offset_y,
            width: src_width,
            height: src_height,
            dst_x: dst_offset_x,
            dst_y: dst_offset_y,
        };
        assert!(
            rect.src_x + rect.width <= src.width && rect.src_y + rect.height <= src.height,
            "add_film(): source rectangle outside the source film"
        );
        assert!(
            rect.dst_x + rect.width <= self.width && rect.dst_y + rect.height <= self.height,
            "add_film(): destination rectangle outside the film"
        );

        self.add_sample_count(src.get_total_sample_count());

        let common = self.channels & src.channels;
        let depth_test = common.contains(FilmChannels::DEPTH);

        for kind in common.kinds() {
            let dst_buffers = self.channel_buffers(kind);
            let src_buffers = src.channel_buffers(kind);

            match kind.policy().merge {
                MergePolicy::Add => {
                    for (d, s) in dst_buffers.iter().zip(src_buffers.iter()) {
                        rect.pixels().for_each(|(x, y, sx, sy)| d.add_pixel_from(x, y, s, sx, sy));
                    }
                }

                MergePolicy::ReplaceByDepth => {
                    let (d, s) = (&dst_buffers[0], &src_buffers[0]);
                    if depth_test {
                        let dst_depth = self.channel_buffers(FilmChannels::DEPTH)[0].as_float();
                        let src_depth = src.channel_buffers(FilmChannels::DEPTH)[0].as_float();
                        for (x, y, sx, sy) in rect.pixels() {
                            if src_depth.get_pixel::<1>(sx, sy)[0] < dst_depth.get_pixel::<1>(x, y)[0] {
                                d.set_pixel_from(x, y, s, sx, sy);
                            }
                        }
                    } else {
                        rect.pixels().for_each(|(x, y, sx, sy)| d.set_pixel_from(x, y, s, sx, sy));
                    }
                }

                MergePolicy::AddById => {
                    let multiplicity = kind.policy().multiplicity;
                    let dst_ids = self.ids_for(multiplicity).unwrap_or(&[]);
                    let src_ids = src.ids_for(multiplicity).unwrap_or(&[]);
                    for (d, id) in dst_buffers.iter().zip(dst_ids) {
                        if let Some(s) = src_ids.iter().position(|i| i == id).and_then(|j| src_buffers.get(j)) {
                            rect.pixels().for_each(|(x, y, sx, sy)| d.add_pixel_from(x, y, s, sx, sy));
                        }
                    }
                }

                MergePolicy::Min | MergePolicy::Skip => {}
            }
        }

        for kind in common.kinds().filter(|k| k.policy().merge == MergePolicy::Min) {
            let (d, s) = (&self.channel_buffers(kind)[0], &src.channel_buffers(kind)[0]);
            rect.pixels().for_each(|(x, y, sx, sy)| {
                d.min_pixel_from(x, y, s, sx, sy);
            });
        }
    }

    /// Adds the whole of another film of the same size.
    ///
    /// * `src` - The film to add.
    pub fn add_film_all(&self, src: &Film) {
        assert!(
            src.width == self.width && src.height == self.height,
            "add_film_all(): film sizes differ"
        );
        self.add_film(src, 0, 0, src.width, src.height, 0, 0);
    }

    /// Clamps the per pixel normalized radiance of a rectangle of `src`
    /// against the pixels of this film. `src` is modified in place. Does
    /// nothing unless both films have RADIANCE_PER_PIXEL_NORMALIZED.
    ///
    /// * `vc`           - The variance clamping.
    /// * `src`          - The film to clamp.
    /// * `src_offset_x` - Source rectangle x-offset.
    /// * `src_offset_y` - Source rectangle y-offset.
    /// * `src_width`    - Rectangle width.
    /// * `src_height`   - Rectangle height.
    /// * `dst_offset_x` - Destination x-offset.
    /// * `dst_offset_y` - Destination y-offset.
    #[allow(clippy::too_many_arguments)]
    pub fn variance_clamp_film(
        &self,
        vc: &VarianceClamping,
        src: &Film,
        src_offset_x: usize,
        src_offset_y: usize,
        src_width: usize,
        src_height: usize,
        dst_offset_x: usize,
        dst_offset_y: usize,
    ) {
        let kind = FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED;
        if !(self.has_channel(kind) && src.has_channel(kind)) || !vc.has_clamping() {
            return;
        }

        let rect = MergeRect {
            src_x: src_offset_x,
            src_y: src_offset_y,
            width: src_width,
            height: src_height,
            dst_x: dst_offset_x,
            dst_y: dst_offset_y,
        };

        for (d, s) in self.channel_buffers(kind).iter().zip(src.channel_buffers(kind).iter()) {
            let (d, s) = match (d, s) {
                (ChannelBuffer::Float(d), ChannelBuffer::Float(s)) => (d, s),
                _ => continue,
            };
            for (x, y, sx, sy) in rect.pixels() {
                let clamped = vc.clamp(d.get_pixel::<4>(x, y), s.get_pixel::<4>(sx, sy));
                s.set_pixel(sx, sy, clamped);
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::*;
    use crate::pbrt::*;
    use crate::spectrum::*;
    use crate::film::SampleResult;
    use proptest::prelude::*;

    const KINDS: [FilmChannels; 5] = [
        FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED,
        FilmChannels::DEPTH,
        FilmChannels::POSITION,
        FilmChannels::SAMPLECOUNT,
        FilmChannels::CONVERGENCE,
    ];

    fn film(w: usize, h: usize) -> Film {
        let mut film = Film::new(w, h, None).unwrap();
        for k in KINDS {
            film.add_channel(k, None).unwrap();
        }
        film.init().unwrap();
        film
    }

    fn splat(film: &Film, x: usize, y: usize, v: Float, depth: Float) {
        let mut sr = SampleResult::new(
            FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED | FilmChannels::DEPTH | FilmChannels::POSITION,
            1,
        );
        sr.radiance[0] = Spectrum::new(v);
        sr.depth = depth;
        sr.position = Point3f::new(depth, depth, depth);
        film.add_sample(x, y, &sr, 1.0);
        film.add_sample_count(1.0);
    }

    #[test]
    fn additive_kinds_add_and_depth_replaces_nearer() {
        let dst = film(2, 1);
        let src = film(2, 1);
        splat(&dst, 0, 0, 1.0, 5.0);
        splat(&dst, 1, 0, 1.0, 1.0);
        splat(&src, 0, 0, 3.0, 2.0);
        splat(&src, 1, 0, 3.0, 4.0);

        dst.add_film_all(&src);

        assert_eq!(dst.get_total_sample_count(), 4.0);
        let rad = dst.channel_buffer(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 0).unwrap().as_float();
        assert_eq!(rad.get_weighted_pixel::<3>(0, 0), [2.0; 3]);
        assert_eq!(rad.get_weight(1, 0), 2.0);

        let depth = dst.channel_buffer(FilmChannels::DEPTH, 0).unwrap().as_float();
        let pos = dst.channel_buffer(FilmChannels::POSITION, 0).unwrap().as_float();
        assert_eq!(depth.get_pixel::<1>(0, 0), [2.0]);
        assert_eq!(pos.get_pixel::<3>(0, 0), [2.0; 3]);
        assert_eq!(depth.get_pixel::<1>(1, 0), [1.0]);
        assert_eq!(pos.get_pixel::<3>(1, 0), [1.0; 3]);

        let n = dst.channel_buffer(FilmChannels::SAMPLECOUNT, 0).unwrap().as_uint();
        assert_eq!(n.get_pixel::<1>(0, 0), [2]);
    }

    #[test]
    fn convergence_is_not_merged() {
        let dst = film(1, 1);
        let src = film(1, 1);
        src.channel_buffer(FilmChannels::CONVERGENCE, 0)
            .unwrap()
            .as_float()
            .set_pixel(0, 0, [0.0]);
        dst.add_film_all(&src);
        let c = dst.channel_buffer(FilmChannels::CONVERGENCE, 0).unwrap().as_float();
        assert!(c.get_pixel::<1>(0, 0)[0].is_infinite());
    }

    #[test]
    fn sub_rectangle_with_offsets() {
        let dst = film(3, 3);
        let src = film(2, 2);
        splat(&src, 1, 1, 7.0, 1.0);
        dst.add_film(&src, 1, 1, 1, 1, 0, 2);
        let rad = dst.channel_buffer(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 0).unwrap().as_float();
        assert_eq!(rad.get_weighted_pixel::<3>(0, 2), [7.0; 3]);
        assert_eq!(rad.get_weight(1, 1), 0.0);
    }

    #[test]
    fn id_buffers_are_matched_by_id() {
        let mut dst = Film::new(1, 1, None).unwrap();
        dst.add_channel(FilmChannels::OBJECT_ID_MASK, Some(1)).unwrap();
        dst.add_channel(FilmChannels::OBJECT_ID_MASK, Some(2)).unwrap();
        dst.init().unwrap();
        let mut src = Film::new(1, 1, None).unwrap();
        src.add_channel(FilmChannels::OBJECT_ID_MASK, Some(2)).unwrap();
        src.init().unwrap();

        let mut sr = SampleResult::new(FilmChannels::OBJECT_ID, 1);
        sr.object_id = 2;
        src.add_sample(0, 0, &sr, 1.0);
        dst.add_film_all(&src);

        let m1 = dst.channel_buffer(FilmChannels::OBJECT_ID_MASK, 0).unwrap().as_float();
        let m2 = dst.channel_buffer(FilmChannels::OBJECT_ID_MASK, 1).unwrap().as_float();
        assert_eq!(m1.get_pixel::<2>(0, 0), [0.0, 0.0]);
        assert_eq!(m2.get_pixel::<2>(0, 0), [1.0, 1.0]);
    }

    #[test]
    fn variance_clamp_film_clamps_source() {
        let dst = film(1, 1);
        let src = film(1, 1);
        splat(&dst, 0, 0, 1.0, 1.0);
        splat(&src, 0, 0, 100.0, 1.0);
        dst.variance_clamp_film(&VarianceClamping::new(2.0), &src, 0, 0, 1, 1, 0, 0);
        let rad = src.channel_buffer(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 0).unwrap().as_float();
        assert_eq!(rad.get_pixel::<4>(0, 0), [3.0, 3.0, 3.0, 1.0]);
    }

    fn additive_bits(f: &Film) -> Vec<u32> {
        [FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, FilmChannels::SAMPLECOUNT]
            .iter()
            .flat_map(|k| f.channel_buffer(*k, 0).unwrap().bits().collect::<Vec<_>>())
            .collect()
    }

    proptest! {
        #[test]
        fn add_film_is_commutative_for_additive_kinds(
            a in prop::collection::vec((0usize..2, 0usize..2, 0u32..8), 0..12),
            b in prop::collection::vec((0usize..2, 0usize..2, 0u32..8), 0..12),
        ) {
            // Small integer radiance keeps float sums exact.
            let fa = film(2, 2);
            let fb = film(2, 2);
            a.iter().for_each(|(x, y, v)| splat(&fa, *x, *y, *v as Float, 1.0));
            b.iter().for_each(|(x, y, v)| splat(&fb, *x, *y, *v as Float, 1.0));

            let ab = film(2, 2);
            ab.add_film_all(&fa);
            ab.add_film_all(&fb);
            let ba = film(2, 2);
            ba.add_film_all(&fb);
            ba.add_film_all(&fa);

            prop_assert_eq!(additive_bits(&ab), additive_bits(&ba));
            prop_assert_eq!(ab.get_total_sample_count(), ba.get_total_sample_count());
        }

        #[test]
        fn add_film_is_associative_over_overlapping_windows(
            a in prop::collection::vec((0usize..3, 0usize..3, 0u32..8), 0..12),
            b in prop::collection::vec((0usize..3, 0usize..3, 0u32..8), 0..12),
            c in prop::collection::vec((0usize..3, 0usize..3, 0u32..8), 0..12),
            (x0, y0) in (0usize..3, 0usize..3),
            (w, h) in (1usize..4, 1usize..4),
        ) {
            let (w, h) = (w.min(3 - x0), h.min(3 - y0));
            let fa = film(3, 3);
            let fb = film(3, 3);
            let fc = film(3, 3);
            a.iter().for_each(|(x, y, v)| splat(&fa, *x, *y, *v as Float, *v as Float + 1.0));
            b.iter().for_each(|(x, y, v)| splat(&fb, *x, *y, *v as Float, *v as Float + 1.0));
            c.iter().for_each(|(x, y, v)| splat(&fc, *x, *y, *v as Float, *v as Float + 1.0));

            // (A + B) + C
            let left = film(3, 3);
            left.add_film_all(&fa);
            left.add_film(&fb, x0, y0, w, h, x0, y0);
            left.add_film(&fc, x0, y0, w, h, x0, y0);

            // A + (B + C)
            let bc = film(3, 3);
            bc.add_film_all(&fb);
            bc.add_film(&fc, x0, y0, w, h, x0, y0);
            let right = film(3, 3);
            right.add_film_all(&fa);
            right.add_film(&bc, x0, y0, w, h, x0, y0);

            let depth_bits = |f: &Film| {
                f.channel_buffer(FilmChannels::DEPTH, 0).unwrap().bits().collect::<Vec<_>>()
            };
            prop_assert_eq!(additive_bits(&left), additive_bits(&right));
            prop_assert_eq!(depth_bits(&left), depth_bits(&right));
            prop_assert_eq!(left.get_total_sample_count(), right.get_total_sample_count());
        }
    }
}
