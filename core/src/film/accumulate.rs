//! Sample Accumulation

use super::{
    ChannelRole, Film, FilmChannels, GenericFrameBuffer, IdSource, PixelComponent, SampleResult, SampleRoute,
    SampleValue, FILM_DROPPED_CONTRIBUTIONS,
};
use crate::pbrt::*;
use crate::stat_inc;
use std::sync::atomic::Ordering;

/// How accumulation writes reach the channel buffers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Access {
    /// The caller owns the pixel; plain loads and stores.
    Exclusive,

    /// Other threads may write the same pixel; compare-and-swap updates.
    Atomic,
}

impl Access {
    fn add<T: PixelComponent, const N: usize>(self, b: &GenericFrameBuffer<T>, x: usize, y: usize, v: [T; N]) {
        match self {
            Self::Exclusive => b.add_pixel(x, y, v),
            Self::Atomic => b.atomic_add_pixel(x, y, v),
        }
    }

    fn set<T: PixelComponent, const N: usize>(self, b: &GenericFrameBuffer<T>, x: usize, y: usize, v: [T; N]) {
        match self {
            Self::Exclusive => b.set_pixel(x, y, v),
            Self::Atomic => b.atomic_set_pixel(x, y, v),
        }
    }

    fn min<T: PixelComponent>(self, b: &GenericFrameBuffer<T>, x: usize, y: usize, v: T) -> bool {
        match self {
            Self::Exclusive => b.min_pixel(x, y, v),
            Self::Atomic => b.atomic_min_pixel(x, y, v),
        }
    }

    fn add_weighted<const N: usize>(
        self,
        b: &GenericFrameBuffer<Float>,
        x: usize,
        y: usize,
        v: [Float; N],
        weight: Float,
    ) {
        match self {
            Self::Exclusive => b.add_weighted_pixel(x, y, v, weight),
            Self::Atomic => b.atomic_add_weighted_pixel(x, y, v, weight),
        }
    }
}

impl IdSource {
    /// Returns the sample field holding the ID.
    fn channel(&self) -> FilmChannels {
        match self {
            Self::Material => FilmChannels::MATERIAL_ID,
            Self::Object => FilmChannels::OBJECT_ID,
        }
    }

    /// Returns the ID of a sample.
    fn id(&self, sr: &SampleResult) -> u32 {
        match self {
            Self::Material => sr.material_id,
            Self::Object => sr.object_id,
        }
    }
}

impl Film {
    /// Accumulates a sample into a pixel the calling thread owns
    /// exclusively. Single threaded it produces the same buffers as
    /// `atomic_add_sample()`.
    ///
    /// * `x`      - Pixel x-coordinate.
    /// * `y`      - Pixel y-coordinate.
    /// * `sr`     - The sample.
    /// * `weight` - Filter weight.
    pub fn add_sample(&self, x: usize, y: usize, sr: &SampleResult, weight: Float) {
        self.accumulate(Access::Exclusive, x, y, sr, weight);
    }

    /// Accumulates a sample into a pixel other threads may write at the same
    /// time.
    ///
    /// * `x`      - Pixel x-coordinate.
    /// * `y`      - Pixel y-coordinate.
    /// * `sr`     - The sample.
    /// * `weight` - Filter weight.
    pub fn atomic_add_sample(&self, x: usize, y: usize, sr: &SampleResult, weight: Float) {
        self.accumulate(Access::Atomic, x, y, sr, weight);
    }

    fn accumulate(&self, access: Access, x: usize, y: usize, sr: &SampleResult, weight: Float) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside the {}x{} film",
            self.width,
            self.height
        );

        self.accumulate_color(access, x, y, sr, weight);
        if self.has_data_channel {
            self.accumulate_data(access, x, y, sr);
        }
    }

    /// Colour part: radiance, alpha and composing channels.
    fn accumulate_color(&self, access: Access, x: usize, y: usize, sr: &SampleResult, weight: Float) {
        let groups = self.radiance_group_count.min(sr.radiance.len());

        for kind in self.channels.kinds() {
            let policy = kind.policy();
            if policy.role == ChannelRole::Composing && !self.has_composing_channel {
                continue;
            }

            match policy.route {
                SampleRoute::RadiancePerPixel if sr.has_channel(kind) => {
                    for (i, b) in self.channel_buffers(kind).iter().take(groups).enumerate() {
                        let r = &sr.radiance[i];
                        if r.is_nan_or_inf() {
                            self.drop_contribution(x, y, i);
                        } else {
                            access.add_weighted(b.as_float(), x, y, r.to_rgb(), weight);
                        }
                    }
                }

                SampleRoute::RadiancePerScreen if sr.has_channel(kind) => {
                    for (i, b) in self.channel_buffers(kind).iter().take(groups).enumerate() {
                        let r = &sr.radiance[i];
                        if r.is_nan_or_inf() {
                            self.drop_contribution(x, y, i);
                        } else {
                            access.add(b.as_float(), x, y, (*r * weight).to_rgb());
                        }
                    }
                }

                SampleRoute::Weighted if sr.has_channel(kind) => {
                    let b = self.channel_buffers(kind)[0].as_float();
                    match sr.value(kind) {
                        Some(SampleValue::Scalar(v)) => access.add_weighted(b, x, y, [v], weight),
                        Some(SampleValue::Pair(v)) => access.add_weighted(b, x, y, v, weight),
                        Some(SampleValue::Triple(v)) => access.add_weighted(b, x, y, v, weight),
                        _ => {}
                    }
                }

                SampleRoute::IdMask(source) if sr.has_channel(source.channel()) => {
                    let id = source.id(sr);
                    let ids = self.ids_for(policy.multiplicity).unwrap_or(&[]);
                    for (b, mask_id) in self.channel_buffers(kind).iter().zip(ids) {
                        let v = if id == *mask_id { weight } else { 0.0 };
                        access.add(b.as_float(), x, y, [v, weight]);
                    }
                }

                SampleRoute::ById(source)
                    if sr.has_channel(source.channel())
                        && sr.has_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED)
                        && self.has_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED) =>
                {
                    let id = source.id(sr);
                    let c = sr.merged_finite_radiance(groups).to_rgb();
                    let ids = self.ids_for(policy.multiplicity).unwrap_or(&[]);
                    for (b, by_id) in self.channel_buffers(kind).iter().zip(ids) {
                        let v = if id == *by_id { c } else { [0.0; 3] };
                        access.add_weighted(b.as_float(), x, y, v, weight);
                    }
                }

                _ => {}
            }
        }
    }

    /// Data part: depth test, depth gated overwrites and counters.
    fn accumulate_data(&self, access: Access, x: usize, y: usize, sr: &SampleResult) {
        let mut depth_write = true;
        if self.has_channel(FilmChannels::DEPTH) && sr.has_channel(FilmChannels::DEPTH) {
            let b = self.channel_buffers(FilmChannels::DEPTH)[0].as_float();
            depth_write = access.min(b, x, y, sr.depth);
        }

        for kind in self.channels.kinds() {
            let route = kind.policy().route;
            match route {
                SampleRoute::DepthGated if depth_write && sr.has_channel(kind) => {
                    let b = &self.channel_buffers(kind)[0];
                    match sr.value(kind) {
                        Some(SampleValue::Scalar(v)) => access.set(b.as_float(), x, y, [v]),
                        Some(SampleValue::Pair(v)) => access.set(b.as_float(), x, y, v),
                        Some(SampleValue::Triple(v)) => access.set(b.as_float(), x, y, v),
                        Some(SampleValue::Id(id)) if kind != FilmChannels::OBJECT_ID || id != u32::MAX => {
                            access.set(b.as_uint(), x, y, [id])
                        }
                        _ => {}
                    }
                }

                SampleRoute::Add if sr.has_channel(kind) => {
                    if let Some(SampleValue::Scalar(v)) = sr.value(kind) {
                        access.add(self.channel_buffers(kind)[0].as_float(), x, y, [v]);
                    }
                }

                SampleRoute::Count => access.add(self.channel_buffers(kind)[0].as_uint(), x, y, [1]),

                _ => {}
            }
        }
    }

    fn drop_contribution(&self, x: usize, y: usize, group: usize) {
        stat_inc!(FILM_DROPPED_CONTRIBUTIONS, 1);
        debug!("Film: non-finite radiance in group {group} at pixel ({x}, {y}) dropped");
    }

    /// Adds to the total sample count.
    ///
    /// * `count` - Number of samples.
    pub fn add_sample_count(&self, count: f64) {
        self.total_sample_count.add(count);
    }

    /// Sets the total sample count.
    ///
    /// * `count` - Number of samples.
    pub fn set_sample_count(&self, count: f64) {
        self.total_sample_count.store(count, Ordering::SeqCst);
    }

    /// Returns the number of samples accumulated since the last clear.
    pub fn get_total_sample_count(&self) -> f64 {
        self.total_sample_count.load(Ordering::SeqCst)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::*;
    use crate::spectrum::*;
    use float_cmp::approx_eq;
    use proptest::prelude::*;
    use std::thread;

    fn film(w: usize, h: usize, kinds: &[FilmChannels]) -> Film {
        let mut film = Film::new(w, h, None).unwrap();
        for k in kinds {
            film.add_channel(*k, None).unwrap();
        }
        film.init().unwrap();
        film
    }

    fn radiance_sample(v: Float) -> SampleResult {
        let mut sr = SampleResult::new(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 1);
        sr.radiance[0] = Spectrum::new(v);
        sr
    }

    #[test]
    fn weighted_average_read_back() {
        let f = film(2, 2, &[FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED]);
        f.add_sample(1, 1, &radiance_sample(1.0), 1.0);
        f.add_sample(1, 1, &radiance_sample(4.0), 3.0);
        let b = f.channel_buffer(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 0).unwrap().as_float();
        let c = b.get_weighted_pixel::<3>(1, 1);
        assert!(approx_eq!(Float, c[0], 3.25));
        assert_eq!(b.get_weight(1, 1), 4.0);
        assert_eq!(b.get_weighted_pixel::<3>(0, 0), [0.0; 3]);
    }

    #[test]
    fn per_screen_radiance_adds_scaled_value() {
        let f = film(1, 1, &[FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED]);
        let mut sr = SampleResult::new(FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED, 1);
        sr.radiance[0] = Spectrum::from_rgb(1.0, 2.0, 3.0);
        f.add_sample(0, 0, &sr, 0.5);
        let b = f.channel_buffer(FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED, 0).unwrap().as_float();
        assert_eq!(b.get_pixel::<3>(0, 0), [0.5, 1.0, 1.5]);
    }

    #[test]
    fn non_finite_radiance_is_dropped_but_counted() {
        let f = film(
            1,
            1,
            &[FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, FilmChannels::SAMPLECOUNT],
        );
        f.add_sample(0, 0, &radiance_sample(2.0), 1.0);
        f.add_sample(0, 0, &radiance_sample(Float::NAN), 1.0);
        f.add_sample(0, 0, &radiance_sample(INFINITY), 1.0);

        let b = f.channel_buffer(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 0).unwrap().as_float();
        assert_eq!(b.get_pixel::<4>(0, 0), [2.0, 2.0, 2.0, 1.0]);
        let n = f.channel_buffer(FilmChannels::SAMPLECOUNT, 0).unwrap().as_uint();
        assert_eq!(n.get_pixel::<1>(0, 0), [3]);
    }

    #[test]
    fn only_finite_groups_are_dropped() {
        let mut f = Film::new(1, 1, None).unwrap();
        f.set_radiance_group_count(2).unwrap();
        f.add_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, None).unwrap();
        f.init().unwrap();

        let mut sr = SampleResult::new(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 2);
        sr.radiance[0] = Spectrum::new(Float::NAN);
        sr.radiance[1] = Spectrum::new(1.0);
        f.add_sample(0, 0, &sr, 1.0);

        let g0 = f.channel_buffer(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 0).unwrap().as_float();
        let g1 = f.channel_buffer(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 1).unwrap().as_float();
        assert_eq!(g0.get_weight(0, 0), 0.0);
        assert_eq!(g1.get_weight(0, 0), 1.0);
    }

    fn depth_sample(depth: Float, id: u32) -> SampleResult {
        let mut sr = SampleResult::new(
            FilmChannels::DEPTH | FilmChannels::POSITION | FilmChannels::MATERIAL_ID | FilmChannels::UV,
            1,
        );
        sr.depth = depth;
        sr.position = Point3f::new(depth, 0.0, 0.0);
        sr.material_id = id;
        sr.uv = Point2f::new(depth, depth);
        sr
    }

    #[test]
    fn depth_gated_nearest_wins_in_either_order() {
        let kinds = [
            FilmChannels::DEPTH,
            FilmChannels::POSITION,
            FilmChannels::MATERIAL_ID,
            FilmChannels::UV,
        ];
        for order in [[1.0, 5.0], [5.0, 1.0]] {
            let f = film(1, 1, &kinds);
            for d in order {
                f.add_sample(0, 0, &depth_sample(d, d as u32), 1.0);
            }
            let depth = f.channel_buffer(FilmChannels::DEPTH, 0).unwrap().as_float();
            let pos = f.channel_buffer(FilmChannels::POSITION, 0).unwrap().as_float();
            let id = f.channel_buffer(FilmChannels::MATERIAL_ID, 0).unwrap().as_uint();
            let uv = f.channel_buffer(FilmChannels::UV, 0).unwrap().as_float();
            assert_eq!(depth.get_pixel::<1>(0, 0), [1.0]);
            assert_eq!(pos.get_pixel::<3>(0, 0), [1.0, 0.0, 0.0]);
            assert_eq!(id.get_pixel::<1>(0, 0), [1]);
            assert_eq!(uv.get_pixel::<2>(0, 0), [1.0, 1.0]);
        }
    }

    #[test]
    fn object_id_not_written_when_unset() {
        let f = film(1, 1, &[FilmChannels::OBJECT_ID]);
        let mut sr = SampleResult::new(FilmChannels::OBJECT_ID, 1);
        sr.object_id = 4;
        f.add_sample(0, 0, &sr, 1.0);
        sr.object_id = u32::MAX;
        f.add_sample(0, 0, &sr, 1.0);
        let b = f.channel_buffer(FilmChannels::OBJECT_ID, 0).unwrap().as_uint();
        assert_eq!(b.get_pixel::<1>(0, 0), [4]);
    }

    #[test]
    fn mask_and_by_id_channels() {
        let mut f = Film::new(1, 1, None).unwrap();
        f.add_channel(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, None).unwrap();
        f.add_channel(FilmChannels::MATERIAL_ID_MASK, Some(3)).unwrap();
        f.add_channel(FilmChannels::MATERIAL_ID_MASK, Some(8)).unwrap();
        f.add_channel(FilmChannels::BY_MATERIAL_ID, Some(3)).unwrap();
        f.init().unwrap();

        let mut sr = SampleResult::new(
            FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED | FilmChannels::MATERIAL_ID,
            1,
        );
        sr.radiance[0] = Spectrum::new(2.0);
        sr.material_id = 3;
        f.add_sample(0, 0, &sr, 1.0);
        sr.material_id = 8;
        f.add_sample(0, 0, &sr, 1.0);

        let m3 = f.channel_buffer(FilmChannels::MATERIAL_ID_MASK, 0).unwrap().as_float();
        let m8 = f.channel_buffer(FilmChannels::MATERIAL_ID_MASK, 1).unwrap().as_float();
        assert_eq!(m3.get_pixel::<2>(0, 0), [1.0, 2.0]);
        assert_eq!(m8.get_pixel::<2>(0, 0), [1.0, 2.0]);

        let by3 = f.channel_buffer(FilmChannels::BY_MATERIAL_ID, 0).unwrap().as_float();
        assert_eq!(by3.get_pixel::<4>(0, 0), [2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn composing_and_counter_channels() {
        let f = film(
            1,
            1,
            &[
                FilmChannels::ALBEDO,
                FilmChannels::MATERIAL_ID_COLOR,
                FilmChannels::AVG_SHADING_NORMAL,
                FilmChannels::DIRECT_SHADOW_MASK,
                FilmChannels::RAYCOUNT,
                FilmChannels::ALPHA,
            ],
        );
        let mut sr = SampleResult::new(
            FilmChannels::ALBEDO
                | FilmChannels::MATERIAL_ID_COLOR
                | FilmChannels::AVG_SHADING_NORMAL
                | FilmChannels::DIRECT_SHADOW_MASK
                | FilmChannels::RAYCOUNT
                | FilmChannels::ALPHA,
            1,
        );
        sr.albedo = Spectrum::from_rgb(0.5, 0.25, 1.0);
        sr.material_id = 0x0000_ff00;
        sr.shading_normal = Normal3f::new(0.0, 0.0, 1.0);
        sr.direct_shadow_mask = 1.0;
        sr.ray_count = 3.0;
        sr.alpha = 0.5;
        f.add_sample(0, 0, &sr, 2.0);
        f.atomic_add_sample(0, 0, &sr, 2.0);

        let get = |k| f.channel_buffer(k, 0).unwrap().as_float();
        assert_eq!(get(FilmChannels::ALBEDO).get_weighted_pixel::<3>(0, 0), [0.5, 0.25, 1.0]);
        assert_eq!(
            get(FilmChannels::MATERIAL_ID_COLOR).get_weighted_pixel::<3>(0, 0),
            [0.0, 1.0, 0.0]
        );
        assert_eq!(
            get(FilmChannels::AVG_SHADING_NORMAL).get_weighted_pixel::<3>(0, 0),
            [0.0, 0.0, 1.0]
        );
        assert_eq!(get(FilmChannels::DIRECT_SHADOW_MASK).get_pixel::<2>(0, 0), [4.0, 4.0]);
        assert_eq!(get(FilmChannels::RAYCOUNT).get_pixel::<1>(0, 0), [6.0]);
        assert_eq!(get(FilmChannels::ALPHA).get_weighted_pixel::<1>(0, 0), [0.5]);
    }

    #[test]
    fn material_color_and_avg_normal_follow_their_own_sample_bits() {
        let kinds = [FilmChannels::MATERIAL_ID_COLOR, FilmChannels::AVG_SHADING_NORMAL];
        for atomic in [false, true] {
            let f = film(1, 1, &kinds);
            let add = |sr: &SampleResult| {
                if atomic {
                    f.atomic_add_sample(0, 0, sr, 1.0);
                } else {
                    f.add_sample(0, 0, sr, 1.0);
                }
            };

            // Only the ID and normal fields: nothing reaches the composing channels.
            let mut sr = SampleResult::new(FilmChannels::MATERIAL_ID | FilmChannels::SHADING_NORMAL, 1);
            sr.material_id = 0xff;
            sr.shading_normal = Normal3f::new(0.0, 1.0, 0.0);
            add(&sr);

            let color = f.channel_buffer(FilmChannels::MATERIAL_ID_COLOR, 0).unwrap().as_float();
            let normal = f.channel_buffer(FilmChannels::AVG_SHADING_NORMAL, 0).unwrap().as_float();
            assert_eq!(color.get_pixel::<4>(0, 0), [0.0; 4]);
            assert_eq!(normal.get_pixel::<4>(0, 0), [0.0; 4]);

            // The composing bits alone are enough.
            let mut sr = SampleResult::new(kinds[0] | kinds[1], 1);
            sr.material_id = 0xff;
            sr.shading_normal = Normal3f::new(0.0, 1.0, 0.0);
            add(&sr);
            assert_eq!(color.get_pixel::<4>(0, 0), [1.0, 0.0, 0.0, 1.0]);
            assert_eq!(normal.get_pixel::<4>(0, 0), [0.0, 1.0, 0.0, 1.0]);
        }
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_pixel_panics() {
        let f = film(2, 2, &[FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED]);
        f.add_sample(2, 0, &radiance_sample(1.0), 1.0);
    }

    #[test]
    fn two_threads_on_disjoint_regions() {
        // 4x4 film, one thread per half, 10 samples of value 1 per pixel.
        let f = film(
            4,
            4,
            &[FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, FilmChannels::SAMPLECOUNT],
        );
        thread::scope(|s| {
            for half in 0..2 {
                let f = &f;
                s.spawn(move || {
                    let sr = radiance_sample(1.0);
                    for y in half * 2..half * 2 + 2 {
                        for x in 0..4 {
                            for _ in 0..10 {
                                f.add_sample(x, y, &sr, 1.0);
                            }
                        }
                    }
                    f.add_sample_count(80.0);
                });
            }
        });

        assert_eq!(f.get_total_sample_count(), 160.0);
        let b = f.channel_buffer(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 0).unwrap().as_float();
        let n = f.channel_buffer(FilmChannels::SAMPLECOUNT, 0).unwrap().as_uint();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(b.get_weighted_pixel::<3>(x, y), [1.0; 3]);
                assert_eq!(b.get_weight(x, y), 10.0);
                assert_eq!(n.get_pixel::<1>(x, y), [10]);
            }
        }
    }

    #[test]
    fn two_threads_on_separate_pixels_leave_the_rest_untouched() {
        let f = film(4, 4, &[FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED]);
        thread::scope(|s| {
            let f = &f;
            s.spawn(move || {
                let sr = radiance_sample(1.0);
                f.atomic_add_sample(0, 0, &sr, 1.0);
                f.atomic_add_sample(0, 0, &sr, 1.0);
            });
            s.spawn(move || {
                let mut sr = radiance_sample(0.0);
                sr.radiance[0] = Spectrum::from_rgb(2.0, 0.0, 0.0);
                f.atomic_add_sample(0, 3, &sr, 0.5);
            });
        });

        let b = f.channel_buffer(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 0).unwrap().as_float();
        for y in 0..4 {
            for x in 0..4 {
                let expected = match (x, y) {
                    (0, 0) => [2.0, 2.0, 2.0, 2.0],
                    (0, 3) => [1.0, 0.0, 0.0, 0.5],
                    _ => [0.0; 4],
                };
                assert_eq!(b.get_pixel::<4>(x, y), expected);
            }
        }
    }

    #[test]
    fn shared_frame_threads_do_not_lose_updates() {
        let f = film(
            1,
            1,
            &[FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, FilmChannels::SAMPLECOUNT],
        );
        thread::scope(|s| {
            for _ in 0..4 {
                let f = &f;
                s.spawn(move || {
                    let sr = radiance_sample(1.0);
                    for _ in 0..1000 {
                        f.atomic_add_sample(0, 0, &sr, 1.0);
                    }
                });
            }
        });
        let b = f.channel_buffer(FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED, 0).unwrap().as_float();
        assert_eq!(b.get_weight(0, 0), 4000.0);
        let n = f.channel_buffer(FilmChannels::SAMPLECOUNT, 0).unwrap().as_uint();
        assert_eq!(n.get_pixel::<1>(0, 0), [4000]);
    }

    proptest! {
        #[test]
        fn atomic_and_exclusive_paths_match(
            samples in prop::collection::vec((0usize..3, 0usize..3, 0.0f32..10.0, 0.1f32..2.0, 0.0f32..100.0), 1..40)
        ) {
            let kinds = [
                FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED,
                FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED,
                FilmChannels::DEPTH,
                FilmChannels::POSITION,
                FilmChannels::SAMPLECOUNT,
            ];
            let a = film(3, 3, &kinds);
            let b = film(3, 3, &kinds);
            for (x, y, v, w, d) in samples {
                let mut sr = SampleResult::new(
                    FilmChannels::RADIANCE_PER_PIXEL_NORMALIZED
                        | FilmChannels::RADIANCE_PER_SCREEN_NORMALIZED
                        | FilmChannels::DEPTH
                        | FilmChannels::POSITION,
                    1,
                );
                sr.radiance[0] = Spectrum::new(v);
                sr.depth = d;
                sr.position = Point3f::new(d, v, w);
                a.add_sample(x, y, &sr, w);
                b.atomic_add_sample(x, y, &sr, w);
            }
            for k in kinds {
                let ba: Vec<u32> = a.channel_buffer(k, 0).unwrap().bits().collect();
                let bb: Vec<u32> = b.channel_buffer(k, 0).unwrap().bits().collect();
                prop_assert_eq!(ba, bb);
            }
        }
    }
}
