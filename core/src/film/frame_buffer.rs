//! Frame Buffers

use super::ChannelFill;
use crate::parallel::AtomicFloat;
use crate::pbrt::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// Component types storable in a `GenericFrameBuffer`. Every component lives
/// in its own atomic cell so the same buffer serves exclusive-region writers
/// (relaxed load/store) and shared-frame writers (compare-and-swap).
pub trait PixelComponent: Copy + Default + PartialOrd + Send + Sync + 'static {
    /// Storage cell.
    type Cell: Send + Sync;

    /// Returns a new cell.
    fn new_cell(v: Self) -> Self::Cell;

    /// Relaxed load.
    fn load(cell: &Self::Cell) -> Self;

    /// Relaxed store.
    fn store(cell: &Self::Cell, v: Self);

    /// Sequentially consistent store.
    fn atomic_store(cell: &Self::Cell, v: Self);

    /// Lost-update-free add.
    fn atomic_add(cell: &Self::Cell, v: Self);

    /// Lost-update-free min. Returns true if `v` replaced the stored value.
    fn atomic_min(cell: &Self::Cell, v: Self) -> bool;

    /// Returns `a + b`.
    fn sum(a: Self, b: Self) -> Self;

    /// Returns the component's bit pattern.
    fn to_bits(self) -> u32;

    /// Returns the component for a bit pattern.
    fn from_bits(bits: u32) -> Self;

    /// Converts a fill value.
    fn from_fill(fill: ChannelFill) -> Self;
}

impl PixelComponent for Float {
    type Cell = AtomicFloat;

    fn new_cell(v: Self) -> Self::Cell {
        AtomicFloat::new(v)
    }

    fn load(cell: &Self::Cell) -> Self {
        cell.load(Ordering::Relaxed)
    }

    fn store(cell: &Self::Cell, v: Self) {
        cell.store(v, Ordering::Relaxed)
    }

    fn atomic_store(cell: &Self::Cell, v: Self) {
        cell.store(v, Ordering::SeqCst)
    }

    fn atomic_add(cell: &Self::Cell, v: Self) {
        cell.add(v)
    }

    fn atomic_min(cell: &Self::Cell, v: Self) -> bool {
        cell.min(v)
    }

    fn sum(a: Self, b: Self) -> Self {
        a + b
    }

    fn to_bits(self) -> u32 {
        Float::to_bits(self)
    }

    fn from_bits(bits: u32) -> Self {
        Float::from_bits(bits)
    }

    fn from_fill(fill: ChannelFill) -> Self {
        fill.as_float()
    }
}

impl PixelComponent for u32 {
    type Cell = AtomicU32;

    fn new_cell(v: Self) -> Self::Cell {
        AtomicU32::new(v)
    }

    fn load(cell: &Self::Cell) -> Self {
        cell.load(Ordering::Relaxed)
    }

    fn store(cell: &Self::Cell, v: Self) {
        cell.store(v, Ordering::Relaxed)
    }

    fn atomic_store(cell: &Self::Cell, v: Self) {
        cell.store(v, Ordering::SeqCst)
    }

    fn atomic_add(cell: &Self::Cell, v: Self) {
        cell.fetch_add(v, Ordering::SeqCst);
    }

    fn atomic_min(cell: &Self::Cell, v: Self) -> bool {
        v < cell.fetch_min(v, Ordering::SeqCst)
    }

    fn sum(a: Self, b: Self) -> Self {
        a.wrapping_add(b)
    }

    fn to_bits(self) -> u32 {
        self
    }

    fn from_bits(bits: u32) -> Self {
        bits
    }

    fn from_fill(fill: ChannelFill) -> Self {
        fill.as_uint()
    }
}

/// A 2D grid of pixels with a fixed number of components per pixel. When
/// `weight_channels` is 1 the last component accumulates sample weights and
/// the others accumulate `value * weight`.
pub struct GenericFrameBuffer<T: PixelComponent> {
    /// Width in pixels.
    width: usize,

    /// Height in pixels.
    height: usize,

    /// Components per pixel including the weight.
    channels: usize,

    /// Number of trailing weight components (0 or 1).
    weight_channels: usize,

    /// Pixel components in row major order.
    pixels: Vec<T::Cell>,
}

impl<T: PixelComponent> GenericFrameBuffer<T> {
    /// Create a new `GenericFrameBuffer`.
    ///
    /// * `channels`        - Components per pixel including the weight.
    /// * `weight_channels` - Number of trailing weight components.
    /// * `width`           - Width in pixels.
    /// * `height`          - Height in pixels.
    /// * `fill`            - Initial component value.
    pub fn new(channels: usize, weight_channels: usize, width: usize, height: usize, fill: T) -> Self {
        assert!(channels > 0 && weight_channels < channels);
        let n = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .unwrap_or_else(|| panic!("{width}x{height} frame buffer with {channels} channels is too large"));
        Self {
            width,
            height,
            channels,
            weight_channels,
            pixels: (0..n).map(|_| T::new_cell(fill)).collect(),
        }
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of components per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the number of trailing weight components.
    pub fn weight_channels(&self) -> usize {
        self.weight_channels
    }

    /// Returns the number of stored components.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns true if the buffer has no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns the allocated memory in bytes.
    pub fn memory_size(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<T::Cell>()
    }

    /// Returns the offset of a pixel's first component.
    ///
    /// * `x` - Pixel x-coordinate.
    /// * `y` - Pixel y-coordinate.
    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} buffer",
            self.width,
            self.height
        );
        (x + y * self.width) * self.channels
    }

    /// Sets every component to `fill`.
    ///
    /// * `fill` - The value.
    pub fn clear(&self, fill: T) {
        self.pixels.iter().for_each(|c| T::store(c, fill));
    }

    /// Returns the raw components of a pixel.
    ///
    /// * `x` - Pixel x-coordinate.
    /// * `y` - Pixel y-coordinate.
    pub fn get_pixel<const N: usize>(&self, x: usize, y: usize) -> [T; N] {
        assert_eq!(N, self.channels);
        let o = self.offset(x, y);
        let mut v = [T::default(); N];
        for (i, c) in v.iter_mut().enumerate() {
            *c = T::load(&self.pixels[o + i]);
        }
        v
    }

    /// Returns the raw components of a pixel given its index `x + y * width`.
    ///
    /// * `index` - Pixel index.
    pub fn get_pixel_by_index<const N: usize>(&self, index: usize) -> [T; N] {
        self.get_pixel(index % self.width, index / self.width)
    }

    /// Overwrites a pixel.
    ///
    /// * `x` - Pixel x-coordinate.
    /// * `y` - Pixel y-coordinate.
    /// * `v` - Components.
    pub fn set_pixel<const N: usize>(&self, x: usize, y: usize, v: [T; N]) {
        assert_eq!(N, self.channels);
        let o = self.offset(x, y);
        for (i, c) in v.into_iter().enumerate() {
            T::store(&self.pixels[o + i], c);
        }
    }

    /// Overwrites a pixel; each component store is atomic.
    pub fn atomic_set_pixel<const N: usize>(&self, x: usize, y: usize, v: [T; N]) {
        assert_eq!(N, self.channels);
        let o = self.offset(x, y);
        for (i, c) in v.into_iter().enumerate() {
            T::atomic_store(&self.pixels[o + i], c);
        }
    }

    /// Adds the components to a pixel.
    ///
    /// * `x` - Pixel x-coordinate.
    /// * `y` - Pixel y-coordinate.
    /// * `v` - Components.
    pub fn add_pixel<const N: usize>(&self, x: usize, y: usize, v: [T; N]) {
        assert_eq!(N, self.channels);
        let o = self.offset(x, y);
        for (i, c) in v.into_iter().enumerate() {
            let cell = &self.pixels[o + i];
            T::store(cell, T::sum(T::load(cell), c));
        }
    }

    /// Adds the components to a pixel with compare-and-swap.
    pub fn atomic_add_pixel<const N: usize>(&self, x: usize, y: usize, v: [T; N]) {
        assert_eq!(N, self.channels);
        let o = self.offset(x, y);
        for (i, c) in v.into_iter().enumerate() {
            T::atomic_add(&self.pixels[o + i], c);
        }
    }

    /// Replaces a single component pixel if `v` is strictly smaller. Returns
    /// true if the pixel was replaced.
    ///
    /// * `x` - Pixel x-coordinate.
    /// * `y` - Pixel y-coordinate.
    /// * `v` - The candidate value.
    pub fn min_pixel(&self, x: usize, y: usize, v: T) -> bool {
        assert_eq!(self.channels, 1);
        let cell = &self.pixels[self.offset(x, y)];
        if v < T::load(cell) {
            T::store(cell, v);
            true
        } else {
            false
        }
    }

    /// Replaces a single component pixel with compare-and-swap if `v` is strictly smaller.
    pub fn atomic_min_pixel(&self, x: usize, y: usize, v: T) -> bool {
        assert_eq!(self.channels, 1);
        T::atomic_min(&self.pixels[self.offset(x, y)], v)
    }

    /// Adds the components of a pixel of `src` to a pixel of this buffer.
    /// Both buffers must have the same shape.
    ///
    /// * `x`   - Destination x-coordinate.
    /// * `y`   - Destination y-coordinate.
    /// * `src` - Source buffer.
    /// * `sx`  - Source x-coordinate.
    /// * `sy`  - Source y-coordinate.
    pub fn add_pixel_from(&self, x: usize, y: usize, src: &Self, sx: usize, sy: usize) {
        assert_eq!(self.channels, src.channels);
        let (o, so) = (self.offset(x, y), src.offset(sx, sy));
        for i in 0..self.channels {
            let cell = &self.pixels[o + i];
            T::store(cell, T::sum(T::load(cell), T::load(&src.pixels[so + i])));
        }
    }

    /// Copies a pixel of `src` into a pixel of this buffer.
    pub fn set_pixel_from(&self, x: usize, y: usize, src: &Self, sx: usize, sy: usize) {
        assert_eq!(self.channels, src.channels);
        let (o, so) = (self.offset(x, y), src.offset(sx, sy));
        for i in 0..self.channels {
            T::store(&self.pixels[o + i], T::load(&src.pixels[so + i]));
        }
    }

    /// Takes the minimum of a single component pixel and a pixel of `src`.
    pub fn min_pixel_from(&self, x: usize, y: usize, src: &Self, sx: usize, sy: usize) -> bool {
        assert_eq!(src.channels, 1);
        self.min_pixel(x, y, T::load(&src.pixels[src.offset(sx, sy)]))
    }

    /// Returns the bit pattern of every component in storage order.
    pub fn bits(&self) -> impl Iterator<Item = u32> + '_ {
        self.pixels.iter().map(|c| T::load(c).to_bits())
    }

    /// Sets a component from its bit pattern.
    ///
    /// * `i`    - Component index in storage order.
    /// * `bits` - Bit pattern.
    pub fn set_bits(&self, i: usize, bits: u32) {
        T::store(&self.pixels[i], T::from_bits(bits));
    }
}

impl GenericFrameBuffer<Float> {
    /// Adds `v * weight` to the colour components and `weight` to the weight
    /// component. Without a weight component every component gets `v * weight`.
    ///
    /// * `x`      - Pixel x-coordinate.
    /// * `y`      - Pixel y-coordinate.
    /// * `v`      - Colour components.
    /// * `weight` - Sample weight.
    pub fn add_weighted_pixel<const N: usize>(&self, x: usize, y: usize, v: [Float; N], weight: Float) {
        assert_eq!(N, self.channels - self.weight_channels);
        let o = self.offset(x, y);
        for (i, c) in v.into_iter().enumerate() {
            let cell = &self.pixels[o + i];
            cell.store(cell.load(Ordering::Relaxed) + c * weight, Ordering::Relaxed);
        }
        if self.weight_channels > 0 {
            let cell = &self.pixels[o + N];
            cell.store(cell.load(Ordering::Relaxed) + weight, Ordering::Relaxed);
        }
    }

    /// Same as `add_weighted_pixel()` with compare-and-swap adds.
    pub fn atomic_add_weighted_pixel<const N: usize>(&self, x: usize, y: usize, v: [Float; N], weight: Float) {
        assert_eq!(N, self.channels - self.weight_channels);
        let o = self.offset(x, y);
        for (i, c) in v.into_iter().enumerate() {
            self.pixels[o + i].add(c * weight);
        }
        if self.weight_channels > 0 {
            self.pixels[o + N].add(weight);
        }
    }

    /// Returns the colour components divided by the weight, or zero when
    /// nothing was accumulated. Buffers without weight return raw components.
    ///
    /// * `x` - Pixel x-coordinate.
    /// * `y` - Pixel y-coordinate.
    pub fn get_weighted_pixel<const N: usize>(&self, x: usize, y: usize) -> [Float; N] {
        assert_eq!(N, self.channels - self.weight_channels);
        let o = self.offset(x, y);
        let mut v = [0.0; N];
        if self.weight_channels == 0 {
            for (i, c) in v.iter_mut().enumerate() {
                *c = self.pixels[o + i].load(Ordering::Relaxed);
            }
        } else {
            let w = self.pixels[o + N].load(Ordering::Relaxed);
            if w != 0.0 {
                let inv_w = 1.0 / w;
                for (i, c) in v.iter_mut().enumerate() {
                    *c = self.pixels[o + i].load(Ordering::Relaxed) * inv_w;
                }
            }
        }
        v
    }

    /// Returns the weight component of a pixel.
    pub fn get_weight(&self, x: usize, y: usize) -> Float {
        assert_eq!(self.weight_channels, 1);
        self.pixels[self.offset(x, y) + self.channels - 1].load(Ordering::Relaxed)
    }
}

/// A channel buffer of either component type.
pub enum ChannelBuffer {
    Float(GenericFrameBuffer<Float>),
    UInt(GenericFrameBuffer<u32>),
}

impl ChannelBuffer {
    /// Returns the float buffer. Panics on an integer buffer.
    pub fn as_float(&self) -> &GenericFrameBuffer<Float> {
        match self {
            Self::Float(b) => b,
            Self::UInt(_) => panic!("expected a float channel buffer"),
        }
    }

    /// Returns the integer buffer. Panics on a float buffer.
    pub fn as_uint(&self) -> &GenericFrameBuffer<u32> {
        match self {
            Self::UInt(b) => b,
            Self::Float(_) => panic!("expected an integer channel buffer"),
        }
    }

    /// Sets every component to `fill`.
    ///
    /// * `fill` - The fill.
    pub fn clear(&self, fill: ChannelFill) {
        match self {
            Self::Float(b) => b.clear(Float::from_fill(fill)),
            Self::UInt(b) => b.clear(u32::from_fill(fill)),
        }
    }

    /// Returns the number of stored components.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(b) => b.len(),
            Self::UInt(b) => b.len(),
        }
    }

    /// Returns true if the buffer has no pixels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the allocated memory in bytes.
    pub fn memory_size(&self) -> usize {
        match self {
            Self::Float(b) => b.memory_size(),
            Self::UInt(b) => b.memory_size(),
        }
    }

    /// Adds a pixel of `src` into a pixel of this buffer.
    pub fn add_pixel_from(&self, x: usize, y: usize, src: &Self, sx: usize, sy: usize) {
        match (self, src) {
            (Self::Float(d), Self::Float(s)) => d.add_pixel_from(x, y, s, sx, sy),
            (Self::UInt(d), Self::UInt(s)) => d.add_pixel_from(x, y, s, sx, sy),
            _ => panic!("channel buffer component types differ"),
        }
    }

    /// Copies a pixel of `src` into a pixel of this buffer.
    pub fn set_pixel_from(&self, x: usize, y: usize, src: &Self, sx: usize, sy: usize) {
        match (self, src) {
            (Self::Float(d), Self::Float(s)) => d.set_pixel_from(x, y, s, sx, sy),
            (Self::UInt(d), Self::UInt(s)) => d.set_pixel_from(x, y, s, sx, sy),
            _ => panic!("channel buffer component types differ"),
        }
    }

    /// Takes the minimum of a pixel and a pixel of `src`.
    pub fn min_pixel_from(&self, x: usize, y: usize, src: &Self, sx: usize, sy: usize) -> bool {
        match (self, src) {
            (Self::Float(d), Self::Float(s)) => d.min_pixel_from(x, y, s, sx, sy),
            (Self::UInt(d), Self::UInt(s)) => d.min_pixel_from(x, y, s, sx, sy),
            _ => panic!("channel buffer component types differ"),
        }
    }

    /// Returns the bit pattern of every component in storage order.
    pub fn bits(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            Self::Float(b) => Box::new(b.bits()),
            Self::UInt(b) => Box::new(b.bits()),
        }
    }

    /// Sets a component from its bit pattern.
    pub fn set_bits(&self, i: usize, bits: u32) {
        match self {
            Self::Float(b) => b.set_bits(i, bits),
            Self::UInt(b) => b.set_bits(i, bits),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
