// Copyright 2016 Google Inc.
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use alloc::vec::Vec;
use core::cell::Cell;

use crate::color::Color;

use super::highp::STAGE_WIDTH;

/// Pixels a memory stage operates on.
///
/// Writable pixels are stored as cells, so a compiled pipeline can store into
/// them through a shared reference while other stages read the same buffer.
#[derive(Copy, Clone)]
enum PixelSlice<'a, T> {
    Shared(&'a [T]),
    Cells(&'a [Cell<T>]),
}

/// A context for load, store, scale and lerp stages.
///
/// Pixel `(x, y)` lives at `pixels[y * stride + x]`. A stride is measured in
/// pixels, not in bytes.
#[derive(Copy, Clone)]
pub struct MemoryCtx<'a, T> {
    pixels: PixelSlice<'a, T>,
    stride: usize, // can be zero
}

impl<'a, T: Copy> MemoryCtx<'a, T> {
    /// Creates a read-only context for a single row.
    pub fn new(pixels: &'a [T]) -> Self {
        MemoryCtx {
            stride: pixels.len(),
            pixels: PixelSlice::Shared(pixels),
        }
    }

    /// Creates a read-only context.
    ///
    /// Returns `None` when `stride` is larger than the buffer.
    pub fn with_stride(pixels: &'a [T], stride: usize) -> Option<Self> {
        if stride > pixels.len() {
            return None;
        }

        Some(MemoryCtx { pixels: PixelSlice::Shared(pixels), stride })
    }

    /// Creates a writable context for a single row.
    pub fn new_mut(pixels: &'a mut [T]) -> Self {
        let stride = pixels.len();
        Self::from_cells(Cell::from_mut(pixels).as_slice_of_cells(), stride)
    }

    /// Creates a writable context.
    ///
    /// Returns `None` when `stride` is larger than the buffer.
    pub fn with_stride_mut(pixels: &'a mut [T], stride: usize) -> Option<Self> {
        if stride > pixels.len() {
            return None;
        }

        Some(Self::from_cells(Cell::from_mut(pixels).as_slice_of_cells(), stride))
    }

    /// Creates a writable context from already shared cells.
    ///
    /// Allows loading and storing the same buffer within one pipeline.
    pub fn from_cells(pixels: &'a [Cell<T>], stride: usize) -> Self {
        MemoryCtx { pixels: PixelSlice::Cells(pixels), stride }
    }

    /// Checks that store stages can write into this context.
    pub fn is_writable(&self) -> bool {
        matches!(self.pixels, PixelSlice::Cells(_))
    }

    /// Returns the row stride in pixels.
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline(always)]
    fn offset(&self, dx: usize, dy: usize) -> usize {
        self.stride * dy + dx
    }
}

impl<T: Copy + Default> MemoryCtx<'_, T> {
    /// Reads `STAGE_WIDTH` pixels starting at `(dx, dy)`.
    ///
    /// With `TAIL` set, only the first `tail` pixels are read
    /// and the remaining lanes are zeroed.
    #[inline(always)]
    pub(crate) fn load<const TAIL: bool>(
        &self,
        dx: usize,
        dy: usize,
        tail: usize,
    ) -> [T; STAGE_WIDTH] {
        let offset = self.offset(dx, dy);
        match self.pixels {
            PixelSlice::Shared(data) => {
                if TAIL {
                    let mut tmp = [T::default(); STAGE_WIDTH];
                    tmp[..tail].copy_from_slice(&data[offset..offset + tail]);
                    tmp
                } else {
                    *arrayref::array_ref!(data, offset, STAGE_WIDTH)
                }
            }
            PixelSlice::Cells(cells) => {
                if TAIL {
                    let mut tmp = [T::default(); STAGE_WIDTH];
                    for (v, c) in tmp.iter_mut().zip(&cells[offset..offset + tail]) {
                        *v = c.get();
                    }
                    tmp
                } else {
                    let cells = arrayref::array_ref!(cells, offset, STAGE_WIDTH);
                    core::array::from_fn(|i| cells[i].get())
                }
            }
        }
    }

    /// Writes `STAGE_WIDTH` pixels starting at `(dx, dy)`.
    ///
    /// With `TAIL` set, only the first `tail` pixels are written.
    #[inline(always)]
    pub(crate) fn store<const TAIL: bool>(
        &self,
        dx: usize,
        dy: usize,
        tail: usize,
        values: &[T; STAGE_WIDTH],
    ) {
        let cells = match self.pixels {
            PixelSlice::Cells(cells) => cells,
            PixelSlice::Shared(_) => {
                // The builder never lets a store stage see read-only pixels.
                debug_assert!(false, "store into a read-only memory context");
                return;
            }
        };

        let offset = self.offset(dx, dy);
        if TAIL {
            for (c, v) in cells[offset..offset + tail].iter().zip(values) {
                c.set(*v);
            }
        } else {
            let cells = arrayref::array_ref!(cells, offset, STAGE_WIDTH);
            for (c, v) in cells.iter().zip(values) {
                c.set(*v);
            }
        }
    }
}

impl<T> core::fmt::Debug for MemoryCtx<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (len, writable) = match self.pixels {
            PixelSlice::Shared(data) => (data.len(), false),
            PixelSlice::Cells(cells) => (cells.len(), true),
        };

        f.debug_struct("MemoryCtx")
            .field("len", &len)
            .field("stride", &self.stride)
            .field("writable", &writable)
            .finish()
    }
}


/// A context for `LoadTables`.
///
/// Each RGBA8888 pixel's red, green and blue bytes index into their own table.
/// Alpha is used as is.
#[derive(Copy, Clone, Debug)]
pub struct LoadTablesCtx<'a> {
    pub(crate) src: MemoryCtx<'a, u32>,
    pub(crate) r: &'a [f32; 256],
    pub(crate) g: &'a [f32; 256],
    pub(crate) b: &'a [f32; 256],
}

impl<'a> LoadTablesCtx<'a> {
    /// Creates a new context.
    pub fn new(
        src: MemoryCtx<'a, u32>,
        r: &'a [f32; 256],
        g: &'a [f32; 256],
        b: &'a [f32; 256],
    ) -> Self {
        LoadTablesCtx { src, r, g, b }
    }
}


/// A context for gather stages, which sample an image at per-lane coordinates.
#[derive(Copy, Clone, Debug)]
pub struct GatherCtx<'a, T> {
    pub(crate) pixels: &'a [T],
    pub(crate) stride: usize,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl<'a, T> GatherCtx<'a, T> {
    /// Creates a new context.
    ///
    /// Returns `None` when the image is empty, when `stride < width`
    /// or when `pixels` is too short for the described image.
    pub fn new(pixels: &'a [T], stride: usize, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 || stride < width as usize {
            return None;
        }

        // Coordinates are computed in i32.
        i32::try_from(stride.checked_mul(height as usize)?).ok()?;

        let needed = stride * (height as usize - 1) + width as usize;
        if pixels.len() < needed {
            return None;
        }

        Some(GatherCtx {
            pixels,
            stride,
            width: width as f32,
            height: height as f32,
        })
    }
}


/// A context for `SeedShader`.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SeedShaderCtx {
    /// Per-lane x offsets, added to the chunk start.
    pub iota: [f32; STAGE_WIDTH],
}

impl Default for SeedShaderCtx {
    fn default() -> Self {
        SeedShaderCtx {
            iota: [0.5, 1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5],
        }
    }
}


/// A context for repeat, mirror and clamp stages.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct TileCtx {
    pub(crate) scale: f32,
    pub(crate) inv_scale: f32, // cache of 1/scale
}

impl TileCtx {
    /// Creates a new context from an exclusive limit.
    ///
    /// Returns `None` when the limit is not a positive finite number.
    pub fn new(limit: f32) -> Option<Self> {
        if !(limit.is_finite() && limit > 0.0) {
            return None;
        }

        Some(TileCtx {
            scale: limit,
            inv_scale: 1.0 / limit,
        })
    }

    /// Returns the exclusive limit.
    pub fn limit(&self) -> f32 {
        self.scale
    }
}


// A gradient color is an unpremultiplied RGBA not in a 0..1 range.
// It basically can have any float value.
#[allow(missing_docs)]
#[derive(Copy, Clone, Default, PartialEq, Debug)]
pub struct GradientColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl GradientColor {
    /// Creates a new color.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        GradientColor { r, g, b, a }
    }
}

impl From<Color> for GradientColor {
    fn from(c: Color) -> Self {
        GradientColor {
            r: c.red(),
            g: c.green(),
            b: c.blue(),
            a: c.alpha(),
        }
    }
}


/// A context for `LinearGradient2Stops`.
#[derive(Copy, Clone, Default, PartialEq, Debug)]
pub struct TwoStopGradientCtx {
    pub(crate) factor: GradientColor,
    pub(crate) start: GradientColor,
    pub(crate) end: GradientColor,
}

impl TwoStopGradientCtx {
    /// Creates a gradient going from `start` at `t = 0` to `end` at `t = 1`.
    pub fn new(start: GradientColor, end: GradientColor) -> Self {
        TwoStopGradientCtx {
            factor: GradientColor::new(
                end.r - start.r,
                end.g - start.g,
                end.b - start.b,
                end.a - start.a,
            ),
            start,
            end,
        }
    }
}


/// A gradient point.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct GradientStop {
    pub(crate) position: f32,
    pub(crate) color: GradientColor,
}

impl GradientStop {
    /// Creates a new gradient point.
    ///
    /// `position` will be clamped to a 0..=1 range. NaN becomes 0.
    pub fn new(position: f32, color: GradientColor) -> Self {
        let position = if position.is_nan() { 0.0 } else { position.clamp(0.0, 1.0) };
        GradientStop { position, color }
    }
}


/// A context for the multi-stop `Gradient` stage.
///
/// For any `t` between stops `n` and `n+1` the color is `biases[n] + factors[n] * t`.
#[derive(Clone, Debug)]
pub struct GradientCtx {
    pub(crate) factors: Vec<GradientColor>,
    pub(crate) biases: Vec<GradientColor>,
    pub(crate) t_values: Vec<f32>,
}

impl GradientCtx {
    /// Builds per-interval factors and biases from gradient stops.
    ///
    /// Stops are expected in increasing order. Positions that go backwards
    /// are pinned to the previous position, which produces a hard stop.
    ///
    /// Returns `None` when there are less than two stops.
    pub fn new(stops: &[GradientStop]) -> Option<Self> {
        if stops.len() < 2 {
            log::warn!("a gradient requires at least two stops");
            return None;
        }

        let mut stops = stops.to_vec();

        // Insert dummy entries to ensure that the data is bracketed by [0, 1].
        // i.e. pos[0] = 0.3, pos[1] = 0.7 becomes 0, 0.3, 0.7, 1
        if stops[0].position != 0.0 {
            stops.insert(0, GradientStop::new(0.0, stops[0].color));
        }

        if stops[stops.len() - 1].position != 1.0 {
            stops.push(GradientStop::new(1.0, stops[stops.len() - 1].color));
        }

        // Pin the last value to 1.0, and make sure positions are monotonic.
        let mut prev = 0.0;
        let len = stops.len();
        for (i, stop) in stops.iter_mut().enumerate() {
            let curr = if i + 1 == len { 1.0 } else { stop.position.clamp(prev, 1.0) };
            stop.position = curr;
            prev = curr;
        }

        let mut ctx = GradientCtx {
            factors: Vec::with_capacity(stops.len() + 1),
            biases: Vec::with_capacity(stops.len() + 1),
            t_values: Vec::with_capacity(stops.len() + 1),
        };

        // Note: In order to handle clamps in search, the search assumes
        // a stop conceptually placed at -inf.
        let mut t_l = stops[0].position;
        let mut c_l = stops[0].color;
        ctx.push_const_color(c_l);
        ctx.t_values.push(0.0);
        for stop in &stops[1..] {
            let t_r = stop.position;
            let c_r = stop.color;
            debug_assert!(t_l <= t_r);
            if t_l < t_r {
                let f = GradientColor::new(
                    (c_r.r - c_l.r) / (t_r - t_l),
                    (c_r.g - c_l.g) / (t_r - t_l),
                    (c_r.b - c_l.b) / (t_r - t_l),
                    (c_r.a - c_l.a) / (t_r - t_l),
                );
                ctx.factors.push(f);

                ctx.biases.push(GradientColor::new(
                    c_l.r - f.r * t_l,
                    c_l.g - f.g * t_l,
                    c_l.b - f.b * t_l,
                    c_l.a - f.a * t_l,
                ));

                ctx.t_values.push(t_l);
            }

            t_l = t_r;
            c_l = c_r;
        }

        ctx.push_const_color(c_l);
        ctx.t_values.push(t_l);

        debug_assert_eq!(ctx.factors.len(), ctx.t_values.len());
        debug_assert_eq!(ctx.biases.len(), ctx.t_values.len());

        Some(ctx)
    }

    fn push_const_color(&mut self, color: GradientColor) {
        self.factors.push(GradientColor::default());
        self.biases.push(color);
    }

    /// Returns the number of intervals, including the two constant ones at the edges.
    pub fn intervals_count(&self) -> usize {
        self.t_values.len()
    }
}


/// A per-stage context.
///
/// Each stage expects exactly one variant, see `Stage::context_kind`.
#[allow(missing_docs)]
#[derive(Debug)]
pub enum Context<'a> {
    None,
    A8(MemoryCtx<'a, u8>),
    U16(MemoryCtx<'a, u16>),
    U32(MemoryCtx<'a, u32>),
    F16(MemoryCtx<'a, [u16; 4]>),
    F32(MemoryCtx<'a, [f32; 4]>),
    Tables(LoadTablesCtx<'a>),
    Gather8(GatherCtx<'a, u8>),
    Gather16(GatherCtx<'a, u16>),
    Gather32(GatherCtx<'a, u32>),
    GatherF16(GatherCtx<'a, [u16; 4]>),
    Scalar(f32),
    Color(Color),
    Rgb([f32; 3]),
    Seed(SeedShaderCtx),
    Translate([f32; 2]),
    ScaleTranslate([f32; 4]),
    Matrix2x3([f32; 6]),
    Matrix3x4([f32; 12]),
    Matrix4x5([f32; 20]),
    Perspective([f32; 9]),
    Tile(TileCtx),
    TwoStopGradient(TwoStopGradientCtx),
    Gradient(GradientCtx),
}

/// A `Context` variant without its payload.
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ContextKind {
    None,
    A8,
    U16,
    U32,
    F16,
    F32,
    Tables,
    Gather8,
    Gather16,
    Gather32,
    GatherF16,
    Scalar,
    Color,
    Rgb,
    Seed,
    Translate,
    ScaleTranslate,
    Matrix2x3,
    Matrix3x4,
    Matrix4x5,
    Perspective,
    Tile,
    TwoStopGradient,
    Gradient,
}

impl Context<'_> {
    /// Returns the variant of this context.
    pub fn kind(&self) -> ContextKind {
        match self {
            Context::None => ContextKind::None,
            Context::A8(_) => ContextKind::A8,
            Context::U16(_) => ContextKind::U16,
            Context::U32(_) => ContextKind::U32,
            Context::F16(_) => ContextKind::F16,
            Context::F32(_) => ContextKind::F32,
            Context::Tables(_) => ContextKind::Tables,
            Context::Gather8(_) => ContextKind::Gather8,
            Context::Gather16(_) => ContextKind::Gather16,
            Context::Gather32(_) => ContextKind::Gather32,
            Context::GatherF16(_) => ContextKind::GatherF16,
            Context::Scalar(_) => ContextKind::Scalar,
            Context::Color(_) => ContextKind::Color,
            Context::Rgb(_) => ContextKind::Rgb,
            Context::Seed(_) => ContextKind::Seed,
            Context::Translate(_) => ContextKind::Translate,
            Context::ScaleTranslate(_) => ContextKind::ScaleTranslate,
            Context::Matrix2x3(_) => ContextKind::Matrix2x3,
            Context::Matrix3x4(_) => ContextKind::Matrix3x4,
            Context::Matrix4x5(_) => ContextKind::Matrix4x5,
            Context::Perspective(_) => ContextKind::Perspective,
            Context::Tile(_) => ContextKind::Tile,
            Context::TwoStopGradient(_) => ContextKind::TwoStopGradient,
            Context::Gradient(_) => ContextKind::Gradient,
        }
    }

    /// Checks that store stages can write through this context.
    ///
    /// Non-memory contexts are never writable.
    pub fn is_writable(&self) -> bool {
        match self {
            Context::A8(ctx) => ctx.is_writable(),
            Context::U16(ctx) => ctx.is_writable(),
            Context::U32(ctx) => ctx.is_writable(),
            Context::F16(ctx) => ctx.is_writable(),
            Context::F32(ctx) => ctx.is_writable(),
            _ => false,
        }
    }
}

macro_rules! impl_from_ctx {
    ($t:ty, $variant:ident) => {
        impl<'a> From<$t> for Context<'a> {
            fn from(ctx: $t) -> Self {
                Context::$variant(ctx)
            }
        }
    };
}

impl_from_ctx!(MemoryCtx<'a, u8>, A8);
impl_from_ctx!(MemoryCtx<'a, u16>, U16);
impl_from_ctx!(MemoryCtx<'a, u32>, U32);
impl_from_ctx!(MemoryCtx<'a, [u16; 4]>, F16);
impl_from_ctx!(MemoryCtx<'a, [f32; 4]>, F32);
impl_from_ctx!(LoadTablesCtx<'a>, Tables);
impl_from_ctx!(GatherCtx<'a, u8>, Gather8);
impl_from_ctx!(GatherCtx<'a, u16>, Gather16);
impl_from_ctx!(GatherCtx<'a, u32>, Gather32);
impl_from_ctx!(GatherCtx<'a, [u16; 4]>, GatherF16);
impl_from_ctx!(Color, Color);
impl_from_ctx!(SeedShaderCtx, Seed);
impl_from_ctx!(TileCtx, Tile);
impl_from_ctx!(TwoStopGradientCtx, TwoStopGradient);
impl_from_ctx!(GradientCtx, Gradient);
