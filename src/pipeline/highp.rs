// Copyright 2018 Google Inc.
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/*!
A high precision raster pipeline implementation.

Every stage operates on eight pixels at once, stored as `f32x8` registers.
Stages are plain functions that are called one after another by the driver loop.
Each one receives the shared register file and its own context and reports
whether the program should continue.

Stages that touch memory are generic over `TAIL`. The full-width variant
reads and writes exactly `STAGE_WIDTH` pixels. The tail variant touches only
the first `tail` pixels and is linked into a separate program, which the driver
uses for the last, narrower chunk of a row.
*/

use crate::wide::{f32x8, i32x8, u32x8};

use super::context::*;
use super::{FromSrgbCoefficients, PipelineConstants, ToSrgbCoefficients, STAGES_COUNT};

/// The number of pixels processed by a single stage call.
pub const STAGE_WIDTH: usize = 8;

/// What the driver should do after a stage.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Flow {
    Next,
    Return,
}

pub type StageFn = fn(p: &mut Pipeline, ctx: &Context) -> Flow;

/// The register file.
pub struct Pipeline<'a> {
    pub r: f32x8,
    pub g: f32x8,
    pub b: f32x8,
    pub a: f32x8,
    pub dr: f32x8,
    pub dg: f32x8,
    pub db: f32x8,
    pub da: f32x8,
    pub tail: usize,
    pub dx: usize,
    pub dy: usize,
    pub constants: &'a PipelineConstants,
}

impl<'a> Pipeline<'a> {
    fn new(constants: &'a PipelineConstants, dy: usize) -> Self {
        Pipeline {
            r: f32x8::default(),
            g: f32x8::default(),
            b: f32x8::default(),
            a: f32x8::default(),
            dr: f32x8::default(),
            dg: f32x8::default(),
            db: f32x8::default(),
            da: f32x8::default(),
            tail: STAGE_WIDTH,
            dx: 0,
            dy,
            constants,
        }
    }

    // Every chunk starts from zeroed registers.
    #[inline(always)]
    fn reset(&mut self, dx: usize, tail: usize) {
        self.r = f32x8::default();
        self.g = f32x8::default();
        self.b = f32x8::default();
        self.a = f32x8::default();
        self.dr = f32x8::default();
        self.dg = f32x8::default();
        self.db = f32x8::default();
        self.da = f32x8::default();
        self.dx = dx;
        self.tail = tail;
    }
}

// Must be in the same order as pipeline::Stage.
//
// Memory stages are instantiated with `$tail`, everything else
// doesn't care about the chunk width.
macro_rules! stage_table {
    ($tail:literal) => {
        [
            load_a8::<$tail>,
            load_a8_dst::<$tail>,
            store_a8::<$tail>,
            load_g8::<$tail>,
            load_g8_dst::<$tail>,
            load_565::<$tail>,
            load_565_dst::<$tail>,
            store_565::<$tail>,
            load_4444::<$tail>,
            load_4444_dst::<$tail>,
            store_4444::<$tail>,
            load_8888::<$tail>,
            load_8888_dst::<$tail>,
            store_8888::<$tail>,
            load_bgra::<$tail>,
            load_bgra_dst::<$tail>,
            store_bgra::<$tail>,
            load_1010102::<$tail>,
            load_1010102_dst::<$tail>,
            store_1010102::<$tail>,
            load_f16::<$tail>,
            load_f16_dst::<$tail>,
            store_f16::<$tail>,
            load_f32::<$tail>,
            load_f32_dst::<$tail>,
            store_f32::<$tail>,
            load_tables::<$tail>,
            gather_a8,
            gather_g8,
            gather_565,
            gather_4444,
            gather_8888,
            gather_bgra,
            gather_1010102,
            gather_f16,
            uniform_color,
            black_color,
            white_color,
            set_rgb,
            premultiply,
            premultiply_destination,
            unpremultiply,
            force_opaque,
            force_opaque_dst,
            from_srgb,
            from_srgb_dst,
            to_srgb,
            invert,
            luminance_to_alpha,
            dither,
            clamp_0,
            clamp_1,
            clamp_a,
            clamp_a_dst,
            swap,
            swap_rb,
            move_source_to_destination,
            move_destination_to_source,
            clear,
            source_atop,
            destination_atop,
            source_in,
            destination_in,
            source_out,
            destination_out,
            source_over,
            destination_over,
            modulate,
            multiply,
            plus,
            screen,
            xor,
            darken,
            lighten,
            difference,
            exclusion,
            color_burn,
            color_dodge,
            hard_light,
            overlay,
            soft_light,
            hue,
            saturation,
            color,
            luminosity,
            seed_shader,
            matrix_translate,
            matrix_scale_translate,
            matrix_2x3,
            matrix_3x4,
            matrix_4x5,
            matrix_perspective,
            clamp_x,
            clamp_y,
            repeat_x,
            repeat_y,
            mirror_x,
            mirror_y,
            clamp_x_1,
            repeat_x_1,
            mirror_x_1,
            scale_1_float,
            scale_u8::<$tail>,
            scale_565::<$tail>,
            lerp_1_float,
            lerp_u8::<$tail>,
            lerp_565::<$tail>,
            linear_gradient_2stops,
            gradient,
        ]
    };
}

pub const STAGES: &[StageFn; STAGES_COUNT] = &stage_table!(false);
pub const TAIL_STAGES: &[StageFn; STAGES_COUNT] = &stage_table!(true);

/// Runs a program over `x..end` pixels of row `y`.
///
/// Full chunks use `functions`, the last partial chunk uses `tail_functions`.
/// Both programs must share `contexts` and end with `just_return`.
#[inline(never)]
pub fn start(
    functions: &[StageFn],
    tail_functions: &[StageFn],
    contexts: &[Context],
    constants: &PipelineConstants,
    x: usize,
    y: usize,
    end: usize,
) {
    let mut p = Pipeline::new(constants, y);

    let mut dx = x;
    while dx + STAGE_WIDTH <= end {
        p.reset(dx, STAGE_WIDTH);
        run_program(&mut p, functions, contexts);
        dx += STAGE_WIDTH;
    }

    if dx < end {
        p.reset(dx, end - dx);
        run_program(&mut p, tail_functions, contexts);
    }
}

#[inline(always)]
fn run_program(p: &mut Pipeline, functions: &[StageFn], contexts: &[Context]) {
    for (f, ctx) in functions.iter().zip(contexts) {
        if f(p, ctx) == Flow::Return {
            break;
        }
    }
}

pub fn just_return(_: &mut Pipeline, _: &Context) -> Flow {
    Flow::Return
}

// Unpacks an expected context variant.
//
// The builder checks variants up front, so a mismatch is a bug.
// In release builds the stage is skipped.
macro_rules! ctx {
    ($ctx:expr, $variant:ident) => {
        match $ctx {
            Context::$variant(c) => c,
            _ => {
                debug_assert!(false, concat!("expected a ", stringify!($variant), " context"));
                return Flow::Next;
            }
        }
    };
}


fn load_a8<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, A8);
    p.r = f32x8::default();
    p.g = f32x8::default();
    p.b = f32x8::default();
    p.a = load_u8::<TAIL>(p, ctx);

    Flow::Next
}

fn load_a8_dst<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, A8);
    p.dr = f32x8::default();
    p.dg = f32x8::default();
    p.db = f32x8::default();
    p.da = load_u8::<TAIL>(p, ctx);

    Flow::Next
}

fn store_a8<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, A8);
    let a: [u32; 8] = to_unorm(p.a, p.constants.byte_scale).into();
    ctx.store::<TAIL>(p.dx, p.dy, p.tail, &a.map(|v| v as u8));

    Flow::Next
}

fn load_g8<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, A8);
    p.r = load_u8::<TAIL>(p, ctx);
    p.g = p.r;
    p.b = p.r;
    p.a = f32x8::splat(1.0);

    Flow::Next
}

fn load_g8_dst<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, A8);
    p.dr = load_u8::<TAIL>(p, ctx);
    p.dg = p.dr;
    p.db = p.dr;
    p.da = f32x8::splat(1.0);

    Flow::Next
}

fn load_565<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U16);
    let (r, g, b) = from_565(load_u16::<TAIL>(p, ctx));
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = f32x8::splat(1.0);

    Flow::Next
}

fn load_565_dst<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U16);
    let (r, g, b) = from_565(load_u16::<TAIL>(p, ctx));
    p.dr = r;
    p.dg = g;
    p.db = b;
    p.da = f32x8::splat(1.0);

    Flow::Next
}

fn store_565<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U16);
    let px = to_unorm(p.r, 31.0) << 11
           | to_unorm(p.g, 63.0) <<  5
           | to_unorm(p.b, 31.0);
    store_u16::<TAIL>(p, ctx, px);

    Flow::Next
}

fn load_4444<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U16);
    let (r, g, b, a) = from_4444(load_u16::<TAIL>(p, ctx));
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;

    Flow::Next
}

fn load_4444_dst<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U16);
    let (r, g, b, a) = from_4444(load_u16::<TAIL>(p, ctx));
    p.dr = r;
    p.dg = g;
    p.db = b;
    p.da = a;

    Flow::Next
}

fn store_4444<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U16);
    let px = to_unorm(p.r, 15.0) << 12
           | to_unorm(p.g, 15.0) <<  8
           | to_unorm(p.b, 15.0) <<  4
           | to_unorm(p.a, 15.0);
    store_u16::<TAIL>(p, ctx, px);

    Flow::Next
}

fn load_8888<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U32);
    let (r, g, b, a) = from_8888(load_u32::<TAIL>(p, ctx), p.constants.inv_byte_scale);
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;

    Flow::Next
}

fn load_8888_dst<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U32);
    let (r, g, b, a) = from_8888(load_u32::<TAIL>(p, ctx), p.constants.inv_byte_scale);
    p.dr = r;
    p.dg = g;
    p.db = b;
    p.da = a;

    Flow::Next
}

fn store_8888<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U32);
    let px = to_8888(p.r, p.g, p.b, p.a, p.constants.byte_scale);
    store_u32::<TAIL>(p, ctx, px);

    Flow::Next
}

fn load_bgra<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U32);
    let (b, g, r, a) = from_8888(load_u32::<TAIL>(p, ctx), p.constants.inv_byte_scale);
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;

    Flow::Next
}

fn load_bgra_dst<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U32);
    let (b, g, r, a) = from_8888(load_u32::<TAIL>(p, ctx), p.constants.inv_byte_scale);
    p.dr = r;
    p.dg = g;
    p.db = b;
    p.da = a;

    Flow::Next
}

fn store_bgra<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U32);
    let px = to_8888(p.b, p.g, p.r, p.a, p.constants.byte_scale);
    store_u32::<TAIL>(p, ctx, px);

    Flow::Next
}

fn load_1010102<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U32);
    let (r, g, b, a) = from_1010102(load_u32::<TAIL>(p, ctx));
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;

    Flow::Next
}

fn load_1010102_dst<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U32);
    let (r, g, b, a) = from_1010102(load_u32::<TAIL>(p, ctx));
    p.dr = r;
    p.dg = g;
    p.db = b;
    p.da = a;

    Flow::Next
}

fn store_1010102<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U32);
    let px = to_unorm(p.r, 1023.0)
           | to_unorm(p.g, 1023.0) << 10
           | to_unorm(p.b, 1023.0) << 20
           | to_unorm(p.a,    3.0) << 30;
    store_u32::<TAIL>(p, ctx, px);

    Flow::Next
}

fn load_f16<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, F16);
    let (r, g, b, a) = from_f16(ctx.load::<TAIL>(p.dx, p.dy, p.tail));
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;

    Flow::Next
}

fn load_f16_dst<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, F16);
    let (r, g, b, a) = from_f16(ctx.load::<TAIL>(p.dx, p.dy, p.tail));
    p.dr = r;
    p.dg = g;
    p.db = b;
    p.da = a;

    Flow::Next
}

fn store_f16<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, F16);

    let r: [f32; 8] = p.r.into();
    let g: [f32; 8] = p.g.into();
    let b: [f32; 8] = p.b.into();
    let a: [f32; 8] = p.a.into();

    let to_half = |v: f32| half::f16::from_f32(v).to_bits();
    let px: [[u16; 4]; STAGE_WIDTH] = core::array::from_fn(|i| {
        [to_half(r[i]), to_half(g[i]), to_half(b[i]), to_half(a[i])]
    });

    ctx.store::<TAIL>(p.dx, p.dy, p.tail, &px);

    Flow::Next
}

fn load_f32<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, F32);
    let (r, g, b, a) = from_f32(ctx.load::<TAIL>(p.dx, p.dy, p.tail));
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;

    Flow::Next
}

fn load_f32_dst<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, F32);
    let (r, g, b, a) = from_f32(ctx.load::<TAIL>(p.dx, p.dy, p.tail));
    p.dr = r;
    p.dg = g;
    p.db = b;
    p.da = a;

    Flow::Next
}

fn store_f32<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, F32);

    let r: [f32; 8] = p.r.into();
    let g: [f32; 8] = p.g.into();
    let b: [f32; 8] = p.b.into();
    let a: [f32; 8] = p.a.into();

    let px: [[f32; 4]; STAGE_WIDTH] = core::array::from_fn(|i| [r[i], g[i], b[i], a[i]]);
    ctx.store::<TAIL>(p.dx, p.dy, p.tail, &px);

    Flow::Next
}

fn load_tables<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Tables);
    let px = ctx.src.load::<TAIL>(p.dx, p.dy, p.tail);

    p.r = f32x8::from(px.map(|v| ctx.r[(v & 0xFF) as usize]));
    p.g = f32x8::from(px.map(|v| ctx.g[((v >> 8) & 0xFF) as usize]));
    p.b = f32x8::from(px.map(|v| ctx.b[((v >> 16) & 0xFF) as usize]));
    p.a = (u32x8::from(px) >> 24).to_f32x8() * f32x8::splat(p.constants.inv_byte_scale);

    Flow::Next
}

fn gather_a8(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Gather8);
    let px = gather_u8(ctx, p.r, p.g);

    p.r = f32x8::default();
    p.g = f32x8::default();
    p.b = f32x8::default();
    p.a = px * f32x8::splat(p.constants.inv_byte_scale);

    Flow::Next
}

fn gather_g8(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Gather8);
    let px = gather_u8(ctx, p.r, p.g);

    p.r = px * f32x8::splat(p.constants.inv_byte_scale);
    p.g = p.r;
    p.b = p.r;
    p.a = f32x8::splat(1.0);

    Flow::Next
}

fn gather_565(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Gather16);
    let (r, g, b) = from_565(gather_u16(ctx, p.r, p.g));
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = f32x8::splat(1.0);

    Flow::Next
}

fn gather_4444(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Gather16);
    let (r, g, b, a) = from_4444(gather_u16(ctx, p.r, p.g));
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;

    Flow::Next
}

fn gather_8888(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Gather32);
    let (r, g, b, a) = from_8888(gather_u32(ctx, p.r, p.g), p.constants.inv_byte_scale);
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;

    Flow::Next
}

fn gather_bgra(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Gather32);
    let (b, g, r, a) = from_8888(gather_u32(ctx, p.r, p.g), p.constants.inv_byte_scale);
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;

    Flow::Next
}

fn gather_1010102(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Gather32);
    let (r, g, b, a) = from_1010102(gather_u32(ctx, p.r, p.g));
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;

    Flow::Next
}

fn gather_f16(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, GatherF16);
    let ix = gather_ix(ctx, p.r, p.g);
    let (r, g, b, a) = from_f16(ix.map(|i| ctx.pixels[i]));
    p.r = r;
    p.g = g;
    p.b = b;
    p.a = a;

    Flow::Next
}

fn uniform_color(p: &mut Pipeline, ctx: &Context) -> Flow {
    let c = ctx!(ctx, Color);
    p.r = f32x8::splat(c.red());
    p.g = f32x8::splat(c.green());
    p.b = f32x8::splat(c.blue());
    p.a = f32x8::splat(c.alpha());

    Flow::Next
}

fn black_color(p: &mut Pipeline, _: &Context) -> Flow {
    p.r = f32x8::default();
    p.g = f32x8::default();
    p.b = f32x8::default();
    p.a = f32x8::splat(1.0);

    Flow::Next
}

fn white_color(p: &mut Pipeline, _: &Context) -> Flow {
    p.r = f32x8::splat(1.0);
    p.g = f32x8::splat(1.0);
    p.b = f32x8::splat(1.0);
    p.a = f32x8::splat(1.0);

    Flow::Next
}

fn set_rgb(p: &mut Pipeline, ctx: &Context) -> Flow {
    let rgb = ctx!(ctx, Rgb);
    p.r = f32x8::splat(rgb[0]);
    p.g = f32x8::splat(rgb[1]);
    p.b = f32x8::splat(rgb[2]);

    Flow::Next
}

fn premultiply(p: &mut Pipeline, _: &Context) -> Flow {
    p.r *= p.a;
    p.g *= p.a;
    p.b *= p.a;

    Flow::Next
}

fn premultiply_destination(p: &mut Pipeline, _: &Context) -> Flow {
    p.dr *= p.da;
    p.dg *= p.da;
    p.db *= p.da;

    Flow::Next
}

fn unpremultiply(p: &mut Pipeline, _: &Context) -> Flow {
    // 1/0 is inf, and 1/NaN is NaN. Both fail the test and scale by zero.
    let scale = p.a.recip();
    let scale = scale.cmp_lt(f32x8::splat(f32::INFINITY)).blend(scale, f32x8::default());
    p.r *= scale;
    p.g *= scale;
    p.b *= scale;

    Flow::Next
}

fn force_opaque(p: &mut Pipeline, _: &Context) -> Flow {
    p.a = f32x8::splat(1.0);
    Flow::Next
}

fn force_opaque_dst(p: &mut Pipeline, _: &Context) -> Flow {
    p.da = f32x8::splat(1.0);
    Flow::Next
}

fn from_srgb(p: &mut Pipeline, _: &Context) -> Flow {
    let k = &p.constants.from_srgb;
    p.r = srgb_to_linear(p.r, k);
    p.g = srgb_to_linear(p.g, k);
    p.b = srgb_to_linear(p.b, k);

    Flow::Next
}

fn from_srgb_dst(p: &mut Pipeline, _: &Context) -> Flow {
    let k = &p.constants.from_srgb;
    p.dr = srgb_to_linear(p.dr, k);
    p.dg = srgb_to_linear(p.dg, k);
    p.db = srgb_to_linear(p.db, k);

    Flow::Next
}

fn to_srgb(p: &mut Pipeline, _: &Context) -> Flow {
    let k = &p.constants.to_srgb;
    p.r = linear_to_srgb(p.r, k);
    p.g = linear_to_srgb(p.g, k);
    p.b = linear_to_srgb(p.b, k);

    Flow::Next
}

fn invert(p: &mut Pipeline, _: &Context) -> Flow {
    p.r = inv(p.r);
    p.g = inv(p.g);
    p.b = inv(p.b);
    p.a = inv(p.a);

    Flow::Next
}

fn luminance_to_alpha(p: &mut Pipeline, _: &Context) -> Flow {
    p.a = p.r * f32x8::splat(0.2126)
        + p.g * f32x8::splat(0.7152)
        + p.b * f32x8::splat(0.0722);
    p.r = f32x8::default();
    p.g = f32x8::default();
    p.b = f32x8::default();

    Flow::Next
}

fn dither(p: &mut Pipeline, ctx: &Context) -> Flow {
    let rate = *ctx!(ctx, Scalar);

    // An 8x8 ordered dither matrix, indexed by the low three bits
    // of x and y ^ x and interleaved into a 6-bit value.
    let x = u32x8::splat(p.dx as u32) + u32x8::from([0, 1, 2, 3, 4, 5, 6, 7]);
    let y = u32x8::splat(p.dy as u32) ^ x;
    let bit = |v: u32x8, mask: u32| v & u32x8::splat(mask);

    let m = bit(y, 1) << 5
          | bit(x, 1) << 4
          | bit(y, 2) << 2
          | bit(x, 2) << 1
          | bit(y, 4) >> 1
          | bit(x, 4) >> 2;

    // Map 0..=63 into a -63/128..=63/128 range.
    let dither = mad(m.to_f32x8(), f32x8::splat(2.0 / 128.0), f32x8::splat(-63.0 / 128.0));
    let dither = dither * f32x8::splat(rate);

    p.r = (p.r + dither).min(p.a).max(f32x8::default());
    p.g = (p.g + dither).min(p.a).max(f32x8::default());
    p.b = (p.b + dither).min(p.a).max(f32x8::default());

    Flow::Next
}

fn clamp_0(p: &mut Pipeline, _: &Context) -> Flow {
    p.r = p.r.max(f32x8::default());
    p.g = p.g.max(f32x8::default());
    p.b = p.b.max(f32x8::default());
    p.a = p.a.max(f32x8::default());

    Flow::Next
}

fn clamp_1(p: &mut Pipeline, _: &Context) -> Flow {
    p.r = p.r.normalize();
    p.g = p.g.normalize();
    p.b = p.b.normalize();
    p.a = p.a.normalize();

    Flow::Next
}

fn clamp_a(p: &mut Pipeline, _: &Context) -> Flow {
    p.a = p.a.min(f32x8::splat(1.0));
    p.r = p.r.min(p.a);
    p.g = p.g.min(p.a);
    p.b = p.b.min(p.a);

    Flow::Next
}

fn clamp_a_dst(p: &mut Pipeline, _: &Context) -> Flow {
    p.da = p.da.min(f32x8::splat(1.0));
    p.dr = p.dr.min(p.da);
    p.dg = p.dg.min(p.da);
    p.db = p.db.min(p.da);

    Flow::Next
}

fn swap(p: &mut Pipeline, _: &Context) -> Flow {
    core::mem::swap(&mut p.r, &mut p.dr);
    core::mem::swap(&mut p.g, &mut p.dg);
    core::mem::swap(&mut p.b, &mut p.db);
    core::mem::swap(&mut p.a, &mut p.da);

    Flow::Next
}

fn swap_rb(p: &mut Pipeline, _: &Context) -> Flow {
    core::mem::swap(&mut p.r, &mut p.b);
    Flow::Next
}

fn move_source_to_destination(p: &mut Pipeline, _: &Context) -> Flow {
    p.dr = p.r;
    p.dg = p.g;
    p.db = p.b;
    p.da = p.a;

    Flow::Next
}

fn move_destination_to_source(p: &mut Pipeline, _: &Context) -> Flow {
    p.r = p.dr;
    p.g = p.dg;
    p.b = p.db;
    p.a = p.da;

    Flow::Next
}

macro_rules! blend_fn {
    ($name:ident, $f:expr) => {
        fn $name(p: &mut Pipeline, _: &Context) -> Flow {
            p.r = $f(p.r, p.dr, p.a, p.da);
            p.g = $f(p.g, p.dg, p.a, p.da);
            p.b = $f(p.b, p.db, p.a, p.da);
            p.a = $f(p.a, p.da, p.a, p.da);

            Flow::Next
        }
    };
}

blend_fn!(clear,            |_, _,  _,  _| f32x8::default());
blend_fn!(source_atop,      |s, d, sa, da| s * da + d * inv(sa));
blend_fn!(destination_atop, |s, d, sa, da| d * sa + s * inv(da));
blend_fn!(source_in,        |s, _,  _, da| s * da);
blend_fn!(destination_in,   |_, d, sa,  _| d * sa);
blend_fn!(source_out,       |s, _,  _, da| s * inv(da));
blend_fn!(destination_out,  |_, d, sa,  _| d * inv(sa));
blend_fn!(source_over,      |s, d, sa,  _| mad(d, inv(sa), s));
blend_fn!(destination_over, |s, d,  _, da| mad(s, inv(da), d));
blend_fn!(modulate,         |s, d,  _,  _| s * d);
blend_fn!(multiply,         |s, d, sa, da| s * inv(da) + d * inv(sa) + s * d);
blend_fn!(screen,           |s, d,  _,  _| s + d - s * d);
blend_fn!(xor,              |s, d, sa, da| s * inv(da) + d * inv(sa));

// Could be clamped to either 1 or `sa`.
blend_fn!(plus, |s: f32x8, d: f32x8, _, _| (s + d).min(f32x8::splat(1.0)));

macro_rules! blend_fn2 {
    ($name:ident, $f:expr) => {
        fn $name(p: &mut Pipeline, _: &Context) -> Flow {
            // The same logic applied to color, and source_over for alpha.
            p.r = $f(p.r, p.dr, p.a, p.da);
            p.g = $f(p.g, p.dg, p.a, p.da);
            p.b = $f(p.b, p.db, p.a, p.da);
            p.a = mad(p.da, inv(p.a), p.a);

            Flow::Next
        }
    };
}

blend_fn2!(darken,      |s: f32x8, d, sa, da: f32x8| s + d - (s * da).max(d * sa));
blend_fn2!(lighten,     |s: f32x8, d, sa, da: f32x8| s + d - (s * da).min(d * sa));
blend_fn2!(difference,  |s: f32x8, d, sa, da: f32x8| s + d - two((s * da).min(d * sa)));
blend_fn2!(exclusion,   |s: f32x8, d,  _,  _| s + d - two(s * d));

blend_fn2!(color_burn, |s: f32x8, d: f32x8, sa: f32x8, da: f32x8|
    d.cmp_eq(da).blend(
        d + s * inv(da),
        s.cmp_eq(f32x8::default()).blend(
            d * inv(sa),
            sa * (da - da.min((da - d) * sa * s.recip())) + s * inv(da) + d * inv(sa)
        )
    )
);

blend_fn2!(color_dodge, |s: f32x8, d: f32x8, sa: f32x8, da: f32x8|
    d.cmp_eq(f32x8::default()).blend(
        s * inv(da),
        s.cmp_eq(sa).blend(
            s + d * inv(sa),
            sa * da.min((d * sa) * (sa - s).recip()) + s * inv(da) + d * inv(sa)
        )
    )
);

blend_fn2!(hard_light, |s: f32x8, d: f32x8, sa: f32x8, da: f32x8|
    s * inv(da) + d * inv(sa) + two(s).cmp_le(sa).blend(
        two(s * d),
        sa * da - two((da - d) * (sa - s))
    )
);

blend_fn2!(overlay, |s: f32x8, d: f32x8, sa: f32x8, da: f32x8|
    s * inv(da) + d * inv(sa) + two(d).cmp_le(da).blend(
        two(s * d),
        sa * da - two((da - d) * (sa - s))
    )
);

blend_fn2!(soft_light, |s: f32x8, d: f32x8, sa: f32x8, da: f32x8| {
    let one = f32x8::splat(1.0);
    let m  = da.cmp_gt(f32x8::default()).blend(d / da, f32x8::default());
    let s2 = two(s);
    let m4 = two(two(m));

    // Three cases: a dark source, a light source over a dark destination
    // and a light source over a light destination.
    let dark_src = d * (sa + (s2 - sa) * (one - m));
    let dark_dst = (m4 * m4 + m4) * (m - one) + f32x8::splat(7.0) * m;
    let lite_dst = m.recip_sqrt().recip() - m;
    let lite_src = d * sa + da * (s2 - sa) * two(two(d)).cmp_le(da).blend(dark_dst, lite_dst);

    s * inv(da) + d * inv(sa) + s2.cmp_le(sa).blend(dark_src, lite_src)
});

// Non-separable modes, see https://www.w3.org/TR/compositing-1/#blendingnonseparable
// The extra terms make the math work with premultiplied inputs.
macro_rules! blend_fn3 {
    ($name:ident, $f:expr) => {
        fn $name(p: &mut Pipeline, _: &Context) -> Flow {
            let (r, g, b) = $f(&*p);
            p.r = p.r * inv(p.da) + p.dr * inv(p.a) + r;
            p.g = p.g * inv(p.da) + p.dg * inv(p.a) + g;
            p.b = p.b * inv(p.da) + p.db * inv(p.a) + b;
            p.a = p.a + p.da - p.a * p.da;

            Flow::Next
        }
    };
}

blend_fn3!(hue, |p: &Pipeline| {
    let c = (p.r * p.a, p.g * p.a, p.b * p.a);
    let c = set_sat(c, sat(p.dr, p.dg, p.db) * p.a);
    let c = set_lum(c, lum(p.dr, p.dg, p.db) * p.a);
    clip_color(c, p.a * p.da)
});

blend_fn3!(saturation, |p: &Pipeline| {
    let c = (p.dr * p.a, p.dg * p.a, p.db * p.a);
    let c = set_sat(c, sat(p.r, p.g, p.b) * p.da);
    // Saturation moved the luminance, so it's restored.
    let c = set_lum(c, lum(p.dr, p.dg, p.db) * p.a);
    clip_color(c, p.a * p.da)
});

blend_fn3!(color, |p: &Pipeline| {
    let c = (p.r * p.da, p.g * p.da, p.b * p.da);
    let c = set_lum(c, lum(p.dr, p.dg, p.db) * p.a);
    clip_color(c, p.a * p.da)
});

blend_fn3!(luminosity, |p: &Pipeline| {
    let c = (p.dr * p.a, p.dg * p.a, p.db * p.a);
    let c = set_lum(c, lum(p.r, p.g, p.b) * p.da);
    clip_color(c, p.a * p.da)
});

fn seed_shader(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Seed);

    // Pixel centers.
    p.r = f32x8::splat(p.dx as f32) + f32x8::from(ctx.iota);
    p.g = f32x8::splat(p.dy as f32 + 0.5);
    p.b = f32x8::splat(1.0);
    p.a = f32x8::default();

    p.dr = f32x8::default();
    p.dg = f32x8::default();
    p.db = f32x8::default();
    p.da = f32x8::default();

    Flow::Next
}

fn matrix_translate(p: &mut Pipeline, ctx: &Context) -> Flow {
    let m = ctx!(ctx, Translate);
    p.r = p.r + f32x8::splat(m[0]);
    p.g = p.g + f32x8::splat(m[1]);

    Flow::Next
}

fn matrix_scale_translate(p: &mut Pipeline, ctx: &Context) -> Flow {
    let m = ctx!(ctx, ScaleTranslate);
    p.r = mad(p.r, f32x8::splat(m[0]), f32x8::splat(m[2]));
    p.g = mad(p.g, f32x8::splat(m[1]), f32x8::splat(m[3]));

    Flow::Next
}

fn matrix_2x3(p: &mut Pipeline, ctx: &Context) -> Flow {
    let m = ctx!(ctx, Matrix2x3).map(f32x8::splat);

    let (r, g) = (p.r, p.g);
    p.r = mad(r, m[0], mad(g, m[2], m[4]));
    p.g = mad(r, m[1], mad(g, m[3], m[5]));

    Flow::Next
}

fn matrix_3x4(p: &mut Pipeline, ctx: &Context) -> Flow {
    let m = ctx!(ctx, Matrix3x4).map(f32x8::splat);

    let (r, g, b) = (p.r, p.g, p.b);
    p.r = mad(r, m[0], mad(g, m[3], mad(b, m[6], m[ 9])));
    p.g = mad(r, m[1], mad(g, m[4], mad(b, m[7], m[10])));
    p.b = mad(r, m[2], mad(g, m[5], mad(b, m[8], m[11])));

    Flow::Next
}

fn matrix_4x5(p: &mut Pipeline, ctx: &Context) -> Flow {
    let m = ctx!(ctx, Matrix4x5).map(f32x8::splat);

    let (r, g, b, a) = (p.r, p.g, p.b, p.a);
    p.r = mad(r, m[0], mad(g, m[4], mad(b, m[ 8], mad(a, m[12], m[16]))));
    p.g = mad(r, m[1], mad(g, m[5], mad(b, m[ 9], mad(a, m[13], m[17]))));
    p.b = mad(r, m[2], mad(g, m[6], mad(b, m[10], mad(a, m[14], m[18]))));
    p.a = mad(r, m[3], mad(g, m[7], mad(b, m[11], mad(a, m[15], m[19]))));

    Flow::Next
}

fn matrix_perspective(p: &mut Pipeline, ctx: &Context) -> Flow {
    // N.B. Unlike the other matrix stages, this one is row-major.
    let m = ctx!(ctx, Perspective).map(f32x8::splat);

    let (r, g) = (p.r, p.g);
    let x = mad(r, m[0], mad(g, m[1], m[2]));
    let y = mad(r, m[3], mad(g, m[4], m[5]));
    let z = mad(r, m[6], mad(g, m[7], m[8]));

    let z = z.recip();
    p.r = x * z;
    p.g = y * z;

    Flow::Next
}

fn clamp_x(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Tile);
    p.r = exclusive_clamp(p.r, ctx.scale);
    Flow::Next
}

fn clamp_y(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Tile);
    p.g = exclusive_clamp(p.g, ctx.scale);
    Flow::Next
}

fn repeat_x(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Tile);
    p.r = exclusive_clamp(exclusive_repeat(p.r, ctx), ctx.scale);
    Flow::Next
}

fn repeat_y(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Tile);
    p.g = exclusive_clamp(exclusive_repeat(p.g, ctx), ctx.scale);
    Flow::Next
}

fn mirror_x(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Tile);
    p.r = exclusive_clamp(exclusive_mirror(p.r, ctx), ctx.scale);
    Flow::Next
}

fn mirror_y(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Tile);
    p.g = exclusive_clamp(exclusive_mirror(p.g, ctx), ctx.scale);
    Flow::Next
}

fn clamp_x_1(p: &mut Pipeline, _: &Context) -> Flow {
    p.r = p.r.normalize();
    Flow::Next
}

fn repeat_x_1(p: &mut Pipeline, _: &Context) -> Flow {
    p.r = (p.r - p.r.floor()).normalize();
    Flow::Next
}

fn mirror_x_1(p: &mut Pipeline, _: &Context) -> Flow {
    let one = f32x8::splat(1.0);
    let r = p.r - one;
    p.r = (r - two((r * f32x8::splat(0.5)).floor()) - one).abs().normalize();

    Flow::Next
}

fn scale_1_float(p: &mut Pipeline, ctx: &Context) -> Flow {
    let c = f32x8::splat(*ctx!(ctx, Scalar));
    p.r *= c;
    p.g *= c;
    p.b *= c;
    p.a *= c;

    Flow::Next
}

fn scale_u8<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, A8);
    let c = load_u8::<TAIL>(p, ctx);
    p.r *= c;
    p.g *= c;
    p.b *= c;
    p.a *= c;

    Flow::Next
}

fn scale_565<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U16);
    let (cr, cg, cb) = from_565(load_u16::<TAIL>(p, ctx));
    let ca = alpha_coverage_from_rgb_coverage(p.a, p.da, cr, cg, cb);

    p.r *= cr;
    p.g *= cg;
    p.b *= cb;
    p.a *= ca;

    Flow::Next
}

fn lerp_1_float(p: &mut Pipeline, ctx: &Context) -> Flow {
    let c = f32x8::splat(*ctx!(ctx, Scalar));
    p.r = lerp(p.dr, p.r, c);
    p.g = lerp(p.dg, p.g, c);
    p.b = lerp(p.db, p.b, c);
    p.a = lerp(p.da, p.a, c);

    Flow::Next
}

fn lerp_u8<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, A8);
    let c = load_u8::<TAIL>(p, ctx);
    p.r = lerp(p.dr, p.r, c);
    p.g = lerp(p.dg, p.g, c);
    p.b = lerp(p.db, p.b, c);
    p.a = lerp(p.da, p.a, c);

    Flow::Next
}

fn lerp_565<const TAIL: bool>(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, U16);
    let (cr, cg, cb) = from_565(load_u16::<TAIL>(p, ctx));
    let ca = alpha_coverage_from_rgb_coverage(p.a, p.da, cr, cg, cb);

    p.r = lerp(p.dr, p.r, cr);
    p.g = lerp(p.dg, p.g, cg);
    p.b = lerp(p.db, p.b, cb);
    p.a = lerp(p.da, p.a, ca);

    Flow::Next
}

fn linear_gradient_2stops(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, TwoStopGradient);

    let t = p.r;
    // `start + t * factor` may not land exactly on `end`.
    let is_end = t.cmp_eq(f32x8::splat(1.0));
    let eval = |f: f32, s: f32, e: f32| {
        is_end.blend(f32x8::splat(e), mad(t, f32x8::splat(f), f32x8::splat(s)))
    };

    p.r = eval(ctx.factor.r, ctx.start.r, ctx.end.r);
    p.g = eval(ctx.factor.g, ctx.start.g, ctx.end.g);
    p.b = eval(ctx.factor.b, ctx.start.b, ctx.end.b);
    p.a = eval(ctx.factor.a, ctx.start.a, ctx.end.a);

    Flow::Next
}

fn gradient(p: &mut Pipeline, ctx: &Context) -> Flow {
    let ctx = ctx!(ctx, Gradient);

    // N.B. The loop starts at 1 because idx 0 is the color to use before the first stop.
    let t = p.r;
    let mut idx = u32x8::default();
    for t_value in ctx.t_values.iter().skip(1) {
        let n = t.cmp_ge(f32x8::splat(*t_value)).to_u32x8_bitcast() & u32x8::splat(1);
        idx = idx + n;
    }

    let idx: [u32; 8] = idx.into();
    let factors = idx.map(|i| ctx.factors[i as usize]);
    let biases = idx.map(|i| ctx.biases[i as usize]);

    p.r = mad(t, f32x8::from(factors.map(|c| c.r)), f32x8::from(biases.map(|c| c.r)));
    p.g = mad(t, f32x8::from(factors.map(|c| c.g)), f32x8::from(biases.map(|c| c.g)));
    p.b = mad(t, f32x8::from(factors.map(|c| c.b)), f32x8::from(biases.map(|c| c.b)));
    p.a = mad(t, f32x8::from(factors.map(|c| c.a)), f32x8::from(biases.map(|c| c.a)));

    Flow::Next
}


#[inline(always)]
fn load_u8<const TAIL: bool>(p: &Pipeline, ctx: &MemoryCtx<u8>) -> f32x8 {
    let data = ctx.load::<TAIL>(p.dx, p.dy, p.tail);
    f32x8::from(data.map(f32::from)) * f32x8::splat(p.constants.inv_byte_scale)
}

#[inline(always)]
fn load_u16<const TAIL: bool>(p: &Pipeline, ctx: &MemoryCtx<u16>) -> u32x8 {
    u32x8::from(ctx.load::<TAIL>(p.dx, p.dy, p.tail).map(u32::from))
}

#[inline(always)]
fn store_u16<const TAIL: bool>(p: &Pipeline, ctx: &MemoryCtx<u16>, px: u32x8) {
    let px: [u32; 8] = px.into();
    ctx.store::<TAIL>(p.dx, p.dy, p.tail, &px.map(|v| v as u16));
}

#[inline(always)]
fn load_u32<const TAIL: bool>(p: &Pipeline, ctx: &MemoryCtx<u32>) -> u32x8 {
    u32x8::from(ctx.load::<TAIL>(p.dx, p.dy, p.tail))
}

#[inline(always)]
fn store_u32<const TAIL: bool>(p: &Pipeline, ctx: &MemoryCtx<u32>, px: u32x8) {
    ctx.store::<TAIL>(p.dx, p.dy, p.tail, &px.into());
}

#[inline(always)]
fn from_565(px: u32x8) -> (f32x8, f32x8, f32x8) {
    let r = (px & u32x8::splat(31 << 11)).to_f32x8() * f32x8::splat(1.0 / (31 << 11) as f32);
    let g = (px & u32x8::splat(63 <<  5)).to_f32x8() * f32x8::splat(1.0 / (63 <<  5) as f32);
    let b = (px & u32x8::splat(31      )).to_f32x8() * f32x8::splat(1.0 /  31        as f32);
    (r, g, b)
}

#[inline(always)]
fn from_4444(px: u32x8) -> (f32x8, f32x8, f32x8, f32x8) {
    let r = (px & u32x8::splat(15 << 12)).to_f32x8() * f32x8::splat(1.0 / (15 << 12) as f32);
    let g = (px & u32x8::splat(15 <<  8)).to_f32x8() * f32x8::splat(1.0 / (15 <<  8) as f32);
    let b = (px & u32x8::splat(15 <<  4)).to_f32x8() * f32x8::splat(1.0 / (15 <<  4) as f32);
    let a = (px & u32x8::splat(15      )).to_f32x8() * f32x8::splat(1.0 /  15        as f32);
    (r, g, b, a)
}

#[inline(always)]
fn from_8888(px: u32x8, inv_byte_scale: f32) -> (f32x8, f32x8, f32x8, f32x8) {
    let mask = u32x8::splat(0xFF);
    let scale = f32x8::splat(inv_byte_scale);
    let r = ( px        & mask).to_f32x8() * scale;
    let g = ((px >>  8) & mask).to_f32x8() * scale;
    let b = ((px >> 16) & mask).to_f32x8() * scale;
    let a = ( px >> 24        ).to_f32x8() * scale;
    (r, g, b, a)
}

#[inline(always)]
fn to_8888(r: f32x8, g: f32x8, b: f32x8, a: f32x8, byte_scale: f32) -> u32x8 {
    to_unorm(r, byte_scale)
        | to_unorm(g, byte_scale) << 8
        | to_unorm(b, byte_scale) << 16
        | to_unorm(a, byte_scale) << 24
}

#[inline(always)]
fn from_1010102(px: u32x8) -> (f32x8, f32x8, f32x8, f32x8) {
    let mask = u32x8::splat(0x3FF);
    let scale = f32x8::splat(1.0 / 1023.0);
    let r = ( px        & mask).to_f32x8() * scale;
    let g = ((px >> 10) & mask).to_f32x8() * scale;
    let b = ((px >> 20) & mask).to_f32x8() * scale;
    let a = ( px >> 30        ).to_f32x8() * f32x8::splat(1.0 / 3.0);
    (r, g, b, a)
}

#[inline(always)]
fn from_f16(px: [[u16; 4]; STAGE_WIDTH]) -> (f32x8, f32x8, f32x8, f32x8) {
    let channel = |i: usize| f32x8::from(px.map(|v| half::f16::from_bits(v[i]).to_f32()));
    (channel(0), channel(1), channel(2), channel(3))
}

#[inline(always)]
fn from_f32(px: [[f32; 4]; STAGE_WIDTH]) -> (f32x8, f32x8, f32x8, f32x8) {
    let channel = |i: usize| f32x8::from(px.map(|v| v[i]));
    (channel(0), channel(1), channel(2), channel(3))
}

// Clamps into 0..=1, scales and rounds to the nearest even.
#[inline(always)]
fn to_unorm(v: f32x8, scale: f32) -> u32x8 {
    (v.normalize() * f32x8::splat(scale)).round_int().to_u32x8_bitcast()
}

#[inline(always)]
fn gather_ix<T>(ctx: &GatherCtx<T>, x: f32x8, y: f32x8) -> [usize; STAGE_WIDTH] {
    let x = exclusive_clamp(x, ctx.width).trunc_int();
    let y = exclusive_clamp(y, ctx.height).trunc_int();

    // Fits into i32, checked by `GatherCtx::new`.
    let ix = y * i32x8::splat(ctx.stride as i32) + x;
    let ix: [i32; 8] = ix.into();
    ix.map(|i| i as usize)
}

#[inline(always)]
fn gather_u8(ctx: &GatherCtx<u8>, x: f32x8, y: f32x8) -> f32x8 {
    f32x8::from(gather_ix(ctx, x, y).map(|i| f32::from(ctx.pixels[i])))
}

#[inline(always)]
fn gather_u16(ctx: &GatherCtx<u16>, x: f32x8, y: f32x8) -> u32x8 {
    u32x8::from(gather_ix(ctx, x, y).map(|i| u32::from(ctx.pixels[i])))
}

#[inline(always)]
fn gather_u32(ctx: &GatherCtx<u32>, x: f32x8, y: f32x8) -> u32x8 {
    u32x8::from(gather_ix(ctx, x, y).map(|i| ctx.pixels[i]))
}

// A 565 mask has no alpha, so it's derived from the color coverage.
#[inline(always)]
fn alpha_coverage_from_rgb_coverage(
    a: f32x8, da: f32x8, cr: f32x8, cg: f32x8, cb: f32x8,
) -> f32x8 {
    a.cmp_lt(da).blend(cr.min(cg).min(cb), cr.max(cg).max(cb))
}

#[inline(always)]
fn srgb_to_linear(s: f32x8, k: &FromSrgbCoefficients) -> f32x8 {
    let lo = s * f32x8::splat(k.linear_scale);
    let hi = mad(s * s, mad(s, f32x8::splat(k.a), f32x8::splat(k.b)), f32x8::splat(k.c));
    s.cmp_lt(f32x8::splat(k.threshold)).blend(lo, hi)
}

#[inline(always)]
fn linear_to_srgb(l: f32x8, k: &ToSrgbCoefficients) -> f32x8 {
    let t = l.recip_sqrt();
    let lo = l * f32x8::splat(k.linear_scale);
    let hi = mad(t, mad(t, f32x8::splat(k.k0), f32x8::splat(k.k1)), f32x8::splat(k.c))
           * (f32x8::splat(k.d) + t).recip();
    l.cmp_lt(f32x8::splat(k.threshold)).blend(lo, hi)
}

type Rgb = (f32x8, f32x8, f32x8);

#[inline(always)]
fn sat(r: f32x8, g: f32x8, b: f32x8) -> f32x8 {
    r.max(g.max(b)) - r.min(g.min(b))
}

#[inline(always)]
fn lum(r: f32x8, g: f32x8, b: f32x8) -> f32x8 {
    r * f32x8::splat(0.30) + g * f32x8::splat(0.59) + b * f32x8::splat(0.11)
}

// Maps the smallest channel to 0, the largest to `s` and scales the middle one.
#[inline(always)]
fn set_sat((r, g, b): Rgb, s: f32x8) -> Rgb {
    let mn = r.min(g.min(b));
    let mx = r.max(g.max(b));
    let sat = mx - mn;

    let scale = |c: f32x8| sat.cmp_eq(f32x8::default()).blend(f32x8::default(), (c - mn) * s / sat);
    (scale(r), scale(g), scale(b))
}

#[inline(always)]
fn set_lum((r, g, b): Rgb, l: f32x8) -> Rgb {
    let diff = l - lum(r, g, b);
    (r + diff, g + diff, b + diff)
}

#[inline(always)]
fn clip_color((r, g, b): Rgb, a: f32x8) -> Rgb {
    let mn = r.min(g.min(b));
    let mx = r.max(g.max(b));
    let l = lum(r, g, b);

    let clip = |c: f32x8| {
        let c = mn.cmp_ge(f32x8::default()).blend(c, l + (c - l) * l / (l - mn));
        let c = mx.cmp_gt(a).blend(l + (c - l) * (a - l) / (mx - l), c);
        // Rounding can dip a bit below zero.
        c.max(f32x8::default())
    };

    (clip(r), clip(g), clip(b))
}

#[inline(always)]
fn exclusive_repeat(v: f32x8, ctx: &TileCtx) -> f32x8 {
    v - (v * f32x8::splat(ctx.inv_scale)).floor() * f32x8::splat(ctx.scale)
}

#[inline(always)]
fn exclusive_mirror(v: f32x8, ctx: &TileCtx) -> f32x8 {
    let limit = f32x8::splat(ctx.scale);
    let inv_limit = f32x8::splat(ctx.inv_scale * 0.5);
    ((v - limit) - (limit + limit) * ((v - limit) * inv_limit).floor() - limit).abs()
}

// Keeps `v` in a 0..limit range. The upper bound is one ULP below `limit`,
// so truncating it never yields `limit` itself.
#[inline(always)]
fn exclusive_clamp(v: f32x8, limit: f32) -> f32x8 {
    v.max(f32x8::default()).min(f32x8::splat(ulp_sub(limit)))
}

#[inline(always)]
fn ulp_sub(v: f32) -> f32 {
    // Only positive finite limits are allowed, so this never underflows.
    f32::from_bits(v.to_bits() - 1)
}

#[inline(always)]
fn inv(v: f32x8) -> f32x8 {
    f32x8::splat(1.0) - v
}

#[inline(always)]
fn two(v: f32x8) -> f32x8 {
    v + v
}

#[inline(always)]
fn mad(f: f32x8, m: f32x8, a: f32x8) -> f32x8 {
    f * m + a
}

#[inline(always)]
fn lerp(from: f32x8, to: f32x8, t: f32x8) -> f32x8 {
    mad(to - from, t, from)
}
