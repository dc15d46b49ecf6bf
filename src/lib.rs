/*!
`raster-pipeline` is a per-pixel raster stage pipeline, modeled after Skia's
`SkRasterPipeline`.

A pipeline is an ordered list of small stages: pixel format loads and stores,
color space conversions, compositing, coordinate transforms, tiling
and gradient evaluation. Stages operate on eight pixels at once, held in a set
of `f32x8` registers, and are linked into a program that is run row by row.

```
use raster_pipeline::{ColorU8, MemoryCtx, RasterPipelineBuilder, Stage};

let mut pixels = [ColorU8::from_rgba(0x20, 0x40, 0x80, 0xFF).get(); 10];
let mut p = RasterPipelineBuilder::new();
p.push(Stage::BlackColor);
p.push_with_context(Stage::Store8888, MemoryCtx::new_mut(&mut pixels[..]));
p.compile().run_row(0, 0, 10);

assert_eq!(pixels[9], ColorU8::from_rgba(0, 0, 0, 0xFF).get());
```
*/

#![warn(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]

#![allow(clippy::approx_constant)]
#![allow(clippy::excessive_precision)]
#![allow(clippy::float_cmp)]
#![allow(clippy::identity_op)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::unusual_byte_groupings)]

extern crate alloc;

mod color;
mod pipeline;
mod screen_int_rect;
mod wide;

pub use color::{Color, ColorU8};
pub use screen_int_rect::ScreenIntRect;

pub use pipeline::{RasterPipeline, RasterPipelineBuilder, Stage, STAGES_COUNT, MAX_STAGES, STAGE_WIDTH};
pub use pipeline::{PipelineConstants, FromSrgbCoefficients, ToSrgbCoefficients};
pub use pipeline::{Context, ContextKind, MemoryCtx, LoadTablesCtx, GatherCtx, SeedShaderCtx, TileCtx};
pub use pipeline::{GradientColor, GradientStop, GradientCtx, TwoStopGradientCtx};

/// An integer length that is guarantee to be > 0
type LengthU32 = core::num::NonZeroU32;
