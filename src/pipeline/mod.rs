// Copyright 2016 Google Inc.
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/*!
A raster pipeline implementation.

Follows the same core principles as `SkRasterPipeline`:

1. A pipeline consists of stages.
1. Each stage has its own context. Unlike Skia, contexts are a typed enum
   instead of untyped pointers, and the builder checks that each stage got
   the variant it expects.
1. All stages share an immutable set of constants. See `PipelineConstants`.
1. Each stage has a high precision implementation working on eight pixels at once.
   See `highp.rs`.
1. Each stage returns to the driver loop after it's done, and the loop
   calls the next one. Skia chains stages via tail calls instead,
   which we cannot express in Rust.
1. The pipeline "compilation" produces two lists of function pointers:
   one for full-width chunks and one for the last, narrower chunk of a row.
   Both end with a pointer to the "return" function,
   which simply stops the execution of the program.

A typical program looks like:

```text
seed_shader -> matrix_2x3 -> repeat_x -> repeat_y -> gather_8888
            -> load_8888_dst -> source_over -> store_8888 -> just_return
```
*/

use arrayvec::ArrayVec;

use crate::color::Color;
use crate::screen_int_rect::ScreenIntRect;

pub use context::*;
pub use highp::STAGE_WIDTH;

mod context;
mod highp;

/// The maximum number of stages in a single pipeline.
pub const MAX_STAGES: usize = 32; // More than enough.

// Stages plus `just_return`.
const PROGRAM_LEN: usize = MAX_STAGES + 1;

/// A pipeline stage.
///
/// See `Stage::context_kind` for a context each stage expects.
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Stage {
    LoadA8 = 0,
    LoadA8Dst,
    StoreA8,
    LoadG8,
    LoadG8Dst,
    Load565,
    Load565Dst,
    Store565,
    Load4444,
    Load4444Dst,
    Store4444,
    Load8888,
    Load8888Dst,
    Store8888,
    LoadBgra,
    LoadBgraDst,
    StoreBgra,
    Load1010102,
    Load1010102Dst,
    Store1010102,
    LoadF16,
    LoadF16Dst,
    StoreF16,
    LoadF32,
    LoadF32Dst,
    StoreF32,
    LoadTables,
    GatherA8,
    GatherG8,
    Gather565,
    Gather4444,
    Gather8888,
    GatherBgra,
    Gather1010102,
    GatherF16,
    UniformColor,
    BlackColor,
    WhiteColor,
    SetRgb,
    Premultiply,
    PremultiplyDestination,
    Unpremultiply,
    ForceOpaque,
    ForceOpaqueDst,
    FromSrgb,
    FromSrgbDst,
    ToSrgb,
    Invert,
    LuminanceToAlpha,
    Dither,
    Clamp0,
    Clamp1,
    ClampA,
    ClampADst,
    Swap,
    SwapRb,
    MoveSourceToDestination,
    MoveDestinationToSource,
    Clear,
    SourceAtop,
    DestinationAtop,
    SourceIn,
    DestinationIn,
    SourceOut,
    DestinationOut,
    SourceOver,
    DestinationOver,
    Modulate,
    Multiply,
    Plus,
    Screen,
    Xor,
    Darken,
    Lighten,
    Difference,
    Exclusion,
    ColorBurn,
    ColorDodge,
    HardLight,
    Overlay,
    SoftLight,
    Hue,
    Saturation,
    Color,
    Luminosity,
    SeedShader,
    MatrixTranslate,
    MatrixScaleTranslate,
    Matrix2x3,
    Matrix3x4,
    Matrix4x5,
    MatrixPerspective,
    ClampX,
    ClampY,
    RepeatX,
    RepeatY,
    MirrorX,
    MirrorY,
    ClampX1,
    RepeatX1,
    MirrorX1,
    Scale1Float,
    ScaleU8,
    Scale565,
    Lerp1Float,
    LerpU8,
    Lerp565,
    LinearGradient2Stops,
    Gradient,
}

/// The number of `Stage` variants.
pub const STAGES_COUNT: usize = Stage::Gradient as usize + 1;

impl Stage {
    /// Returns the context variant this stage expects.
    pub fn context_kind(self) -> ContextKind {
        use Stage::*;
        match self {
            LoadA8 | LoadA8Dst | StoreA8 | LoadG8 | LoadG8Dst | ScaleU8 | LerpU8 => ContextKind::A8,
            Load565 | Load565Dst | Store565 | Load4444 | Load4444Dst | Store4444 |
            Scale565 | Lerp565 => ContextKind::U16,
            Load8888 | Load8888Dst | Store8888 | LoadBgra | LoadBgraDst | StoreBgra |
            Load1010102 | Load1010102Dst | Store1010102 => ContextKind::U32,
            LoadF16 | LoadF16Dst | StoreF16 => ContextKind::F16,
            LoadF32 | LoadF32Dst | StoreF32 => ContextKind::F32,
            LoadTables => ContextKind::Tables,
            GatherA8 | GatherG8 => ContextKind::Gather8,
            Gather565 | Gather4444 => ContextKind::Gather16,
            Gather8888 | GatherBgra | Gather1010102 => ContextKind::Gather32,
            GatherF16 => ContextKind::GatherF16,
            Scale1Float | Lerp1Float | Dither => ContextKind::Scalar,
            UniformColor => ContextKind::Color,
            SetRgb => ContextKind::Rgb,
            SeedShader => ContextKind::Seed,
            MatrixTranslate => ContextKind::Translate,
            MatrixScaleTranslate => ContextKind::ScaleTranslate,
            Matrix2x3 => ContextKind::Matrix2x3,
            Matrix3x4 => ContextKind::Matrix3x4,
            Matrix4x5 => ContextKind::Matrix4x5,
            MatrixPerspective => ContextKind::Perspective,
            ClampX | ClampY | RepeatX | RepeatY | MirrorX | MirrorY => ContextKind::Tile,
            LinearGradient2Stops => ContextKind::TwoStopGradient,
            Gradient => ContextKind::Gradient,
            _ => ContextKind::None,
        }
    }

    /// Checks that this stage writes into its context.
    pub fn is_store(self) -> bool {
        matches!(
            self,
            Stage::StoreA8 | Stage::Store565 | Stage::Store4444 | Stage::Store8888 |
            Stage::StoreBgra | Stage::Store1010102 | Stage::StoreF16 | Stage::StoreF32
        )
    }
}


/// Coefficients of the sRGB to linear curve.
///
/// `s < threshold ? s * linear_scale : s * s * (s * a + b) + c`
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct FromSrgbCoefficients {
    pub threshold: f32,
    pub linear_scale: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

/// Coefficients of the linear to sRGB curve.
///
/// With `t = 1 / sqrt(l)`:
/// `l < threshold ? l * linear_scale : (t * (t * k0 + k1) + c) / (d + t)`
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ToSrgbCoefficients {
    pub threshold: f32,
    pub linear_scale: f32,
    pub k0: f32,
    pub k1: f32,
    pub c: f32,
    pub d: f32,
}

/// Constants shared by all stages of a pipeline.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PipelineConstants {
    /// A scale used by 8-bit stores. 255 by default.
    pub byte_scale: f32,
    /// A scale used by 8-bit loads. 1/255 by default.
    pub inv_byte_scale: f32,
    /// Used by `FromSrgb` and `FromSrgbDst`.
    pub from_srgb: FromSrgbCoefficients,
    /// Used by `ToSrgb`.
    pub to_srgb: ToSrgbCoefficients,
}

impl Default for PipelineConstants {
    fn default() -> Self {
        PipelineConstants {
            byte_scale: 255.0,
            inv_byte_scale: 1.0 / 255.0,
            from_srgb: FromSrgbCoefficients {
                threshold: 0.055,
                linear_scale: 1.0 / 12.92,
                a: 0.3,
                b: 0.6975,
                c: 0.0025,
            },
            // An 8-bit value converted to linear and back is preserved exactly.
            to_srgb: ToSrgbCoefficients {
                threshold: 0.00465985,
                linear_scale: 12.92,
                k0: -0.0024542345,
                k1: 0.013832027,
                c: 1.129999995232,
                d: 0.141377761960,
            },
        }
    }
}


/// A raster pipeline builder.
///
/// Invalid stages are logged and skipped, so a built pipeline is always valid.
pub struct RasterPipelineBuilder<'a> {
    stages: ArrayVec<Stage, MAX_STAGES>,
    contexts: ArrayVec<Context<'a>, MAX_STAGES>,
    constants: PipelineConstants,
}

impl<'a> RasterPipelineBuilder<'a> {
    /// Creates a new, empty builder.
    pub fn new() -> Self {
        RasterPipelineBuilder {
            stages: ArrayVec::new(),
            contexts: ArrayVec::new(),
            constants: PipelineConstants::default(),
        }
    }

    /// Overrides the default pipeline constants.
    pub fn set_constants(&mut self, constants: PipelineConstants) {
        self.constants = constants;
    }

    /// Returns the number of pushed stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Checks that no stages were pushed.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns pushed stages.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Pushes a stage that doesn't require a context.
    pub fn push(&mut self, stage: Stage) {
        self.push_with_context(stage, Context::None);
    }

    /// Pushes a stage with a context.
    ///
    /// The stage will be skipped when the context variant doesn't match
    /// `Stage::context_kind`, when a store stage gets read-only memory
    /// or when the pipeline is full.
    pub fn push_with_context(&mut self, stage: Stage, ctx: impl Into<Context<'a>>) {
        let ctx = ctx.into();

        if stage.context_kind() != ctx.kind() {
            log::warn!("{:?} requires a {:?} context, not {:?}. Skipped.",
                       stage, stage.context_kind(), ctx.kind());
            return;
        }

        if stage.is_store() && !ctx.is_writable() {
            log::warn!("{:?} cannot store into read-only memory. Skipped.", stage);
            return;
        }

        if self.stages.is_full() {
            log::warn!("a pipeline cannot have more than {} stages. {:?} skipped.",
                       MAX_STAGES, stage);
            return;
        }

        self.stages.push(stage);
        self.contexts.push(ctx);
    }

    /// Pushes `UniformColor`.
    ///
    /// The color is used as is. Premultiply it beforehand when needed.
    pub fn push_uniform_color(&mut self, c: Color) {
        self.push_with_context(Stage::UniformColor, c);
    }

    /// Pushes `SetRgb`.
    pub fn push_set_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.push_with_context(Stage::SetRgb, Context::Rgb([r, g, b]));
    }

    /// Pushes `Scale1Float`.
    pub fn push_scale_1_float(&mut self, c: f32) {
        self.push_with_context(Stage::Scale1Float, Context::Scalar(c));
    }

    /// Pushes `Lerp1Float`.
    pub fn push_lerp_1_float(&mut self, c: f32) {
        self.push_with_context(Stage::Lerp1Float, Context::Scalar(c));
    }

    /// Pushes `Dither`.
    ///
    /// Typical rates are `1/255` for 8-bit and `1/63` for 565 destinations.
    pub fn push_dither(&mut self, rate: f32) {
        self.push_with_context(Stage::Dither, Context::Scalar(rate));
    }

    /// Pushes `SeedShader` sampling at pixel centers.
    pub fn push_seed_shader(&mut self) {
        self.push_with_context(Stage::SeedShader, SeedShaderCtx::default());
    }

    /// Pushes `MatrixTranslate`.
    pub fn push_translate(&mut self, tx: f32, ty: f32) {
        self.push_matrix(Stage::MatrixTranslate, Context::Translate([tx, ty]), &[tx, ty]);
    }

    /// Pushes `MatrixScaleTranslate`.
    pub fn push_scale_translate(&mut self, sx: f32, sy: f32, tx: f32, ty: f32) {
        self.push_matrix(
            Stage::MatrixScaleTranslate,
            Context::ScaleTranslate([sx, sy, tx, ty]),
            &[sx, sy, tx, ty],
        );
    }

    /// Pushes `Matrix2x3`.
    ///
    /// The matrix is column-major: `[sx, ky, kx, sy, tx, ty]`.
    /// An identity matrix is skipped.
    pub fn push_matrix_2x3(&mut self, m: [f32; 6]) {
        if m == [1.0, 0.0, 0.0, 1.0, 0.0, 0.0] {
            return;
        }

        self.push_matrix(Stage::Matrix2x3, Context::Matrix2x3(m), &m);
    }

    /// Pushes `Matrix3x4`.
    ///
    /// The matrix is column-major with the translation in the last column.
    pub fn push_matrix_3x4(&mut self, m: [f32; 12]) {
        self.push_matrix(Stage::Matrix3x4, Context::Matrix3x4(m), &m);
    }

    /// Pushes `Matrix4x5`, a color matrix.
    ///
    /// The matrix is column-major with the bias in the last column.
    pub fn push_matrix_4x5(&mut self, m: [f32; 20]) {
        self.push_matrix(Stage::Matrix4x5, Context::Matrix4x5(m), &m);
    }

    /// Pushes `MatrixPerspective`.
    ///
    /// The matrix is row-major.
    pub fn push_matrix_perspective(&mut self, m: [f32; 9]) {
        self.push_matrix(Stage::MatrixPerspective, Context::Perspective(m), &m);
    }

    fn push_matrix(&mut self, stage: Stage, ctx: Context<'a>, values: &[f32]) {
        if !values.iter().all(|v| v.is_finite()) {
            log::warn!("{:?} with a non-finite matrix. Skipped.", stage);
            return;
        }

        self.push_with_context(stage, ctx);
    }

    /// Pushes a tiling stage.
    ///
    /// `stage` must be one of `ClampX`, `ClampY`, `RepeatX`, `RepeatY`,
    /// `MirrorX` or `MirrorY`. An invalid limit skips the stage.
    pub fn push_tile(&mut self, stage: Stage, limit: f32) {
        match TileCtx::new(limit) {
            Some(ctx) => self.push_with_context(stage, ctx),
            None => log::warn!("{:?} with an invalid limit {}. Skipped.", stage, limit),
        }
    }

    /// Pushes `LinearGradient2Stops`.
    pub fn push_linear_gradient_2stops(&mut self, start: GradientColor, end: GradientColor) {
        self.push_with_context(Stage::LinearGradient2Stops, TwoStopGradientCtx::new(start, end));
    }

    /// Pushes `Gradient`.
    ///
    /// Less than two stops skip the stage.
    pub fn push_gradient(&mut self, stops: &[GradientStop]) {
        if let Some(ctx) = GradientCtx::new(stops) {
            self.push_with_context(Stage::Gradient, ctx);
        }
    }

    /// Links pushed stages into a program.
    pub fn compile(self) -> RasterPipeline<'a> {
        let mut functions: ArrayVec<highp::StageFn, PROGRAM_LEN> = self.stages.iter()
            .map(|stage| highp::STAGES[*stage as usize])
            .collect();
        functions.push(highp::just_return as highp::StageFn);

        // Memory stages have a separate implementation for the last,
        // partial chunk of a row. Everything else is the same function.
        let mut tail_functions: ArrayVec<highp::StageFn, PROGRAM_LEN> = self.stages.iter()
            .map(|stage| highp::TAIL_STAGES[*stage as usize])
            .collect();
        tail_functions.push(highp::just_return as highp::StageFn);

        let mut contexts: ArrayVec<Context<'a>, PROGRAM_LEN> = self.contexts.into_iter().collect();
        contexts.push(Context::None);

        log::debug!("compiled a pipeline with {} stages", self.stages.len());

        RasterPipeline {
            stages: self.stages,
            functions,
            tail_functions,
            contexts,
            constants: self.constants,
        }
    }
}

impl Default for RasterPipelineBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for RasterPipelineBuilder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RasterPipelineBuilder")
            .field("stages", &self.stages)
            .field("constants", &self.constants)
            .finish()
    }
}


/// A compiled raster pipeline.
///
/// Can be run any number of times. Store stages write through their
/// contexts, so the results are visible after each run.
pub struct RasterPipeline<'a> {
    stages: ArrayVec<Stage, MAX_STAGES>,
    functions: ArrayVec<highp::StageFn, PROGRAM_LEN>,
    tail_functions: ArrayVec<highp::StageFn, PROGRAM_LEN>,
    contexts: ArrayVec<Context<'a>, PROGRAM_LEN>,
    constants: PipelineConstants,
}

impl RasterPipeline<'_> {
    /// Returns compiled stages, without the final `just_return`.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns pipeline constants.
    pub fn constants(&self) -> &PipelineConstants {
        &self.constants
    }

    /// Processes `x..end` pixels of row `y`.
    ///
    /// Does nothing when `end <= x`.
    pub fn run_row(&self, x: usize, y: usize, end: usize) {
        highp::start(
            &self.functions,
            &self.tail_functions,
            &self.contexts,
            &self.constants,
            x,
            y,
            end,
        );
    }

    /// Processes every row of a rectangle.
    pub fn run(&self, rect: &ScreenIntRect) {
        let columns = rect.columns();
        for y in rect.rows() {
            self.run_row(columns.start, y, columns.end);
        }
    }
}

impl core::fmt::Debug for RasterPipeline<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RasterPipeline")
            .field("stages", &self.stages)
            .field("constants", &self.constants)
            .finish()
    }
}
