use raster_pipeline::*;

// Runs stages over `len` pixels and returns the source registers.
fn registers_after(stages: Vec<(Stage, Context)>, len: usize) -> Vec<[f32; 4]> {
    let mut out = vec![[0.0f32; 4]; len];
    let mut p = RasterPipelineBuilder::new();
    for (stage, ctx) in stages {
        p.push_with_context(stage, ctx);
    }
    p.push_with_context(Stage::StoreF32, MemoryCtx::new_mut(&mut out[..]));
    p.compile().run_row(0, 0, len);
    out
}

fn stage(stage: Stage) -> (Stage, Context<'static>) {
    (stage, Context::None)
}

static DESTINATIONS: [[f32; 4]; 5] = [
    [0.2, 0.3, 0.1, 0.5],
    [0.9, 0.1, 0.0, 1.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.25, 0.5, 0.75, 0.75],
    [0.01, 0.02, 0.03, 0.04],
];

#[test]
fn source_over_transparent_source() {
    let regs = registers_after(vec![
        (Stage::LoadF32Dst, MemoryCtx::new(&DESTINATIONS[..]).into()),
        (Stage::UniformColor, Color::TRANSPARENT.into()),
        stage(Stage::SourceOver),
    ], DESTINATIONS.len());

    assert_eq!(regs, DESTINATIONS.to_vec());
}

#[test]
fn source_over_opaque_source() {
    let src = Color::from_rgba(0.1, 0.6, 0.3, 1.0).unwrap();
    let regs = registers_after(vec![
        (Stage::LoadF32Dst, MemoryCtx::new(&DESTINATIONS[..]).into()),
        (Stage::UniformColor, src.into()),
        stage(Stage::SourceOver),
    ], DESTINATIONS.len());

    for px in regs {
        assert_eq!(px, [0.1, 0.6, 0.3, 1.0]);
    }
}

#[test]
fn destination_over() {
    let src = [[0.5f32, 0.25, 0.125, 0.5]];

    // An opaque destination wins.
    let dst = [[0.1f32, 0.2, 0.3, 1.0]];
    let regs = registers_after(vec![
        (Stage::LoadF32, MemoryCtx::new(&src[..]).into()),
        (Stage::LoadF32Dst, MemoryCtx::new(&dst[..]).into()),
        stage(Stage::DestinationOver),
    ], 1);
    assert_eq!(regs[0], dst[0]);

    // A transparent one is ignored.
    let dst = [[0.0f32; 4]];
    let regs = registers_after(vec![
        (Stage::LoadF32, MemoryCtx::new(&src[..]).into()),
        (Stage::LoadF32Dst, MemoryCtx::new(&dst[..]).into()),
        stage(Stage::DestinationOver),
    ], 1);
    assert_eq!(regs[0], src[0]);
}

#[test]
fn load_after_clear() {
    let src = [0xFF804020u32, 0x80402010, 0, 0xFFFFFFFF];

    let expected = registers_after(vec![
        (Stage::Load8888, MemoryCtx::new(&src[..]).into()),
    ], src.len());

    let regs = registers_after(vec![
        stage(Stage::WhiteColor),
        stage(Stage::Clear),
        (Stage::Load8888, MemoryCtx::new(&src[..]).into()),
    ], src.len());

    assert_eq!(regs, expected);
}

static PLUS_SOURCES: [[f32; 4]; 2] = [
    [0.8, 0.7, 0.6, 0.9],
    [0.25, 0.25, 0.25, 0.5],
];

static PLUS_DESTINATIONS: [[f32; 4]; 2] = [
    [0.6, 0.5, 0.9, 0.8],
    [0.25, 0.5, 0.125, 0.5],
];

#[test]
fn plus_saturates_at_one() {
    let regs = registers_after(vec![
        (Stage::LoadF32Dst, MemoryCtx::new(&PLUS_DESTINATIONS[..]).into()),
        (Stage::LoadF32, MemoryCtx::new(&PLUS_SOURCES[..]).into()),
        stage(Stage::Plus),
    ], 2);

    assert_eq!(regs[0], [1.0, 1.0, 1.0, 1.0]);
    assert_eq!(regs[1], [0.5, 0.75, 0.375, 1.0]);
}

static OUT_OF_RANGE: [[f32; 4]; 5] = [
    [-1.0, 0.5, 2.0, 0.75],
    [0.3, 1.5, -0.2, 0.5],
    [2.0, 2.0, 2.0, 2.0],
    [0.5, 0.25, 0.75, -1.0],
    [0.0, 1.0, 0.0, 1.0],
];

fn clamped(stages: &[Stage]) -> Vec<[f32; 4]> {
    let mut list = vec![(Stage::LoadF32, MemoryCtx::new(&OUT_OF_RANGE[..]).into())];
    list.extend(stages.iter().map(|s| stage(*s)));
    registers_after(list, OUT_OF_RANGE.len())
}

#[test]
fn clamp_0() {
    let once = clamped(&[Stage::Clamp0]);
    assert_eq!(once, clamped(&[Stage::Clamp0, Stage::Clamp0]));
    assert!(once.iter().flatten().all(|v| *v >= 0.0));
    assert_eq!(once[0], [0.0, 0.5, 2.0, 0.75]);
}

#[test]
fn clamp_1() {
    let once = clamped(&[Stage::Clamp1]);
    assert_eq!(once, clamped(&[Stage::Clamp1, Stage::Clamp1]));
    assert!(once.iter().flatten().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(once[1], [0.3, 1.0, 0.0, 0.5]);
}

#[test]
fn clamp_a() {
    let once = clamped(&[Stage::ClampA]);
    assert_eq!(once, clamped(&[Stage::ClampA, Stage::ClampA]));
    for px in &once {
        assert!(px[3] <= 1.0);
        assert!(px[0] <= px[3] && px[1] <= px[3] && px[2] <= px[3]);
    }
    assert_eq!(once[2], [1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn clamp_a_dst() {
    let via_dst = clamped(&[
        Stage::MoveSourceToDestination,
        Stage::ClampADst,
        Stage::MoveDestinationToSource,
    ]);
    assert_eq!(via_dst, clamped(&[Stage::ClampA]));
}

#[test]
fn premultiply_and_back() {
    let src = [[0.5f32, 1.0, 0.0, 0.5], [0.25, 0.5, 1.0, 1.0]];

    let regs = registers_after(vec![
        (Stage::LoadF32, MemoryCtx::new(&src[..]).into()),
        stage(Stage::Premultiply),
    ], 2);
    assert_eq!(regs, vec![[0.25, 0.5, 0.0, 0.5], [0.25, 0.5, 1.0, 1.0]]);

    let regs = registers_after(vec![
        (Stage::LoadF32, MemoryCtx::new(&src[..]).into()),
        stage(Stage::Premultiply),
        stage(Stage::Unpremultiply),
    ], 2);
    assert_eq!(regs, src.to_vec());
}

#[test]
fn premultiply_destination() {
    let src = [[0.5f32, 1.0, 0.0, 0.5]];
    let regs = registers_after(vec![
        (Stage::LoadF32Dst, MemoryCtx::new(&src[..]).into()),
        stage(Stage::PremultiplyDestination),
        stage(Stage::MoveDestinationToSource),
    ], 1);
    assert_eq!(regs[0], [0.25, 0.5, 0.0, 0.5]);
}

#[test]
fn unpremultiply_zero_alpha() {
    let src = [[0.3f32, 0.2, 0.1, 0.0], [0.0, 0.0, 0.0, 0.0]];
    let regs = registers_after(vec![
        (Stage::LoadF32, MemoryCtx::new(&src[..]).into()),
        stage(Stage::Unpremultiply),
    ], 2);

    assert_eq!(regs, vec![[0.0; 4], [0.0; 4]]);
    assert!(regs.iter().flatten().all(|v| v.is_finite()));
}

#[test]
fn register_moves() {
    static SRC: [[f32; 4]; 1] = [[0.1, 0.2, 0.3, 0.4]];
    static DST: [[f32; 4]; 1] = [[0.5, 0.6, 0.7, 0.8]];
    let (src, dst) = (&SRC, &DST);
    let load = |stages: &[Stage]| {
        let mut list = vec![
            (Stage::LoadF32, MemoryCtx::new(&SRC[..]).into()),
            (Stage::LoadF32Dst, MemoryCtx::new(&DST[..]).into()),
        ];
        list.extend(stages.iter().map(|s| stage(*s)));
        registers_after(list, 1)[0]
    };

    assert_eq!(load(&[Stage::Swap]), dst[0]);
    assert_eq!(load(&[Stage::Swap, Stage::Swap]), src[0]);
    assert_eq!(load(&[Stage::SwapRb]), [0.3, 0.2, 0.1, 0.4]);
    assert_eq!(load(&[Stage::MoveDestinationToSource]), dst[0]);
    assert_eq!(load(&[Stage::MoveSourceToDestination, Stage::Swap]), src[0]);
}

#[test]
fn constant_colors() {
    static SRC: [[f32; 4]; 1] = [[0.125, 0.25, 0.375, 0.5]];
    let load = |stages: Vec<(Stage, Context<'static>)>| {
        let mut list = vec![(Stage::LoadF32, MemoryCtx::new(&SRC[..]).into())];
        list.extend(stages);
        registers_after(list, 1)[0]
    };

    assert_eq!(load(vec![stage(Stage::BlackColor)]), [0.0, 0.0, 0.0, 1.0]);
    assert_eq!(load(vec![stage(Stage::WhiteColor)]), [1.0, 1.0, 1.0, 1.0]);
    assert_eq!(load(vec![stage(Stage::ForceOpaque)]), [0.125, 0.25, 0.375, 1.0]);
    assert_eq!(load(vec![(Stage::SetRgb, Context::Rgb([0.5, 0.25, 1.0]))]), [0.5, 0.25, 1.0, 0.5]);
    assert_eq!(load(vec![stage(Stage::Invert)]), [0.875, 0.75, 0.625, 0.5]);
    assert_eq!(
        load(vec![stage(Stage::MoveSourceToDestination), stage(Stage::ForceOpaqueDst), stage(Stage::Swap)]),
        [0.125, 0.25, 0.375, 1.0]
    );
}

#[test]
fn luminance_to_alpha() {
    let src = [[1.0f32, 1.0, 1.0, 0.5], [1.0, 0.0, 0.0, 1.0]];
    let regs = registers_after(vec![
        (Stage::LoadF32, MemoryCtx::new(&src[..]).into()),
        stage(Stage::LuminanceToAlpha),
    ], 2);

    assert_eq!(regs[0][..3], [0.0, 0.0, 0.0]);
    assert!((regs[0][3] - 1.0).abs() < 1e-6);
    assert!((regs[1][3] - 0.2126).abs() < 1e-6);
}

#[test]
fn coverage() {
    let dst = [[0.25f32; 4]; 3];
    let mask = [0u8, 255, 51];
    let mask565 = [0x0000u16, 0xFFFF, 0xF800];

    let with_mask = |stage: Stage, ctx: Context| {
        registers_after(vec![
            (Stage::LoadF32Dst, MemoryCtx::new(&dst[..]).into()),
            (Stage::UniformColor, Color::from_rgba(0.75, 0.75, 0.75, 0.75).unwrap().into()),
            (stage, ctx),
        ], 3)
    };

    let regs = with_mask(Stage::ScaleU8, MemoryCtx::new(&mask[..]).into());
    assert_eq!(regs[0], [0.0; 4]);
    assert_eq!(regs[1], [0.75; 4]);
    assert!((regs[2][0] - 0.15).abs() < 1e-6);

    let regs = with_mask(Stage::LerpU8, MemoryCtx::new(&mask[..]).into());
    assert_eq!(regs[0], [0.25; 4]);
    assert_eq!(regs[1], [0.75; 4]);
    assert!((regs[2][0] - 0.35).abs() < 1e-6);

    let regs = with_mask(Stage::Lerp565, MemoryCtx::new(&mask565[..]).into());
    assert_eq!(regs[0], [0.25; 4]);
    assert_eq!(regs[1], [0.75; 4]);
    // Only red is covered. Alpha takes the max coverage, since src alpha > dst alpha.
    assert_eq!(regs[2], [0.75, 0.25, 0.25, 0.75]);

    let regs = with_mask(Stage::Scale565, MemoryCtx::new(&mask565[..]).into());
    assert_eq!(regs[0], [0.0; 4]);
    assert_eq!(regs[1], [0.75; 4]);
    assert_eq!(regs[2], [0.75, 0.0, 0.0, 0.75]);

    let regs = with_mask(Stage::Scale1Float, Context::Scalar(0.5));
    assert_eq!(regs[0], [0.375; 4]);

    let regs = with_mask(Stage::Lerp1Float, Context::Scalar(0.5));
    assert_eq!(regs[0], [0.5; 4]);
}

#[test]
fn dither() {
    let src = [[0.5f32, 0.5, 0.5, 1.0]; 64];
    let mut out = [[0.0f32; 4]; 64];
    let rate = 1.0 / 255.0;

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::LoadF32, MemoryCtx::with_stride(&src[..], 8).unwrap());
    p.push_dither(rate);
    p.push_with_context(Stage::StoreF32, MemoryCtx::with_stride_mut(&mut out[..], 8).unwrap());
    p.compile().run(&ScreenIntRect::from_xywh(0, 0, 8, 8).unwrap());

    let mut sum = 0.0;
    for px in out.iter() {
        assert!((px[0] - 0.5).abs() <= rate * 0.5);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[0], px[2]);
        assert_eq!(px[3], 1.0);
        sum += px[0] - 0.5;
    }

    // An 8x8 block of an ordered dither is balanced.
    assert!(sum.abs() < 1e-5);
}

#[test]
fn dither_stays_within_alpha() {
    let src = [[0.0f32, 0.0, 0.5, 0.5], [0.5, 0.5, 0.5, 0.5]];
    let regs = registers_after(vec![
        (Stage::LoadF32, MemoryCtx::new(&src[..]).into()),
        (Stage::Dither, Context::Scalar(1.0)),
    ], 2);

    for px in regs {
        for v in &px[..3] {
            assert!(*v >= 0.0 && *v <= px[3]);
        }
    }
}

#[test]
fn load_premultiply_source_over_scenario() {
    let src = [0xFF804020u32];
    let dst = [0u32];

    let regs = registers_after(vec![
        (Stage::Load8888, MemoryCtx::new(&src[..]).into()),
        stage(Stage::Premultiply),
        (Stage::Load8888Dst, MemoryCtx::new(&dst[..]).into()),
        stage(Stage::SourceOver),
    ], 1);

    let expected = [0x20 as f32 / 255.0, 0x40 as f32 / 255.0, 0x80 as f32 / 255.0, 1.0];
    for (a, b) in regs[0].iter().zip(expected.iter()) {
        assert!((a - b).abs() < 1e-6);
    }

    let mut out = [0u32];
    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::Load8888, MemoryCtx::new(&src[..]));
    p.push(Stage::Premultiply);
    p.push_with_context(Stage::Load8888Dst, MemoryCtx::new(&dst[..]));
    p.push(Stage::SourceOver);
    p.push_with_context(Stage::Store8888, MemoryCtx::new_mut(&mut out[..]));
    p.compile().run_row(0, 0, 1);
    assert_eq!(out, src);
}

#[test]
fn in_place_blending() {
    let mut pixels = [ColorU8::from_rgba(0, 0, 255, 255).get(); 11];
    let cells = std::cell::Cell::from_mut(&mut pixels[..]).as_slice_of_cells();

    let mut p = RasterPipelineBuilder::new();
    p.push_uniform_color(Color::from_rgba(1.0, 0.0, 0.0, 1.0).unwrap().premultiply());
    p.push_scale_1_float(0.5);
    p.push_with_context(Stage::Load8888Dst, MemoryCtx::from_cells(cells, cells.len()));
    p.push(Stage::SourceOver);
    p.push_with_context(Stage::Store8888, MemoryCtx::from_cells(cells, cells.len()));
    p.compile().run_row(0, 0, cells.len());

    for px in pixels {
        assert_eq!(ColorU8::from_packed(px), ColorU8::from_rgba(128, 0, 128, 255));
    }
}
