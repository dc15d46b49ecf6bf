use raster_pipeline::*;

// A tiny deterministic generator, good enough for picking pixels.
fn lcg(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

fn random_u32(len: usize) -> Vec<u32> {
    let mut seed = 7;
    (0..len).map(|_| lcg(&mut seed)).collect()
}

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

#[test]
fn a8_round_trip() {
    let src: Vec<u8> = (0..=255).collect();
    let mut dst = vec![0u8; src.len()];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::LoadA8, MemoryCtx::new(&src[..]));
    p.push_with_context(Stage::StoreA8, MemoryCtx::new_mut(&mut dst[..]));
    p.compile().run_row(0, 0, src.len());

    assert_eq!(src, dst);
}

#[test]
fn a8_clears_rgb() {
    let src = [0x80u8; 3];
    let regs = registers_after(vec![
        (Stage::WhiteColor, Context::None),
        (Stage::LoadA8, MemoryCtx::new(&src[..]).into()),
    ], 3);

    for px in regs {
        assert_eq!(px[..3], [0.0, 0.0, 0.0]);
        assert!((px[3] - 128.0 / 255.0).abs() < 1e-6);
    }
}

#[test]
fn g8_is_opaque_gray() {
    let src = [0u8, 0x40, 0xFF];
    let mut dst = [0u32; 3];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::LoadG8, MemoryCtx::new(&src[..]));
    p.push_with_context(Stage::Store8888, MemoryCtx::new_mut(&mut dst[..]));
    p.compile().run_row(0, 0, 3);

    assert_eq!(dst, [0xFF000000, 0xFF404040, 0xFFFFFFFF]);
}

#[test]
fn rgb565_round_trip() {
    let src: Vec<u16> = (0..=u16::MAX).collect();
    let mut dst = vec![0u16; src.len()];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::Load565, MemoryCtx::new(&src[..]));
    p.push_with_context(Stage::Store565, MemoryCtx::new_mut(&mut dst[..]));
    p.compile().run_row(0, 0, src.len());

    assert!(src == dst);
}

#[test]
fn rgb565_channels() {
    let src = [0xF800u16, 0x07E0, 0x001F];
    let regs = registers_after(vec![(Stage::Load565, MemoryCtx::new(&src[..]).into())], 3);

    assert_eq!(regs, vec![
        [1.0, 0.0, 0.0, 1.0],
        [0.0, 1.0, 0.0, 1.0],
        [0.0, 0.0, 1.0, 1.0],
    ]);
}

#[test]
fn argb4444_round_trip() {
    let src: Vec<u16> = (0..=u16::MAX).collect();
    let mut dst = vec![0u16; src.len()];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::Load4444, MemoryCtx::new(&src[..]));
    p.push_with_context(Stage::Store4444, MemoryCtx::new_mut(&mut dst[..]));
    p.compile().run_row(0, 0, src.len());

    assert!(src == dst);
}

#[test]
fn rgba8888_round_trip() {
    let mut src = random_u32(1000);
    src.extend_from_slice(&[0, u32::MAX, 0xFF804020, 0x00FFFFFF, 0xFF000000]);
    let mut dst = vec![0u32; src.len()];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::Load8888, MemoryCtx::new(&src[..]));
    p.push_with_context(Stage::Store8888, MemoryCtx::new_mut(&mut dst[..]));
    p.compile().run_row(0, 0, src.len());

    assert!(src == dst);
}

#[test]
fn bgra_swaps_red_and_blue() {
    let src = [0xFF804020u32];
    let mut dst = [0u32];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::LoadBgra, MemoryCtx::new(&src[..]));
    p.push_with_context(Stage::Store8888, MemoryCtx::new_mut(&mut dst[..]));
    p.compile().run_row(0, 0, 1);

    assert_eq!(dst, [0xFF204080]);
}

#[test]
fn bgra_round_trip() {
    let src = random_u32(100);
    let mut dst = vec![0u32; src.len()];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::LoadBgra, MemoryCtx::new(&src[..]));
    p.push_with_context(Stage::StoreBgra, MemoryCtx::new_mut(&mut dst[..]));
    p.compile().run_row(0, 0, src.len());

    assert!(src == dst);
}

#[test]
fn rgba1010102_round_trip() {
    let mut src = random_u32(1000);
    src.extend_from_slice(&[0, u32::MAX, 0x3FF, 0x3FF << 10, 0x3FF << 20, 1 << 30, 2 << 30]);
    let mut dst = vec![0u32; src.len()];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::Load1010102, MemoryCtx::new(&src[..]));
    p.push_with_context(Stage::Store1010102, MemoryCtx::new_mut(&mut dst[..]));
    p.compile().run_row(0, 0, src.len());

    assert!(src == dst);
}

#[test]
fn f16_round_trip() {
    let is_nan = |v: u16| v & 0x7C00 == 0x7C00 && v & 0x03FF != 0;
    let values: Vec<u16> = (0..=u16::MAX).filter(|v| !is_nan(*v)).collect();
    let src: Vec<[u16; 4]> = values.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]).collect();
    let mut dst = vec![[0u16; 4]; src.len()];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::LoadF16, MemoryCtx::new(&src[..]));
    p.push_with_context(Stage::StoreF16, MemoryCtx::new_mut(&mut dst[..]));
    p.compile().run_row(0, 0, src.len());

    assert!(src == dst);
}

#[test]
fn f16_values() {
    // 0, 0.5, 1, -2
    let src = [[0x0000u16, 0x3800, 0x3C00, 0xC000]];
    let regs = registers_after(vec![(Stage::LoadF16, MemoryCtx::new(&src[..]).into())], 1);

    assert_eq!(regs, vec![[0.0, 0.5, 1.0, -2.0]]);
}

#[test]
fn f32_round_trip() {
    let src: Vec<[f32; 4]> = (0..37)
        .map(|i| {
            let v = i as f32;
            [v * 0.1, -v, v * 1000.0, 1.0 / (v + 1.0)]
        })
        .collect();
    let mut dst = vec![[0.0f32; 4]; src.len()];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::LoadF32, MemoryCtx::new(&src[..]));
    p.push_with_context(Stage::StoreF32, MemoryCtx::new_mut(&mut dst[..]));
    p.compile().run_row(0, 0, src.len());

    assert_eq!(src, dst);
}

#[test]
fn destination_loads() {
    let a8 = [0xFFu8];
    let rgb565 = [0xF800u16];
    let rgba = [0xFF804020u32];
    let f16 = [[0x3C00u16, 0x3800, 0x0000, 0x3C00]];
    let rgba_f32 = [[0.25f32, 0.5, 0.75, 1.0]];

    let dst_of = |stage: Stage, ctx: Context| {
        registers_after(vec![(stage, ctx), (Stage::MoveDestinationToSource, Context::None)], 1)[0]
    };

    assert_eq!(dst_of(Stage::LoadA8Dst, MemoryCtx::new(&a8[..]).into()), [0.0, 0.0, 0.0, 1.0]);
    assert_eq!(dst_of(Stage::LoadG8Dst, MemoryCtx::new(&a8[..]).into()), [1.0, 1.0, 1.0, 1.0]);
    assert_eq!(dst_of(Stage::Load565Dst, MemoryCtx::new(&rgb565[..]).into()), [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(dst_of(Stage::LoadF16Dst, MemoryCtx::new(&f16[..]).into()), [1.0, 0.5, 0.0, 1.0]);
    assert_eq!(dst_of(Stage::LoadF32Dst, MemoryCtx::new(&rgba_f32[..]).into()), rgba_f32[0]);

    let expected = [0x20 as f32 / 255.0, 0x40 as f32 / 255.0, 0x80 as f32 / 255.0, 1.0];
    let loaded = dst_of(Stage::Load8888Dst, MemoryCtx::new(&rgba[..]).into());
    for (a, b) in loaded.iter().zip(expected.iter()) {
        assert!((a - b).abs() < 1e-6);
    }

    let loaded = dst_of(Stage::LoadBgraDst, MemoryCtx::new(&rgba[..]).into());
    assert!((loaded[0] - 0x80 as f32 / 255.0).abs() < 1e-6);
    assert!((loaded[2] - 0x20 as f32 / 255.0).abs() < 1e-6);
}

#[test]
fn load_tables() {
    let mut r = [0.0f32; 256];
    let mut g = [0.0f32; 256];
    let mut b = [0.0f32; 256];
    for i in 0..256 {
        r[i] = i as f32;
        g[i] = -(i as f32);
        b[i] = (i * 2) as f32;
    }

    let src = [0xFF030201u32, 0x80FFFEFD];
    let ctx = LoadTablesCtx::new(MemoryCtx::new(&src[..]), &r, &g, &b);
    let regs = registers_after(vec![(Stage::LoadTables, ctx.into())], 2);

    assert_eq!(regs[0], [1.0, -2.0, 6.0, 1.0]);
    assert_eq!(regs[1][..3], [253.0, -254.0, 510.0]);
    assert!((regs[1][3] - 128.0 / 255.0).abs() < 1e-6);
}

#[test]
fn srgb_round_trip() {
    let src: Vec<u32> = (0..=255u32).map(|v| 0xFF000000 | v << 16 | v << 8 | v).collect();
    let mut dst = vec![0u32; src.len()];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::Load8888, MemoryCtx::new(&src[..]));
    p.push(Stage::FromSrgb);
    p.push(Stage::ToSrgb);
    p.push_with_context(Stage::Store8888, MemoryCtx::new_mut(&mut dst[..]));
    p.compile().run_row(0, 0, src.len());

    assert!(src == dst);
}

#[test]
fn from_srgb_curve() {
    let src = [[0.0f32, 0.5, 1.0, 0.5], [0.04, 0.2, 0.8, 1.0]];
    let regs = registers_after(vec![
        (Stage::LoadF32, MemoryCtx::new(&src[..]).into()),
        (Stage::FromSrgb, Context::None),
    ], 2);

    let reference = |s: f32| {
        if s <= 0.04045 { s / 12.92 } else { ((s + 0.055) / 1.055).powf(2.4) }
    };

    for (px, src) in regs.iter().zip(src.iter()) {
        for i in 0..3 {
            assert!((px[i] - reference(src[i])).abs() < 0.002);
        }

        // Alpha is untouched.
        assert_eq!(px[3], src[3]);
    }
}

#[test]
fn from_srgb_dst() {
    let src = [[0.5f32, 0.5, 0.5, 1.0]];
    let regs = registers_after(vec![
        (Stage::LoadF32Dst, MemoryCtx::new(&src[..]).into()),
        (Stage::FromSrgbDst, Context::None),
        (Stage::Swap, Context::None),
    ], 1);

    let expected = registers_after(vec![
        (Stage::LoadF32, MemoryCtx::new(&src[..]).into()),
        (Stage::FromSrgb, Context::None),
    ], 1);

    assert_eq!(regs, expected);
}

#[test]
fn strided_rect() {
    // A 3x2 rect inside a 4x3 image.
    let src: Vec<u32> = (0..12).collect();
    let mut dst = vec![0u32; 12];

    let mut p = RasterPipelineBuilder::new();
    p.push_with_context(Stage::Load8888, MemoryCtx::with_stride(&src[..], 4).unwrap());
    p.push_with_context(Stage::Store8888, MemoryCtx::with_stride_mut(&mut dst[..], 4).unwrap());
    p.compile().run(&ScreenIntRect::from_xywh(1, 1, 3, 2).unwrap());

    assert_eq!(dst, vec![0, 0, 0, 0, 0, 5, 6, 7, 0, 9, 10, 11]);
}

#[test]
fn invalid_stride() {
    let src = [0u32; 4];
    assert!(MemoryCtx::with_stride(&src[..], 5).is_none());
    assert_eq!(MemoryCtx::with_stride(&src[..], 2).unwrap().stride(), 2);
    assert!(!MemoryCtx::new(&src[..]).is_writable());
}
