// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// This module was written from scratch, therefore there is no Google copyright.

// All types are 8 lanes wide, which matches the pipeline stage width.
// On x86 with AVX (and AVX2 for integers) a single 256-bit register is used.
// Everywhere else the types are plain arrays and the compiler is free to
// autovectorize them.
//
// Comparison methods return masks: all bits set for `true`, all bits cleared
// for `false`. `blend` expects such a mask as `self`.

// Applies a binary function lane by lane. Used only by the array fallbacks.
#[allow(unused_macros)]
macro_rules! impl_x8_op {
    ($a:expr, $b:expr, |$x:ident, $y:ident| $body:expr) => {{
        let a = $a;
        let b = $b;
        core::array::from_fn(|i| {
            let $x = a[i];
            let $y = b[i];
            $body
        })
    }};
}

// Lane by lane comparison producing a mask. Used only by the array fallbacks.
#[allow(unused_macros)]
macro_rules! impl_x8_cmp {
    ($a:expr, $op:tt, $b:expr, $t:expr, $f:expr) => {
        impl_x8_op!($a, $b, |x, y| if x $op y { $t } else { $f })
    };
}

mod f32x8_t;
mod i32x8_t;
mod u32x8_t;

pub use f32x8_t::f32x8;
pub use i32x8_t::i32x8;
pub use u32x8_t::u32x8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32x8_floor() {
        let v = f32x8::from([-1.5, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5, 2.99]);
        let r: [f32; 8] = v.floor().into();
        assert_eq!(r, [-2.0, -1.0, -1.0, 0.0, 0.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn f32x8_round_int_ties_to_even() {
        let v = f32x8::from([0.5, 1.5, 2.5, -0.5, -1.5, 254.5, 127.49, 127.51]);
        let r: [i32; 8] = v.round_int().into();
        assert_eq!(r, [0, 2, 2, 0, -2, 254, 127, 128]);
    }

    #[test]
    fn f32x8_trunc_int() {
        let v = f32x8::from([0.9, 1.1, -0.9, -1.1, 7.99, 8.0, 0.0, 3.5]);
        let r: [i32; 8] = v.trunc_int().into();
        assert_eq!(r, [0, 1, 0, -1, 7, 8, 0, 3]);
    }

    #[test]
    fn f32x8_blend() {
        let a = f32x8::from([0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let mask = a.cmp_lt(f32x8::splat(4.0));
        let r: [f32; 8] = mask.blend(f32x8::splat(-1.0), a).into();
        assert_eq!(r, [-1.0, -1.0, -1.0, -1.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn f32x8_min_max_abs() {
        let a = f32x8::from([-2.0, -1.0, 0.0, 0.25, 0.5, 1.0, 2.0, 3.0]);
        let r: [f32; 8] = a.max(f32x8::default()).min(f32x8::splat(1.0)).into();
        assert_eq!(r, [0.0, 0.0, 0.0, 0.25, 0.5, 1.0, 1.0, 1.0]);

        let r: [f32; 8] = a.abs().into();
        assert_eq!(r, [2.0, 1.0, 0.0, 0.25, 0.5, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn f32x8_comparisons() {
        let a = f32x8::from([0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, f32::NAN]);
        let b = f32x8::splat(3.0);
        let pick = |mask: f32x8| -> [f32; 8] { mask.blend(f32x8::splat(1.0), f32x8::default()).into() };

        assert_eq!(pick(a.cmp_gt(b)), [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
        assert_eq!(pick(a.cmp_le(b)), [1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(pick(a.cmp_ge(b)), [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
        assert_eq!(pick(a.cmp_lt(b)), [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn u32x8_shifts_and_masks() {
        let v = u32x8::splat(0xFF804020);
        let r: [u32; 8] = ((v >> 8) & u32x8::splat(0xFF)).into();
        assert_eq!(r, [0x40; 8]);

        let r: [u32; 8] = (u32x8::splat(1) << 31).into();
        assert_eq!(r, [0x8000_0000; 8]);
    }

    #[test]
    fn i32x8_to_f32x8() {
        let v = i32x8::from([0, 1, -1, 255, 256, 1 << 20, -(1 << 20), 7]);
        let r: [f32; 8] = v.to_f32x8().into();
        assert_eq!(r, [0.0, 1.0, -1.0, 255.0, 256.0, 1048576.0, -1048576.0, 7.0]);
    }
}
