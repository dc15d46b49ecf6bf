// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// Based on https://github.com/Lokathor/wide (Zlib)

use bytemuck::cast;

use super::{f32x8, i32x8};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "simd", target_feature = "avx2"))] {
        #[cfg(target_arch = "x86")]
        use core::arch::x86::*;
        #[cfg(target_arch = "x86_64")]
        use core::arch::x86_64::*;

        #[derive(Clone, Copy, Debug)]
        #[repr(C, align(32))]
        pub struct u32x8(__m256i);
    } else {
        #[derive(Clone, Copy, Debug)]
        #[repr(C, align(32))]
        pub struct u32x8([u32; 8]);
    }
}

unsafe impl bytemuck::Zeroable for u32x8 {}
unsafe impl bytemuck::Pod for u32x8 {}

impl Default for u32x8 {
    fn default() -> Self {
        Self::splat(0)
    }
}

impl u32x8 {
    pub fn splat(n: u32) -> Self {
        cast([n, n, n, n, n, n, n, n])
    }

    pub fn to_i32x8_bitcast(self) -> i32x8 {
        bytemuck::cast(self)
    }

    /// Converts each lane to `f32`.
    ///
    /// Lanes must be below `1 << 31`, which holds for every masked channel.
    pub fn to_f32x8(self) -> f32x8 {
        self.to_i32x8_bitcast().to_f32x8()
    }
}

impl From<[u32; 8]> for u32x8 {
    fn from(v: [u32; 8]) -> Self {
        cast(v)
    }
}

impl From<u32x8> for [u32; 8] {
    fn from(v: u32x8) -> Self {
        cast(v)
    }
}

impl core::ops::Add for u32x8 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "avx2"))] {
                Self(unsafe { _mm256_add_epi32(self.0, rhs.0) })
            } else {
                Self(impl_x8_op!(self.0, rhs.0, |a, b| a.wrapping_add(b)))
            }
        }
    }
}

impl core::ops::BitAnd for u32x8 {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "avx2"))] {
                Self(unsafe { _mm256_and_si256(self.0, rhs.0) })
            } else {
                Self(impl_x8_op!(self.0, rhs.0, |a, b| a & b))
            }
        }
    }
}

impl core::ops::BitOr for u32x8 {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "avx2"))] {
                Self(unsafe { _mm256_or_si256(self.0, rhs.0) })
            } else {
                Self(impl_x8_op!(self.0, rhs.0, |a, b| a | b))
            }
        }
    }
}

impl core::ops::BitXor for u32x8 {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "avx2"))] {
                Self(unsafe { _mm256_xor_si256(self.0, rhs.0) })
            } else {
                Self(impl_x8_op!(self.0, rhs.0, |a, b| a ^ b))
            }
        }
    }
}

impl core::ops::Shl<u32> for u32x8 {
    type Output = Self;

    fn shl(self, rhs: u32) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "avx2"))] {
                let shift = unsafe { _mm256_set1_epi32(rhs as i32) };
                Self(unsafe { _mm256_sllv_epi32(self.0, shift) })
            } else {
                Self(self.0.map(|v| v.wrapping_shl(rhs)))
            }
        }
    }
}

impl core::ops::Shr<u32> for u32x8 {
    type Output = Self;

    fn shr(self, rhs: u32) -> Self::Output {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "simd", target_feature = "avx2"))] {
                let shift = unsafe { _mm256_set1_epi32(rhs as i32) };
                Self(unsafe { _mm256_srlv_epi32(self.0, shift) })
            } else {
                Self(self.0.map(|v| v.wrapping_shr(rhs)))
            }
        }
    }
}
