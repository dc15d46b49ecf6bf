// Copyright 2006 The Android Open Source Project
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/// A 32-bit RGBA color value.
///
/// Byteorder: ABGR, which is how RGBA8888 pixels are stored in memory
/// on little-endian machines.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct ColorU8(u32);

impl ColorU8 {
    /// Creates a new color.
    #[inline]
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        ColorU8(pack_rgba(r, g, b, a))
    }

    /// Creates a new color from a packed RGBA8888 pixel.
    #[inline]
    pub const fn from_packed(v: u32) -> Self {
        ColorU8(v)
    }

    /// Returns color's red component.
    #[inline]
    pub const fn red(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Returns color's green component.
    #[inline]
    pub const fn green(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Returns color's blue component.
    #[inline]
    pub const fn blue(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    /// Returns color's alpha component.
    #[inline]
    pub const fn alpha(self) -> u8 {
        ((self.0 >> 24) & 0xFF) as u8
    }

    /// Returns the value as a packed RGBA8888 pixel.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Debug for ColorU8 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ColorU8")
            .field("r", &self.red())
            .field("g", &self.green())
            .field("b", &self.blue())
            .field("a", &self.alpha())
            .finish()
    }
}


/// RGBA color value, holding four floating point components.
///
/// The container guarantees that all components are in a 0..=1 range.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Color {
    r: f32,
    g: f32,
    b: f32,
    a: f32,
}

impl Color {
    /// A transparent color.
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
    /// A black color.
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    /// A white color.
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    /// Creates a new color from 4 components.
    ///
    /// All values must be in 0..=1 range.
    #[inline]
    pub fn from_rgba(r: f32, g: f32, b: f32, a: f32) -> Option<Self> {
        let is_normalized = |v: f32| (0.0..=1.0).contains(&v);
        if is_normalized(r) && is_normalized(g) && is_normalized(b) && is_normalized(a) {
            Some(Color { r, g, b, a })
        } else {
            None
        }
    }

    /// Creates a new color from 4 components.
    ///
    /// u8 will be divided by 255 to get the float component.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Returns color's red component.
    #[inline]
    pub fn red(&self) -> f32 {
        self.r
    }

    /// Returns color's green component.
    #[inline]
    pub fn green(&self) -> f32 {
        self.g
    }

    /// Returns color's blue component.
    #[inline]
    pub fn blue(&self) -> f32 {
        self.b
    }

    /// Returns color's alpha component.
    #[inline]
    pub fn alpha(&self) -> f32 {
        self.a
    }

    /// Check that color is opaque.
    ///
    /// Alpha == 1.0
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.a == 1.0
    }

    /// Returns a color with RGB multiplied by alpha.
    #[inline]
    pub fn premultiply(&self) -> Color {
        if self.is_opaque() {
            *self
        } else {
            Color {
                r: self.r * self.a,
                g: self.g * self.a,
                b: self.b * self.a,
                a: self.a,
            }
        }
    }

    /// Converts into `ColorU8`, rounding each component.
    #[inline]
    pub fn to_color_u8(&self) -> ColorU8 {
        let c = |v: f32| (v * 255.0 + 0.5) as u8;
        ColorU8::from_rgba(c(self.r), c(self.g), c(self.b), c(self.a))
    }
}

#[inline]
const fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    ((a as u32) << 24) | ((b as u32) << 16) | ((g as u32) << 8) | (r as u32)
}
