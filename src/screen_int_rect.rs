// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use core::ops::Range;

use crate::LengthU32;

/// A non-empty block of device pixels, processed by `RasterPipeline::run`.
///
/// Both edges fit into `i32`, so every pixel offset inside the block
/// can be computed without overflow.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ScreenIntRect {
    x: u32,
    y: u32,
    width: LengthU32,
    height: LengthU32,
}

impl ScreenIntRect {
    /// Creates a new `ScreenIntRect`.
    ///
    /// Returns `None` for an empty size or when the right or the bottom
    /// edge is past `i32::MAX`.
    pub fn from_xywh(x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        let width = LengthU32::new(width)?;
        let height = LengthU32::new(height)?;

        let fits = |start: u32, len: LengthU32| {
            start.checked_add(len.get()).map_or(false, |end| end <= i32::MAX as u32)
        };

        if fits(x, width) && fits(y, height) {
            Some(ScreenIntRect { x, y, width, height })
        } else {
            None
        }
    }

    /// Returns the left edge.
    #[inline]
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Returns the top edge.
    #[inline]
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Returns the width. Never zero.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width.get()
    }

    /// Returns the height. Never zero.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height.get()
    }

    /// Returns the exclusive right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width.get()
    }

    /// Returns the exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height.get()
    }

    #[inline]
    pub(crate) fn columns(&self) -> Range<usize> {
        self.x as usize..self.right() as usize
    }

    #[inline]
    pub(crate) fn rows(&self) -> Range<usize> {
        self.y as usize..self.bottom() as usize
    }
}
