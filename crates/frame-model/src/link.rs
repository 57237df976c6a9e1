//! Negotiated endpoint properties and compositing geometry.

use serde::{Deserialize, Serialize};

use crate::format::PixelFormat;
use crate::rational::Rational;

/// Configuration of one filter endpoint once formats are negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkProps {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Unit of frame timestamps on this link.
    pub time_base: Rational,
    pub sample_aspect_ratio: Rational,
    /// Nominal frame rate; `0/1` for variable rate.
    pub frame_rate: Rational,
}

impl LinkProps {
    /// A constant frame rate link whose time base is the inverse frame rate.
    pub fn new(format: PixelFormat, width: u32, height: u32, frame_rate: Rational) -> Self {
        Self {
            format,
            width,
            height,
            time_base: frame_rate.invert(),
            sample_aspect_ratio: Rational::ONE,
            frame_rate,
        }
    }

    pub fn with_time_base(mut self, time_base: Rational) -> Self {
        self.time_base = time_base;
        self
    }

    /// Bytes of one tightly packed frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Signed pixel position of the logo's top-left corner inside the primary
/// frame. Not bounds-checked: a logo placed partly or fully outside the
/// frame is valid and left to the transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

impl Offset {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether a `w`x`h` logo at this offset lies entirely inside a
    /// `width`x`height` frame.
    pub fn fits(&self, w: u32, h: u32, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x as i64 + w as i64 <= width as i64
            && self.y as i64 + h as i64 <= height as i64
    }
}
