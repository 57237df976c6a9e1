//! Borrowed views over frame pixel buffers.
//!
//! A picture never owns pixel memory: it is built from a frame for the
//! duration of one transform call and cannot outlive it.

use tmblock_common::error::{TmblockError, TmblockResult};

use crate::format::PictureMode;

/// Read-only view of a packed picture.
#[derive(Debug, Clone, Copy)]
pub struct Picture<'a> {
    width: u32,
    height: u32,
    stride: usize,
    mode: PictureMode,
    data: &'a [u8],
}

/// Writable view of a packed picture.
#[derive(Debug)]
pub struct PictureMut<'a> {
    width: u32,
    height: u32,
    stride: usize,
    mode: PictureMode,
    data: &'a mut [u8],
}

/// Check that `len` bytes can hold `height` rows of `stride` bytes, the last
/// of which only needs `width * channels` bytes.
fn check_extent(
    len: usize,
    width: u32,
    height: u32,
    stride: usize,
    mode: PictureMode,
) -> TmblockResult<()> {
    let row_bytes = width as usize * mode.channels();
    if stride < row_bytes {
        return Err(TmblockError::invalid_state(format!(
            "stride {stride} shorter than a {width}px {mode:?} row"
        )));
    }
    let needed = match height {
        0 => 0,
        h => stride * (h as usize - 1) + row_bytes,
    };
    if len < needed {
        return Err(TmblockError::invalid_state(format!(
            "buffer of {len} bytes cannot hold {width}x{height} {mode:?} picture (needs {needed})"
        )));
    }
    Ok(())
}

impl<'a> Picture<'a> {
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        stride: usize,
        mode: PictureMode,
    ) -> TmblockResult<Self> {
        check_extent(data.len(), width, height, stride, mode)?;
        Ok(Self::from_parts(data, width, height, stride, mode))
    }

    /// Frames keep their buffer consistent with their geometry, so views
    /// built from them skip the extent check.
    pub(crate) fn from_parts(
        data: &'a [u8],
        width: u32,
        height: u32,
        stride: usize,
        mode: PictureMode,
    ) -> Self {
        debug_assert!(check_extent(data.len(), width, height, stride, mode).is_ok());
        Self {
            width,
            height,
            stride,
            mode,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn mode(&self) -> PictureMode {
        self.mode
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Visible bytes of row `y`, without stride padding.
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.mode.channels()]
    }

    /// Channels of the pixel at `(x, y)`, or `None` outside the picture.
    pub fn pixel(&self, x: i64, y: i64) -> Option<&'a [u8]> {
        let offset = pixel_offset(x, y, self.width, self.height, self.stride, self.mode)?;
        Some(&self.data[offset..offset + self.mode.channels()])
    }
}

impl<'a> PictureMut<'a> {
    pub fn new(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        stride: usize,
        mode: PictureMode,
    ) -> TmblockResult<Self> {
        check_extent(data.len(), width, height, stride, mode)?;
        Ok(Self::from_parts(data, width, height, stride, mode))
    }

    pub(crate) fn from_parts(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        stride: usize,
        mode: PictureMode,
    ) -> Self {
        debug_assert!(check_extent(data.len(), width, height, stride, mode).is_ok());
        Self {
            width,
            height,
            stride,
            mode,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn mode(&self) -> PictureMode {
        self.mode
    }

    /// Reborrow as a read-only view.
    pub fn as_picture(&self) -> Picture<'_> {
        Picture {
            width: self.width,
            height: self.height,
            stride: self.stride,
            mode: self.mode,
            data: &*self.data,
        }
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.width as usize * self.mode.channels();
        &mut self.data[start..start + len]
    }

    pub fn pixel_mut(&mut self, x: i64, y: i64) -> Option<&mut [u8]> {
        let offset = pixel_offset(x, y, self.width, self.height, self.stride, self.mode)?;
        let channels = self.mode.channels();
        Some(&mut self.data[offset..offset + channels])
    }
}

fn pixel_offset(
    x: i64,
    y: i64,
    width: u32,
    height: u32,
    stride: usize,
    mode: PictureMode,
) -> Option<usize> {
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return None;
    }
    Some(y as usize * stride + x as usize * mode.channels())
}
