//! Owned video frames and release accounting.
//!
//! A [`VideoFrame`] owns its pixel buffer. Handing a frame to a queue, a
//! pair or a sink moves it; dropping it releases it. Frames built with
//! [`VideoFrame::tracked`] report their release to a [`FrameLedger`], which
//! lets callers prove that every frame is released exactly once.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tmblock_common::error::{TmblockError, TmblockResult};

use crate::format::{PictureMode, PixelFormat};
use crate::picture::{Picture, PictureMut};
use crate::rational::Rational;

/// Presentation metadata carried from the primary frame onto its output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameProps {
    /// Presentation timestamp in link time base units.
    pub pts: Option<i64>,
    /// Decode timestamp of the packet the frame came from.
    pub pkt_dts: Option<i64>,
    /// Frame duration in link time base units.
    pub duration: Option<i64>,
    pub key_frame: bool,
    /// Per-frame sample aspect ratio; `0/1` when unknown.
    pub sample_aspect_ratio: Rational,
    /// Free-form side data (e.g. "lavfi.scene_score").
    pub metadata: BTreeMap<String, String>,
}

/// Shared counters of frame allocations and releases.
#[derive(Debug, Clone, Default)]
pub struct FrameLedger {
    counts: Arc<LedgerCounts>,
}

#[derive(Debug, Default)]
struct LedgerCounts {
    allocated: AtomicU64,
    released: AtomicU64,
}

impl FrameLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocated(&self) -> u64 {
        self.counts.allocated.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.counts.released.load(Ordering::SeqCst)
    }

    /// Frames allocated against this ledger that are still alive.
    pub fn outstanding(&self) -> u64 {
        self.allocated() - self.released()
    }

    fn lease(&self) -> FrameLease {
        self.counts.allocated.fetch_add(1, Ordering::SeqCst);
        FrameLease {
            counts: Arc::clone(&self.counts),
        }
    }
}

/// One allocation recorded in a ledger; counted as released on drop.
#[derive(Debug)]
struct FrameLease {
    counts: Arc<LedgerCounts>,
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        self.counts.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// A decoded, packed video frame.
#[derive(Debug)]
pub struct VideoFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    /// Presentation metadata.
    pub props: FrameProps,
    lease: Option<FrameLease>,
}

impl VideoFrame {
    /// Allocate a zeroed frame with tightly packed rows.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> TmblockResult<Self> {
        Self::new_aligned(width, height, format, 1)
    }

    /// Allocate a zeroed frame whose row stride is a multiple of `align`
    /// bytes. Allocation failure is reported instead of aborting.
    pub fn new_aligned(
        width: u32,
        height: u32,
        format: PixelFormat,
        align: usize,
    ) -> TmblockResult<Self> {
        let align = align.max(1);
        let row_bytes = width as usize * format.bytes_per_pixel();
        let stride = row_bytes.div_ceil(align) * align;
        let len = stride
            .checked_mul(height as usize)
            .ok_or_else(|| TmblockError::resource_exhausted("frame size overflows usize"))?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            TmblockError::resource_exhausted(format!(
                "cannot allocate {width}x{height} {format} frame: {e}"
            ))
        })?;
        data.resize(len, 0);

        Ok(Self {
            data,
            width,
            height,
            stride,
            format,
            props: FrameProps::default(),
            lease: None,
        })
    }

    /// Wrap tightly packed pixel data.
    pub fn from_data(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> TmblockResult<Self> {
        let stride = width as usize * format.bytes_per_pixel();
        let expected = stride * height as usize;
        if data.len() != expected {
            return Err(TmblockError::invalid_state(format!(
                "{width}x{height} {format} frame needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            format,
            props: FrameProps::default(),
            lease: None,
        })
    }

    /// Record this frame in `ledger`. A frame is tracked by at most one
    /// ledger; re-tracking counts it as released by the previous one.
    pub fn tracked(mut self, ledger: &FrameLedger) -> Self {
        self.lease = Some(ledger.lease());
        self
    }

    pub fn with_pts(mut self, pts: i64) -> Self {
        self.props.pts = Some(pts);
        self
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

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pts(&self) -> Option<i64> {
        self.props.pts
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Copy presentation metadata from `src`. Geometry and pixels are left
    /// untouched.
    pub fn copy_props_from(&mut self, src: &VideoFrame) {
        self.props = src.props.clone();
    }

    /// Borrow the frame as a read-only picture.
    pub fn picture(&self) -> Picture<'_> {
        Picture::from_parts(
            &self.data,
            self.width,
            self.height,
            self.stride,
            PictureMode::from(self.format),
        )
    }

    /// Borrow the frame as a writable picture.
    pub fn picture_mut(&mut self) -> PictureMut<'_> {
        PictureMut::from_parts(
            &mut self.data,
            self.width,
            self.height,
            self.stride,
            PictureMode::from(self.format),
        )
    }

    /// Visible pixel bytes with stride padding removed.
    pub fn to_packed(&self) -> Vec<u8> {
        let picture = self.picture();
        let row_bytes = self.width as usize * self.format.bytes_per_pixel();
        let mut out = Vec::with_capacity(row_bytes * self.height as usize);
        for y in 0..self.height {
            out.extend_from_slice(picture.row(y));
        }
        out
    }
}

impl Clone for VideoFrame {
    /// A clone is a new allocation: if the source is tracked, the clone is
    /// recorded in the same ledger.
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
            stride: self.stride,
            format: self.format,
            props: self.props.clone(),
            lease: self.lease.as_ref().map(|lease| {
                lease.counts.allocated.fetch_add(1, Ordering::SeqCst);
                FrameLease {
                    counts: Arc::clone(&lease.counts),
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_stride() {
        let frame = VideoFrame::new_aligned(10, 4, PixelFormat::Rgb24, 32).unwrap();
        assert_eq!(frame.stride(), 32);
        assert_eq!(frame.data().len(), 128);
        assert_eq!(frame.picture().row(3).len(), 30);
    }

    #[test]
    fn test_from_data_checks_length() {
        assert!(VideoFrame::from_data(vec![0; 12], 2, 2, PixelFormat::Rgb24).is_ok());
        assert!(VideoFrame::from_data(vec![0; 12], 2, 2, PixelFormat::Rgba).is_err());
    }

    #[test]
    fn test_ledger_counts_drop_once() {
        let ledger = FrameLedger::new();
        let a = VideoFrame::new(4, 4, PixelFormat::Rgba).unwrap().tracked(&ledger);
        let b = a.clone();
        assert_eq!(ledger.allocated(), 2);
        assert_eq!(ledger.outstanding(), 2);

        drop(a);
        assert_eq!(ledger.released(), 1);
        let moved = b;
        drop(moved);
        assert_eq!(ledger.released(), 2);
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn test_copy_props() {
        let mut src = VideoFrame::new(2, 2, PixelFormat::Rgb24).unwrap().with_pts(42);
        src.props.duration = Some(1);
        src.props.key_frame = true;
        src.props
            .metadata
            .insert("lavfi.scene_score".to_string(), "0.12".to_string());

        let mut dst = VideoFrame::new_aligned(2, 2, PixelFormat::Rgb24, 16).unwrap();
        dst.copy_props_from(&src);
        assert_eq!(dst.props, src.props);
        assert_eq!(dst.stride(), 16);
    }

    #[test]
    fn test_to_packed_strips_padding() {
        let mut frame = VideoFrame::new_aligned(1, 2, PixelFormat::Rgb24, 8).unwrap();
        frame.picture_mut().row_mut(1).copy_from_slice(&[1, 2, 3]);
        assert_eq!(frame.to_packed(), vec![0, 0, 0, 1, 2, 3]);
    }
}
