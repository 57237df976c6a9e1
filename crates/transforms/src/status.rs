//! Status codes and argument validation shared by all transforms.

use tmblock_frame_model::{Layout, Picture, PictureMode, PictureMut};

/// Result of a transform call, as reported to the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum TransformStatus {
    Ok = 0,
    /// Primary/output not RGB, or logo not RGBA.
    InvalidMode = -1,
    /// Only packed pictures are supported.
    UnsupportedLayout = -2,
    /// Output geometry differs from the primary picture.
    GeometryMismatch = -3,
}

impl TransformStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Check the arguments every transform expects.
pub(crate) fn validate(
    input: &Picture<'_>,
    logo: &Picture<'_>,
    output: &PictureMut<'_>,
    layout: Layout,
) -> TransformStatus {
    if layout != Layout::Packed {
        return TransformStatus::UnsupportedLayout;
    }
    if input.mode() != PictureMode::Rgb
        || output.mode() != PictureMode::Rgb
        || logo.mode() != PictureMode::Rgba
    {
        return TransformStatus::InvalidMode;
    }
    if input.width() != output.width() || input.height() != output.height() {
        return TransformStatus::GeometryMismatch;
    }
    TransformStatus::Ok
}

/// Copy the primary picture into the output row by row.
pub(crate) fn copy_rows(input: &Picture<'_>, output: &mut PictureMut<'_>) {
    for y in 0..input.height() {
        output.row_mut(y).copy_from_slice(input.row(y));
    }
}
