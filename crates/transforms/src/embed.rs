//! Alpha embedding of a logo into the primary picture.

use tmblock_frame_model::{Layout, Picture, PictureMut};

use crate::region::Overlap;
use crate::status::{copy_rows, validate, TransformStatus};

/// Blend one channel: `(a * logo + (255 - a) * base) / 255`, rounded.
pub fn blend_channel(base: u8, logo: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((a * logo as u32 + (255 - a) * base as u32 + 127) / 255) as u8
}

/// Composite `logo` over `input` at `(offset_x, offset_y)` into `output`.
///
/// Pixels not covered by the logo are copied from `input`. Parts of the logo
/// outside the frame are ignored.
pub fn embed(
    input: &Picture<'_>,
    logo: &Picture<'_>,
    offset_x: i32,
    offset_y: i32,
    output: &mut PictureMut<'_>,
    layout: Layout,
) -> i32 {
    let status = validate(input, logo, output, layout);
    if status != TransformStatus::Ok {
        return status.code();
    }

    copy_rows(input, output);

    let Some(overlap) = Overlap::compute(
        offset_x,
        offset_y,
        logo.width(),
        logo.height(),
        input.width(),
        input.height(),
    ) else {
        tracing::trace!(offset_x, offset_y, "logo outside frame; copied primary");
        return TransformStatus::Ok.code();
    };

    for (frame_y, logo_y) in overlap.rows() {
        let logo_row = logo.row(logo_y);
        let out_row = output.row_mut(frame_y);
        for i in 0..overlap.width as usize {
            let lp = &logo_row[(overlap.logo_x as usize + i) * 4..][..4];
            let op = &mut out_row[(overlap.frame_x as usize + i) * 3..][..3];
            let alpha = lp[3];
            for c in 0..3 {
                op[c] = blend_channel(op[c], lp[c], alpha);
            }
        }
    }

    TransformStatus::Ok.code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tmblock_frame_model::PictureMode;

    fn solid(width: u32, height: u32, px: &[u8]) -> Vec<u8> {
        px.iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * px.len())
            .collect()
    }

    #[test]
    fn test_blend_extremes() {
        assert_eq!(blend_channel(10, 200, 0), 10);
        assert_eq!(blend_channel(10, 200, 255), 200);
        assert_eq!(blend_channel(0, 255, 128), 128);
    }

    #[test]
    fn test_embed_opaque_square() {
        let base = solid(4, 4, &[10, 20, 30]);
        let mark = solid(2, 2, &[255, 0, 0, 255]);
        let mut out = vec![0u8; base.len()];

        let input = Picture::new(&base, 4, 4, 12, PictureMode::Rgb).unwrap();
        let logo = Picture::new(&mark, 2, 2, 8, PictureMode::Rgba).unwrap();
        let mut output = PictureMut::new(&mut out, 4, 4, 12, PictureMode::Rgb).unwrap();

        assert_eq!(embed(&input, &logo, 1, 1, &mut output, Layout::Packed), 0);
        let view = output.as_picture();
        assert_eq!(view.pixel(0, 0), Some(&[10u8, 20, 30][..]));
        assert_eq!(view.pixel(1, 1), Some(&[255u8, 0, 0][..]));
        assert_eq!(view.pixel(2, 2), Some(&[255u8, 0, 0][..]));
        assert_eq!(view.pixel(3, 3), Some(&[10u8, 20, 30][..]));
    }

    #[test]
    fn test_embed_outside_copies_primary() {
        let base = solid(3, 3, &[1, 2, 3]);
        let mark = solid(2, 2, &[9, 9, 9, 255]);
        let mut out = vec![0u8; base.len()];

        let input = Picture::new(&base, 3, 3, 9, PictureMode::Rgb).unwrap();
        let logo = Picture::new(&mark, 2, 2, 8, PictureMode::Rgba).unwrap();
        let mut output = PictureMut::new(&mut out, 3, 3, 9, PictureMode::Rgb).unwrap();

        assert_eq!(embed(&input, &logo, -50, 7, &mut output, Layout::Packed), 0);
        assert_eq!(out, base);
    }

    #[test]
    fn test_embed_rejects_planar() {
        let base = solid(1, 1, &[0, 0, 0]);
        let mark = solid(1, 1, &[0, 0, 0, 0]);
        let mut out = vec![0u8; 3];
        let input = Picture::new(&base, 1, 1, 3, PictureMode::Rgb).unwrap();
        let logo = Picture::new(&mark, 1, 1, 4, PictureMode::Rgba).unwrap();
        let mut output = PictureMut::new(&mut out, 1, 1, 3, PictureMode::Rgb).unwrap();

        assert_eq!(
            embed(&input, &logo, 0, 0, &mut output, Layout::Planar),
            TransformStatus::UnsupportedLayout.code()
        );
    }

    proptest! {
        #[test]
        fn blend_stays_between_inputs(base in any::<u8>(), logo in any::<u8>(), alpha in any::<u8>()) {
            let out = blend_channel(base, logo, alpha);
            prop_assert!(out >= base.min(logo) && out <= base.max(logo));
        }
    }
}
