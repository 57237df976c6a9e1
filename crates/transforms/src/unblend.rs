//! Logo removal by inverting the alpha blend.
//!
//! Given a watermarked pixel `p = (a * l + (255 - a) * o) / 255` and the logo
//! pixel `l` with alpha `a`, the original is `o = (255 * p - a * l) / (255 - a)`.
//! Fully opaque logo pixels carry no trace of the original; `pre` leaves them
//! alone and `post` fills them from the surrounding recovered pixels.

use tmblock_frame_model::{Layout, Picture, PictureMut};

use crate::region::Overlap;
use crate::status::{copy_rows, validate, TransformStatus};

/// Recover one channel of the original pixel. `alpha` must be below 255.
pub fn unblend_channel(blended: u8, logo: u8, alpha: u8) -> u8 {
    debug_assert!(alpha < 255);
    let num = 255 * blended as i32 - alpha as i32 * logo as i32;
    if num <= 0 {
        return 0;
    }
    let den = 255 - alpha as i32;
    ((num + den / 2) / den).min(255) as u8
}

/// Remove the logo by inverse blending. Opaque logo pixels are kept as-is.
pub fn pre(
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
    if let Some(overlap) = Overlap::compute(
        offset_x,
        offset_y,
        logo.width(),
        logo.height(),
        input.width(),
        input.height(),
    ) {
        unblend_overlap(logo, &overlap, output);
    }
    TransformStatus::Ok.code()
}

/// Remove the logo by inverse blending, then fill each fully opaque logo
/// pixel with the mean of its recoverable 4-neighbours.
pub fn post(
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
        return TransformStatus::Ok.code();
    };
    unblend_overlap(logo, &overlap, output);

    let opaque = |fx: i64, fy: i64| {
        logo.pixel(fx - offset_x as i64, fy - offset_y as i64)
            .is_some_and(|px| px[3] == 255)
    };

    let mut filled = 0usize;
    for (frame_y, _) in overlap.rows() {
        for i in 0..overlap.width {
            let (fx, fy) = ((overlap.frame_x + i) as i64, frame_y as i64);
            if !opaque(fx, fy) {
                continue;
            }

            let mut sum = [0u32; 3];
            let mut count = 0u32;
            for (nx, ny) in [(fx - 1, fy), (fx + 1, fy), (fx, fy - 1), (fx, fy + 1)] {
                if opaque(nx, ny) {
                    continue;
                }
                if let Some(px) = output.as_picture().pixel(nx, ny) {
                    for c in 0..3 {
                        sum[c] += px[c] as u32;
                    }
                    count += 1;
                }
            }
            if count == 0 {
                continue;
            }
            if let Some(px) = output.pixel_mut(fx, fy) {
                for c in 0..3 {
                    px[c] = ((sum[c] + count / 2) / count) as u8;
                }
                filled += 1;
            }
        }
    }
    tracing::trace!(filled, "filled opaque logo pixels");

    TransformStatus::Ok.code()
}

fn unblend_overlap(logo: &Picture<'_>, overlap: &Overlap, output: &mut PictureMut<'_>) {
    for (frame_y, logo_y) in overlap.rows() {
        let logo_row = logo.row(logo_y);
        let out_row = output.row_mut(frame_y);
        for i in 0..overlap.width as usize {
            let lp = &logo_row[(overlap.logo_x as usize + i) * 4..][..4];
            let alpha = lp[3];
            if alpha == 0 || alpha == 255 {
                continue;
            }
            let op = &mut out_row[(overlap.frame_x as usize + i) * 3..][..3];
            for c in 0..3 {
                op[c] = unblend_channel(op[c], lp[c], alpha);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{blend_channel, embed};
    use proptest::prelude::*;
    use tmblock_frame_model::PictureMode;

    #[test]
    fn test_unblend_recovers_known_pixel() {
        let blended = blend_channel(100, 200, 128);
        assert_eq!(unblend_channel(blended, 200, 128), 100);
    }

    #[test]
    fn test_pre_undoes_embed() {
        let base: Vec<u8> = (0..4 * 3 * 3).map(|i| (i * 7 % 200) as u8 + 20).collect();
        let mark: Vec<u8> = [90, 160, 30, 100].repeat(4);
        let mut marked = vec![0u8; base.len()];
        let mut restored = vec![0u8; base.len()];

        let input = Picture::new(&base, 4, 3, 12, PictureMode::Rgb).unwrap();
        let logo = Picture::new(&mark, 2, 2, 8, PictureMode::Rgba).unwrap();
        {
            let mut out = PictureMut::new(&mut marked, 4, 3, 12, PictureMode::Rgb).unwrap();
            assert_eq!(embed(&input, &logo, 1, 1, &mut out, Layout::Packed), 0);
        }
        let marked_pic = Picture::new(&marked, 4, 3, 12, PictureMode::Rgb).unwrap();
        let mut out = PictureMut::new(&mut restored, 4, 3, 12, PictureMode::Rgb).unwrap();
        assert_eq!(pre(&marked_pic, &logo, 1, 1, &mut out, Layout::Packed), 0);

        for (got, want) in restored.iter().zip(&base) {
            assert!((*got as i32 - *want as i32).abs() <= 1, "{got} vs {want}");
        }
    }

    #[test]
    fn test_post_fills_opaque_pixel_from_neighbours() {
        // 3x3 grey frame with an opaque red dot in the middle.
        let mut base = [50u8, 50, 50].repeat(9);
        base[12..15].copy_from_slice(&[255, 0, 0]);
        let mark = vec![255u8, 0, 0, 255];
        let mut out_buf = vec![0u8; base.len()];

        let input = Picture::new(&base, 3, 3, 9, PictureMode::Rgb).unwrap();
        let logo = Picture::new(&mark, 1, 1, 4, PictureMode::Rgba).unwrap();
        let mut out = PictureMut::new(&mut out_buf, 3, 3, 9, PictureMode::Rgb).unwrap();

        assert_eq!(post(&input, &logo, 1, 1, &mut out, Layout::Packed), 0);
        assert_eq!(out.as_picture().pixel(1, 1), Some(&[50u8, 50, 50][..]));

        let mut pre_buf = vec![0u8; base.len()];
        let mut out = PictureMut::new(&mut pre_buf, 3, 3, 9, PictureMode::Rgb).unwrap();
        assert_eq!(pre(&input, &logo, 1, 1, &mut out, Layout::Packed), 0);
        assert_eq!(out.as_picture().pixel(1, 1), Some(&[255u8, 0, 0][..]));
    }

    proptest! {
        #[test]
        fn unblend_inverts_blend(orig in any::<u8>(), logo in any::<u8>(), alpha in 0u8..=200) {
            let blended = blend_channel(orig, logo, alpha);
            let back = unblend_channel(blended, logo, alpha);
            // Rounding in the forward blend loses up to 255 / (255 - a) / 2 levels.
            prop_assert!((back as i32 - orig as i32).abs() <= 3);
        }
    }
}
