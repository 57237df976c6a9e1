//! Clipping of the logo rectangle against the frame.

/// The part of a logo that lands inside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    /// First frame column covered by the logo.
    pub frame_x: u32,
    /// First frame row covered by the logo.
    pub frame_y: u32,
    /// First logo column that is visible.
    pub logo_x: u32,
    /// First logo row that is visible.
    pub logo_y: u32,
    pub width: u32,
    pub height: u32,
}

impl Overlap {
    /// Intersect a `logo_w`x`logo_h` logo placed at `(offset_x, offset_y)`
    /// with a `frame_w`x`frame_h` frame. `None` when nothing is visible.
    pub fn compute(
        offset_x: i32,
        offset_y: i32,
        logo_w: u32,
        logo_h: u32,
        frame_w: u32,
        frame_h: u32,
    ) -> Option<Self> {
        let (frame_x, logo_x, width) = clip_axis(offset_x, logo_w, frame_w)?;
        let (frame_y, logo_y, height) = clip_axis(offset_y, logo_h, frame_h)?;
        Some(Self {
            frame_x,
            frame_y,
            logo_x,
            logo_y,
            width,
            height,
        })
    }

    /// Frame-space rows covered by the overlap.
    pub fn rows(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.height).map(move |i| (self.frame_y + i, self.logo_y + i))
    }
}

fn clip_axis(offset: i32, logo_len: u32, frame_len: u32) -> Option<(u32, u32, u32)> {
    let start = (offset as i64).max(0);
    let end = (offset as i64 + logo_len as i64).min(frame_len as i64);
    if start >= end {
        return None;
    }
    Some((
        start as u32,
        (start - offset as i64) as u32,
        (end - start) as u32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_inside() {
        let o = Overlap::compute(10, 5, 20, 10, 100, 100).unwrap();
        assert_eq!(
            o,
            Overlap {
                frame_x: 10,
                frame_y: 5,
                logo_x: 0,
                logo_y: 0,
                width: 20,
                height: 10
            }
        );
    }

    #[test]
    fn test_negative_offset_clips_logo_start() {
        let o = Overlap::compute(-4, -2, 10, 10, 100, 100).unwrap();
        assert_eq!((o.frame_x, o.logo_x, o.width), (0, 4, 6));
        assert_eq!((o.frame_y, o.logo_y, o.height), (0, 2, 8));
    }

    #[test]
    fn test_right_edge_clip() {
        let o = Overlap::compute(95, 0, 10, 1, 100, 100).unwrap();
        assert_eq!((o.frame_x, o.logo_x, o.width), (95, 0, 5));
    }

    #[test]
    fn test_fully_outside() {
        assert!(Overlap::compute(100, 0, 10, 10, 100, 100).is_none());
        assert!(Overlap::compute(-10, 0, 10, 10, 100, 100).is_none());
        assert!(Overlap::compute(0, i32::MAX, 10, 10, 100, 100).is_none());
        assert!(Overlap::compute(i32::MIN, 0, 10, 10, 100, 100).is_none());
    }
}
