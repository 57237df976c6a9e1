//! Headerless raw video files: frames of one geometry stored back to back.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use tmblock_common::error::{TmblockError, TmblockResult};
use tmblock_filter::FrameSink;
use tmblock_frame_model::{PixelFormat, Rational, VideoFrame};

/// `WIDTHxHEIGHT` as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for FrameSize {
    type Err = TmblockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TmblockError::config(format!("invalid frame size '{s}' (expected WxH)"));
        let (w, h) = s
            .trim()
            .split_once(|c: char| c == 'x' || c == 'X')
            .ok_or_else(invalid)?;
        let width: u32 = w.parse().map_err(|_| invalid())?;
        let height: u32 = h.parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// A frame rate given as `N` or `N/D`. Both terms must be positive.
pub fn parse_frame_rate(s: &str) -> TmblockResult<Rational> {
    let rate: Rational = s.parse()?;
    if rate.num <= 0 || rate.den <= 0 {
        return Err(TmblockError::config(format!(
            "frame rate must be positive, got '{s}'"
        )));
    }
    Ok(rate)
}

/// Reads packed frames sequentially, numbering them from zero.
pub struct RawVideoReader<R> {
    inner: R,
    size: FrameSize,
    format: PixelFormat,
    next_pts: i64,
}

impl RawVideoReader<BufReader<File>> {
    pub fn open(path: &Path, size: FrameSize, format: PixelFormat) -> TmblockResult<Self> {
        let file = File::open(path).map_err(|e| {
            TmblockError::Io(io::Error::new(
                e.kind(),
                format!("cannot open {}: {e}", path.display()),
            ))
        })?;
        Ok(Self::new(BufReader::new(file), size, format))
    }
}

impl<R: Read> RawVideoReader<R> {
    pub fn new(inner: R, size: FrameSize, format: PixelFormat) -> Self {
        Self {
            inner,
            size,
            format,
            next_pts: 0,
        }
    }

    fn frame_bytes(&self) -> TmblockResult<usize> {
        (self.size.width as usize)
            .checked_mul(self.size.height as usize)
            .and_then(|px| px.checked_mul(self.format.bytes_per_pixel()))
            .ok_or_else(|| {
                TmblockError::resource_exhausted(format!("{} frame size overflows", self.size))
            })
    }

    /// The next frame, or `None` at a clean end of file. A truncated
    /// trailing frame is an error.
    pub fn read_frame(&mut self) -> TmblockResult<Option<VideoFrame>> {
        let len = self.frame_bytes()?;
        let mut data: Vec<u8> = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            TmblockError::resource_exhausted(format!(
                "cannot allocate {len} bytes for a {} frame: {e}",
                self.size
            ))
        })?;
        data.resize(len, 0);
        let mut filled = 0;
        while filled < len {
            match self.inner.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < len {
            return Err(TmblockError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "truncated {} frame {}: {filled} of {len} bytes",
                    self.size, self.next_pts
                ),
            )));
        }

        let frame = VideoFrame::from_data(data, self.size.width, self.size.height, self.format)?
            .with_pts(self.next_pts);
        self.next_pts += 1;
        Ok(Some(frame))
    }
}

/// Writes frames back to back with stride padding removed.
pub struct RawVideoWriter<W: Write> {
    inner: W,
    frames: u64,
}

impl RawVideoWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> TmblockResult<Self> {
        let file = File::create(path).map_err(|e| {
            TmblockError::Io(io::Error::new(
                e.kind(),
                format!("cannot create {}: {e}", path.display()),
            ))
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> RawVideoWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, frames: 0 }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    pub fn write_frame(&mut self, frame: &VideoFrame) -> TmblockResult<()> {
        let picture = frame.picture();
        for y in 0..frame.height() {
            self.inner.write_all(picture.row(y))?;
        }
        self.frames += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> TmblockResult<()> {
        Ok(self.inner.flush()?)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> FrameSink for RawVideoWriter<W> {
    fn push(&mut self, frame: VideoFrame) -> TmblockResult<()> {
        self.write_frame(&frame)
            .map_err(|e| TmblockError::emit(format!("cannot write output frame: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_frame_size() {
        assert_eq!(
            "640x480".parse::<FrameSize>().unwrap(),
            FrameSize {
                width: 640,
                height: 480
            }
        );
        assert_eq!("2X3".parse::<FrameSize>().unwrap().height, 3);
        for bad in ["640", "x480", "0x10", "ax b"] {
            assert!(bad.parse::<FrameSize>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25").unwrap(), Rational::new(25, 1));
        assert_eq!(parse_frame_rate("30000/1001").unwrap(), Rational::new(30000, 1001));
        for bad in ["0", "0/1", "-25", "25/-1", "25/0", "fast"] {
            assert!(
                matches!(parse_frame_rate(bad), Err(TmblockError::Config { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_oversized_frame_is_resource_exhausted() {
        let size = FrameSize {
            width: u32::MAX,
            height: u32::MAX,
        };
        let mut reader = RawVideoReader::new(Cursor::new(vec![0u8; 16]), size, PixelFormat::Rgba);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, TmblockError::ResourceExhausted { .. }));
    }

    #[test]
    fn test_reads_frames_in_sequence() {
        let size = FrameSize {
            width: 2,
            height: 1,
        };
        let bytes: Vec<u8> = (0..12).collect();
        let mut reader = RawVideoReader::new(Cursor::new(bytes), size, PixelFormat::Rgb24);

        let first = reader.read_frame().unwrap().unwrap();
        assert_eq!(first.pts(), Some(0));
        assert_eq!(first.data(), &[0, 1, 2, 3, 4, 5]);
        let second = reader.read_frame().unwrap().unwrap();
        assert_eq!(second.pts(), Some(1));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        let size = FrameSize {
            width: 1,
            height: 1,
        };
        let mut reader = RawVideoReader::new(Cursor::new(vec![1u8; 6]), size, PixelFormat::Rgba);
        assert!(reader.read_frame().unwrap().is_some());
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            TmblockError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof
        ));
    }

    #[test]
    fn test_writer_strips_padding() {
        let mut frame = VideoFrame::new_aligned(1, 2, PixelFormat::Rgb24, 8).unwrap();
        assert_eq!(frame.stride(), 8);
        frame.data_mut().fill(5);

        let mut writer = RawVideoWriter::new(Vec::new());
        writer.push(frame).unwrap();
        assert_eq!(writer.frames_written(), 1);
        assert_eq!(writer.into_inner(), vec![5; 6]);
    }
}
