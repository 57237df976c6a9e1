//! Stream roles and pixel format vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tmblock_common::error::TmblockError;

/// The three endpoints of the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamRole {
    /// The main video; its geometry and timing define the output.
    Primary,
    /// The overlay carrying an alpha channel.
    Logo,
    /// The composited result.
    Output,
}

impl StreamRole {
    pub const ALL: [StreamRole; 3] = [StreamRole::Primary, StreamRole::Logo, StreamRole::Output];

    /// Endpoint name as exposed to the host.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Logo => "logo",
            Self::Output => "output",
        }
    }

    /// The single pixel format this endpoint negotiates.
    pub fn required_format(&self) -> PixelFormat {
        match self {
            Self::Primary | Self::Output => PixelFormat::Rgb24,
            Self::Logo => PixelFormat::Rgba,
        }
    }

    pub fn is_input(&self) -> bool {
        !matches!(self, Self::Output)
    }
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Packed pixel formats understood by the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 24-bit packed R, G, B.
    Rgb24,
    /// 32-bit packed R, G, B, A.
    Rgba,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Rgb24 => 3,
            Self::Rgba => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rgb24 => "rgb24",
            Self::Rgba => "rgba",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = TmblockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb24" | "rgb" => Ok(Self::Rgb24),
            "rgba" => Ok(Self::Rgba),
            other => Err(TmblockError::config(format!(
                "unsupported pixel format '{other}' (expected rgb24 or rgba)"
            ))),
        }
    }
}

/// Channel arrangement seen by a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PictureMode {
    Rgb,
    Rgba,
}

impl PictureMode {
    pub fn channels(&self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

impl From<PixelFormat> for PictureMode {
    fn from(format: PixelFormat) -> Self {
        match format {
            PixelFormat::Rgba => Self::Rgba,
            _ => Self::Rgb,
        }
    }
}

/// Memory layout marker passed to transforms. The filter only produces
/// packed frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Packed,
    Planar,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_formats() {
        assert_eq!(StreamRole::Primary.required_format(), PixelFormat::Rgb24);
        assert_eq!(StreamRole::Output.required_format(), PixelFormat::Rgb24);
        assert_eq!(StreamRole::Logo.required_format(), PixelFormat::Rgba);
        assert!(!StreamRole::Output.is_input());
    }

    #[test]
    fn test_picture_mode_derivation() {
        assert_eq!(PictureMode::from(PixelFormat::Rgba), PictureMode::Rgba);
        assert_eq!(PictureMode::from(PixelFormat::Rgb24), PictureMode::Rgb);
        assert_eq!(
            PictureMode::from(PixelFormat::Rgba).channels(),
            PixelFormat::Rgba.bytes_per_pixel()
        );
    }

    #[test]
    fn test_parse_pixel_format() {
        assert_eq!("RGB24".parse::<PixelFormat>().unwrap(), PixelFormat::Rgb24);
        assert_eq!("rgba".parse::<PixelFormat>().unwrap(), PixelFormat::Rgba);
        assert!("yuv420p".parse::<PixelFormat>().is_err());
    }
}
