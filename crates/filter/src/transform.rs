//! Pluggable per-frame transforms and their selection.

use std::fmt;
use std::str::FromStr;

use tmblock_common::error::TmblockError;
use tmblock_frame_model::{Layout, Picture, PictureMut};

/// A per-frame transform.
///
/// Receives the primary picture, the logo picture, the logo offset, the
/// output picture to fill and the memory layout marker. Returns `0` on
/// success, in which case `output` must be fully written; any other value is
/// a failure and the output is discarded.
pub trait Transform {
    fn apply(
        &mut self,
        input: &Picture<'_>,
        logo: &Picture<'_>,
        offset_x: i32,
        offset_y: i32,
        output: &mut PictureMut<'_>,
        layout: Layout,
    ) -> i32;
}

impl<F> Transform for F
where
    F: FnMut(&Picture<'_>, &Picture<'_>, i32, i32, &mut PictureMut<'_>, Layout) -> i32,
{
    fn apply(
        &mut self,
        input: &Picture<'_>,
        logo: &Picture<'_>,
        offset_x: i32,
        offset_y: i32,
        output: &mut PictureMut<'_>,
        layout: Layout,
    ) -> i32 {
        self(input, logo, offset_x, offset_y, output, layout)
    }
}

/// Which transform the filter binds at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformSelection {
    /// Embed the logo as a watermark.
    Embed,
    /// Remove the watermark by pre-processing.
    Pre,
    /// Remove the watermark by post-processing.
    Post,
}

impl TransformSelection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Embed => "embed",
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}

impl fmt::Display for TransformSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransformSelection {
    type Err = TmblockError;

    /// Accepts the names or their numeric indices (`0` embed, `1` pre,
    /// `2` post).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embed" | "0" => Ok(Self::Embed),
            "pre" | "1" => Ok(Self::Pre),
            "post" | "2" => Ok(Self::Post),
            other => Err(TmblockError::config(format!(
                "unknown transform '{other}' (expected embed, pre or post)"
            ))),
        }
    }
}

/// The three transform strategies a filter can be built with.
pub struct TransformSet {
    embed: Box<dyn Transform>,
    pre: Box<dyn Transform>,
    post: Box<dyn Transform>,
}

impl TransformSet {
    pub fn new(
        embed: impl Transform + 'static,
        pre: impl Transform + 'static,
        post: impl Transform + 'static,
    ) -> Self {
        Self {
            embed: Box::new(embed),
            pre: Box::new(pre),
            post: Box::new(post),
        }
    }

    /// Bind one strategy; the others are dropped.
    pub fn resolve(self, selection: TransformSelection) -> Box<dyn Transform> {
        match selection {
            TransformSelection::Embed => self.embed,
            TransformSelection::Pre => self.pre,
            TransformSelection::Post => self.post,
        }
    }
}

impl fmt::Debug for TransformSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformSet").finish_non_exhaustive()
    }
}
