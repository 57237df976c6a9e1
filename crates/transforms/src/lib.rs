//! TMBlock Transforms
//!
//! Reference per-frame transforms with the filter's transform contract
//! `(primary, logo, offset_x, offset_y, output, layout) -> status`:
//! - **Embed:** Alpha-composite the RGBA logo over the RGB primary
//! - **Pre:** Remove a known logo by inverting the blend
//! - **Post:** Inverse blend, then fill fully opaque logo pixels from neighbours
//!
//! This crate is pure computation: no I/O, no allocation of frames.
//! A status of `0` means the output picture was fully written.

pub mod embed;
pub mod region;
pub mod status;
pub mod unblend;

pub use embed::embed;
pub use status::TransformStatus;
pub use unblend::{post, pre};
