//! TMBlock Frame Model
//!
//! Defines the data contracts shared by the filter and its collaborators:
//! - **Formats:** Stream roles, pixel formats, picture modes and layouts
//! - **Frames:** Owned video frames, presentation properties, release accounting
//! - **Pictures:** Borrowed, non-owning views over a frame's pixel buffer
//! - **Links:** Negotiated per-endpoint geometry and timing
//!
//! Frames are the only owners of pixel memory. Everything else borrows.

pub mod format;
pub mod frame;
pub mod link;
pub mod picture;
pub mod rational;

pub use format::*;
pub use frame::*;
pub use link::*;
pub use picture::*;
pub use rational::*;
