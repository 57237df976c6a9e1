//! TMBlock Filter
//!
//! Composites a logo stream onto a primary stream, one output frame per
//! synchronized pair of input frames.
//!
//! # Pipeline Architecture
//!
//! ```text
//! primary frames ──► primary queue ──┐
//!                                    ├── FrameSync (Aligner) ──► FramePair
//! logo frames ─────► logo queue ─────┘                              │
//!                                                                   ▼
//!                          FrameAllocator ──► Compositor ──► Transform
//!                                                  │
//!                                                  ▼
//!                                              FrameSink
//! ```
//!
//! The filter is driven by a host: it never spawns threads and never blocks.
//! Every call either completes or reports [`TmblockError::WouldBlock`] so the
//! host can retry once more input has arrived.
//!
//! [`TmblockError::WouldBlock`]: tmblock_common::error::TmblockError::WouldBlock

pub mod filter;
pub mod formats;
pub mod framesync;
pub mod host;
pub mod invoker;
pub mod queue;
pub mod transform;

pub use filter::{aligner_for, FilterStats, LifecycleState, TmBlockFilter};
pub use formats::{config_output, FormatNegotiator};
pub use framesync::{
    Aligner, FifoAligner, FramePair, FrameSync, PairHandler, SyncState, TimestampAligner,
};
pub use host::{CollectSink, FrameAllocator, FrameSink, HeapAllocator};
pub use invoker::{Compositor, CompositorStats};
pub use queue::FrameQueue;
pub use transform::{Transform, TransformSelection, TransformSet};
