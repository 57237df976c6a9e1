//! Seams to the host pipeline: output frame allocation and downstream
//! delivery.

use tmblock_common::error::{TmblockError, TmblockResult};
use tmblock_frame_model::{FrameLedger, LinkProps, VideoFrame};

/// Allocates output frames for a configured link.
pub trait FrameAllocator {
    fn alloc_video(&mut self, link: &LinkProps) -> TmblockResult<VideoFrame>;
}

/// Receives output frames. Ownership moves to the sink on every call,
/// whether or not it succeeds.
pub trait FrameSink {
    fn push(&mut self, frame: VideoFrame) -> TmblockResult<()>;
}

/// Heap-backed allocator with optional row alignment, release accounting,
/// and an allocation budget for exercising exhaustion paths.
#[derive(Debug, Clone)]
pub struct HeapAllocator {
    align: usize,
    ledger: Option<FrameLedger>,
    budget: Option<u64>,
    allocated: u64,
}

impl HeapAllocator {
    /// Rows padded to 32 bytes, no accounting, no budget.
    pub fn new() -> Self {
        Self {
            align: 32,
            ledger: None,
            budget: None,
            allocated: 0,
        }
    }

    pub fn with_align(mut self, align: usize) -> Self {
        self.align = align.max(1);
        self
    }

    /// Record every allocated frame in `ledger`.
    pub fn with_ledger(mut self, ledger: FrameLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Fail with resource exhaustion after `frames` allocations.
    pub fn with_budget(mut self, frames: u64) -> Self {
        self.budget = Some(frames);
        self
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAllocator for HeapAllocator {
    fn alloc_video(&mut self, link: &LinkProps) -> TmblockResult<VideoFrame> {
        if self.budget.is_some_and(|budget| self.allocated >= budget) {
            return Err(TmblockError::resource_exhausted(format!(
                "allocation budget of {} frames spent",
                self.allocated
            )));
        }

        let frame = VideoFrame::new_aligned(link.width, link.height, link.format, self.align)?;
        self.allocated += 1;
        Ok(match &self.ledger {
            Some(ledger) => frame.tracked(ledger),
            None => frame,
        })
    }
}

/// Collects output frames in arrival order.
#[derive(Debug, Default)]
pub struct CollectSink {
    frames: Vec<VideoFrame>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[VideoFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Hand over everything collected so far.
    pub fn take(&mut self) -> Vec<VideoFrame> {
        std::mem::take(&mut self.frames)
    }
}

impl FrameSink for CollectSink {
    fn push(&mut self, frame: VideoFrame) -> TmblockResult<()> {
        self.frames.push(frame);
        Ok(())
    }
}
