//! Per-stream FIFO of frames waiting to be paired.

use std::collections::VecDeque;

use tmblock_frame_model::{StreamRole, VideoFrame};

/// Frames from one input that the synchronizer has not taken yet.
///
/// There is no depth limit here: the synchronizer only takes frames when a
/// pair can form, and the host decides how much to push.
#[derive(Debug)]
pub struct FrameQueue {
    role: StreamRole,
    frames: VecDeque<VideoFrame>,
}

impl FrameQueue {
    pub fn new(role: StreamRole) -> Self {
        Self {
            role,
            frames: VecDeque::new(),
        }
    }

    pub fn role(&self) -> StreamRole {
        self.role
    }

    pub fn enqueue(&mut self, frame: VideoFrame) {
        self.frames.push_back(frame);
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// The oldest queued frame.
    pub fn peek(&self) -> Option<&VideoFrame> {
        self.frames.front()
    }

    /// The `n`-th oldest queued frame, `0` being the head.
    pub fn peek_nth(&self, n: usize) -> Option<&VideoFrame> {
        self.frames.get(n)
    }

    /// The newest queued frame.
    pub fn peek_last(&self) -> Option<&VideoFrame> {
        self.frames.back()
    }

    pub fn pop(&mut self) -> Option<VideoFrame> {
        self.frames.pop_front()
    }

    /// Timestamps of the queued frames, oldest first.
    pub fn timestamps(&self) -> Vec<Option<i64>> {
        self.frames.iter().map(VideoFrame::pts).collect()
    }

    /// Release every queued frame. Returns how many were released.
    pub fn discard_all(&mut self) -> usize {
        let count = self.frames.len();
        self.frames.clear();
        if count > 0 {
            tracing::debug!(stream = %self.role, count, "Discarded queued frames");
        }
        count
    }
}
