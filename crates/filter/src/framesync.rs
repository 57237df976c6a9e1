//! Pairing of primary and logo frames.
//!
//! [`FrameSync`] is a two-state machine. It stays in `Waiting` until both
//! queues can yield a frame, takes exactly one frame from each through the
//! configured [`Aligner`], moves to `Ready`, hands the pair to the
//! processing handler once, and returns to `Waiting`. A failed retrieval
//! never takes a frame and never calls the handler.

use tmblock_common::error::{TmblockError, TmblockResult};
use tmblock_frame_model::{Rational, StreamRole, VideoFrame};

use crate::queue::FrameQueue;

/// One primary frame and the logo frame aligned with it.
#[derive(Debug)]
pub struct FramePair {
    pub primary: VideoFrame,
    pub logo: VideoFrame,
}

/// Pairing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No complete pair available.
    Waiting,
    /// A pair was taken and is being processed.
    Ready,
}

/// The two-stream alignment primitive.
///
/// Called only when both queues hold at least one frame. Implementations
/// may release stale frames, but must either take one frame from each queue
/// or none at all. `logo_ended` is set once the logo input is finished and
/// no further logo frame can arrive.
pub trait Aligner {
    fn name(&self) -> &'static str;

    /// Validate internal settings before the first pair.
    fn configure(&mut self) -> TmblockResult<()> {
        Ok(())
    }

    /// Called once the input links are configured.
    fn set_time_bases(&mut self, _primary: Rational, _logo: Rational) -> TmblockResult<()> {
        Ok(())
    }

    fn align(
        &mut self,
        primary: &mut FrameQueue,
        logo: &mut FrameQueue,
        logo_ended: bool,
    ) -> TmblockResult<FramePair>;

    /// Frames released without being paired.
    fn dropped(&self) -> u64 {
        0
    }
}

fn take_heads(primary: &mut FrameQueue, logo: &mut FrameQueue) -> TmblockResult<FramePair> {
    if primary.is_empty() || logo.is_empty() {
        return Err(TmblockError::would_block("both queues must hold a frame"));
    }
    match (primary.pop(), logo.pop()) {
        (Some(primary), Some(logo)) => Ok(FramePair { primary, logo }),
        _ => Err(TmblockError::sync("queue emptied during alignment")),
    }
}

/// Pairs queue heads in arrival order.
#[derive(Debug, Default, Clone, Copy)]
pub struct FifoAligner;

impl Aligner for FifoAligner {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn align(
        &mut self,
        primary: &mut FrameQueue,
        logo: &mut FrameQueue,
        _logo_ended: bool,
    ) -> TmblockResult<FramePair> {
        take_heads(primary, logo)
    }
}

/// Pairs each primary frame with the newest logo frame whose timestamp does
/// not run ahead of it. Older logo frames are released.
///
/// While every queued logo frame is earlier than the primary frame, a later
/// one may still match it, so the aligner waits unless the logo input has
/// ended. When every queued logo frame runs ahead of the primary frame, the
/// oldest is used: logo timestamps only grow, so nothing closer can arrive.
#[derive(Debug, Clone)]
pub struct TimestampAligner {
    primary_tb: Rational,
    logo_tb: Rational,
    dropped: u64,
}

impl TimestampAligner {
    pub fn new(primary_tb: Rational, logo_tb: Rational) -> Self {
        Self {
            primary_tb,
            logo_tb,
            dropped: 0,
        }
    }
}

impl Default for TimestampAligner {
    fn default() -> Self {
        Self::new(Rational::new(1, 1000), Rational::new(1, 1000))
    }
}

impl Aligner for TimestampAligner {
    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn configure(&mut self) -> TmblockResult<()> {
        if self.primary_tb.is_unset() || self.logo_tb.is_unset() {
            return Err(TmblockError::config(format!(
                "timestamp sync needs valid time bases (primary {}, logo {})",
                self.primary_tb, self.logo_tb
            )));
        }
        Ok(())
    }

    fn set_time_bases(&mut self, primary: Rational, logo: Rational) -> TmblockResult<()> {
        self.primary_tb = primary;
        self.logo_tb = logo;
        self.configure()
    }

    fn align(
        &mut self,
        primary: &mut FrameQueue,
        logo: &mut FrameQueue,
        logo_ended: bool,
    ) -> TmblockResult<FramePair> {
        if let Some(target) = primary.peek().and_then(VideoFrame::pts) {
            while let Some(next) = logo.peek_nth(1).and_then(VideoFrame::pts) {
                if Rational::compare_ts(next, self.logo_tb, target, self.primary_tb).is_gt() {
                    break;
                }
                if let Some(stale) = logo.pop() {
                    tracing::trace!(pts = ?stale.pts(), target, "Dropping stale logo frame");
                    self.dropped += 1;
                }
            }

            let newest = logo.peek_last().and_then(VideoFrame::pts);
            if let Some(newest) = newest.filter(|_| !logo_ended) {
                if Rational::compare_ts(newest, self.logo_tb, target, self.primary_tb).is_lt() {
                    return Err(TmblockError::would_block(format!(
                        "no logo frame at or after primary pts {target} yet"
                    )));
                }
            }
        }
        take_heads(primary, logo)
    }

    fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Receives each synchronized pair exactly once.
pub trait PairHandler {
    fn on_pair(&mut self, pair: FramePair) -> TmblockResult<()>;
}

/// The pairing state machine.
pub struct FrameSync {
    aligner: Box<dyn Aligner>,
    state: SyncState,
    configured: bool,
    primary_eof: bool,
    logo_eof: bool,
    pairs: u64,
}

impl FrameSync {
    pub fn new(aligner: Box<dyn Aligner>) -> Self {
        Self {
            aligner,
            state: SyncState::Waiting,
            configured: false,
            primary_eof: false,
            logo_eof: false,
            pairs: 0,
        }
    }

    pub fn configure(&mut self) -> TmblockResult<()> {
        self.aligner.configure()?;
        self.state = SyncState::Waiting;
        self.configured = true;
        tracing::debug!(aligner = self.aligner.name(), "Frame sync configured");
        Ok(())
    }

    pub fn set_time_bases(&mut self, primary: Rational, logo: Rational) -> TmblockResult<()> {
        self.aligner.set_time_bases(primary, logo)
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn aligner_name(&self) -> &'static str {
        self.aligner.name()
    }

    /// Pairs handed to the handler so far.
    pub fn pairs(&self) -> u64 {
        self.pairs
    }

    pub fn dropped(&self) -> u64 {
        self.aligner.dropped()
    }

    /// Mark an input as finished. Once its queue runs dry, activation
    /// reports end of stream instead of would-block.
    pub fn mark_eof(&mut self, role: StreamRole) {
        match role {
            StreamRole::Primary => self.primary_eof = true,
            StreamRole::Logo => self.logo_eof = true,
            StreamRole::Output => {}
        }
    }

    /// Try to form one pair and, if successful, process it.
    ///
    /// Returns the handler's result. Retrieval failures are returned without
    /// touching the handler.
    pub fn activate(
        &mut self,
        primary: &mut FrameQueue,
        logo: &mut FrameQueue,
        handler: &mut dyn PairHandler,
    ) -> TmblockResult<()> {
        if !self.configured {
            return Err(TmblockError::invalid_state("frame sync not configured"));
        }
        debug_assert_eq!(self.state, SyncState::Waiting);

        for (queue, eof) in [(&*primary, self.primary_eof), (&*logo, self.logo_eof)] {
            if queue.is_empty() {
                return Err(if eof {
                    TmblockError::end_of_stream(queue.role().name())
                } else {
                    TmblockError::would_block(format!("{} queue is empty", queue.role()))
                });
            }
        }

        let pair = self.aligner.align(primary, logo, self.logo_eof)?;
        self.state = SyncState::Ready;
        self.pairs += 1;
        tracing::trace!(
            pair = self.pairs,
            primary_pts = ?pair.primary.pts(),
            logo_pts = ?pair.logo.pts(),
            "Pair ready"
        );

        let result = handler.on_pair(pair);
        self.state = SyncState::Waiting;
        result
    }
}

impl std::fmt::Debug for FrameSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSync")
            .field("aligner", &self.aligner.name())
            .field("state", &self.state)
            .field("configured", &self.configured)
            .field("primary_eof", &self.primary_eof)
            .field("logo_eof", &self.logo_eof)
            .field("pairs", &self.pairs)
            .finish()
    }
}
