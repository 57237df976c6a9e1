//! The filter instance and its lifecycle.

use serde::Serialize;
use tmblock_common::config::{FilterConfig, SyncMode};
use tmblock_common::error::{TmblockError, TmblockResult};
use tmblock_frame_model::{LinkProps, Offset, PixelFormat, StreamRole, VideoFrame};

use crate::formats::{config_output, FormatNegotiator};
use crate::framesync::{Aligner, FifoAligner, FrameSync, TimestampAligner};
use crate::host::{FrameAllocator, FrameSink};
use crate::invoker::Compositor;
use crate::queue::FrameQueue;
use crate::transform::{TransformSelection, TransformSet};

/// Where a filter instance is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    TornDown,
}

/// Counters describing what the filter did with its frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub pairs_formed: u64,
    pub frames_emitted: u64,
    pub alloc_failures: u64,
    pub transform_failures: u64,
    pub emit_failures: u64,
    /// Queued frames released without processing at teardown.
    pub frames_discarded: u64,
    /// Logo frames the aligner released as stale.
    pub frames_dropped: u64,
    /// Frames refused by `filter_frame`.
    pub frames_rejected: u64,
}

/// The aligner a [`SyncMode`] stands for, with placeholder time bases until
/// the links are configured.
pub fn aligner_for(mode: SyncMode) -> Box<dyn Aligner> {
    match mode {
        SyncMode::Fifo => Box::new(FifoAligner),
        SyncMode::Timestamp => Box::new(TimestampAligner::default()),
    }
}

/// Logo compositing filter with two inputs (`primary`, `logo`) and one
/// output.
///
/// Generic over the host's frame allocator and downstream sink.
pub struct TmBlockFilter<M, S> {
    config: FilterConfig,
    state: LifecycleState,
    transforms: Option<TransformSet>,
    negotiator: FormatNegotiator,
    primary_link: Option<LinkProps>,
    logo_link: Option<LinkProps>,
    output_link: Option<LinkProps>,
    primary: FrameQueue,
    logo: FrameQueue,
    sync: FrameSync,
    compositor: Compositor<M, S>,
    frames_discarded: u64,
    frames_rejected: u64,
}

impl<M: FrameAllocator, S: FrameSink> TmBlockFilter<M, S> {
    /// Store the configuration. Nothing is validated until [`init`](Self::init).
    pub fn new(
        config: &FilterConfig,
        transforms: TransformSet,
        aligner: Box<dyn Aligner>,
        allocator: M,
        sink: S,
    ) -> Self {
        let offset = Offset::new(config.offset_x, config.offset_y);
        Self {
            config: config.clone(),
            state: LifecycleState::Uninitialized,
            transforms: Some(transforms),
            negotiator: FormatNegotiator::new(),
            primary_link: None,
            logo_link: None,
            output_link: None,
            primary: FrameQueue::new(StreamRole::Primary),
            logo: FrameQueue::new(StreamRole::Logo),
            sync: FrameSync::new(aligner),
            compositor: Compositor::new(offset, allocator, sink),
            frames_discarded: 0,
            frames_rejected: 0,
        }
    }

    /// Build with the aligner named by `config.sync`.
    pub fn with_config(
        config: &FilterConfig,
        transforms: TransformSet,
        allocator: M,
        sink: S,
    ) -> Self {
        Self::new(config, transforms, aligner_for(config.sync), allocator, sink)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// The bound transform, once initialized.
    pub fn selection(&self) -> Option<TransformSelection> {
        self.compositor.selection()
    }

    /// Resolve the transform selection, configure the synchronizer and bind
    /// the compositor as its pair handler.
    pub fn init(&mut self) -> TmblockResult<()> {
        if self.state != LifecycleState::Uninitialized {
            return Err(TmblockError::invalid_state(format!(
                "init called in state {:?}",
                self.state
            )));
        }

        let selection: TransformSelection = self.config.func.parse().map_err(|e| {
            tracing::error!(func = %self.config.func, "Invalid transform selection");
            e
        })?;
        self.sync.configure()?;

        let transforms = self
            .transforms
            .take()
            .ok_or_else(|| TmblockError::invalid_state("transforms already consumed"))?;
        self.compositor.bind(selection, transforms.resolve(selection));
        self.state = LifecycleState::Ready;

        tracing::info!(
            transform = %selection,
            offset_x = self.config.offset_x,
            offset_y = self.config.offset_y,
            aligner = self.sync.aligner_name(),
            "TMBlock filter initialized"
        );
        Ok(())
    }

    /// Propose one pixel format per endpoint.
    pub fn query_formats(&mut self) -> TmblockResult<()> {
        self.ensure_not_torn_down()?;
        self.negotiator.query_formats()
    }

    /// Settle an endpoint on a format from what its peer can handle.
    pub fn negotiate(
        &mut self,
        role: StreamRole,
        offered: &[PixelFormat],
    ) -> TmblockResult<PixelFormat> {
        self.ensure_not_torn_down()?;
        self.negotiator.negotiate(role, offered)
    }

    /// Record the properties of an input link.
    pub fn config_input(&mut self, role: StreamRole, link: LinkProps) -> TmblockResult<()> {
        self.ensure_not_torn_down()?;
        let expected = self.expected_format(role)?;
        if link.format != expected {
            return Err(TmblockError::format_rejected(
                role.name(),
                format!("link carries {} but {expected} was negotiated", link.format),
            ));
        }

        tracing::debug!(
            endpoint = %role,
            width = link.width,
            height = link.height,
            time_base = %link.time_base,
            "Input link configured"
        );
        match role {
            StreamRole::Primary => self.primary_link = Some(link),
            _ => self.logo_link = Some(link),
        }
        Ok(())
    }

    /// Derive the output link from the primary link and hand the time bases
    /// to the aligner. Every endpoint must have accepted its format first.
    pub fn config_output(&mut self) -> TmblockResult<LinkProps> {
        self.ensure_not_torn_down()?;
        if !self.negotiator.is_complete() {
            let pending: Vec<&str> = StreamRole::ALL
                .iter()
                .filter(|role| self.negotiator.accepted(**role).is_none())
                .map(|role| role.name())
                .collect();
            return Err(TmblockError::invalid_state(format!(
                "format negotiation incomplete for {}",
                pending.join(", ")
            )));
        }
        let primary = self
            .primary_link
            .ok_or_else(|| TmblockError::invalid_state("primary link not configured"))?;
        let logo_tb = match (self.logo_link, self.config.sync) {
            (Some(link), _) => link.time_base,
            (None, SyncMode::Fifo) => primary.time_base,
            (None, SyncMode::Timestamp) => {
                return Err(TmblockError::invalid_state(
                    "timestamp sync needs the logo link configured",
                ))
            }
        };

        let output = config_output(&primary);
        self.sync.set_time_bases(primary.time_base, logo_tb)?;
        self.compositor.set_output_link(output);
        self.output_link = Some(output);

        tracing::debug!(
            width = output.width,
            height = output.height,
            time_base = %output.time_base,
            frame_rate = %output.frame_rate,
            "Output link configured"
        );
        Ok(output)
    }

    pub fn output_link(&self) -> Option<LinkProps> {
        self.output_link
    }

    /// Queue a frame arriving on an input. A rejected frame is released.
    pub fn filter_frame(&mut self, role: StreamRole, frame: VideoFrame) -> TmblockResult<()> {
        self.ensure_ready()?;
        if let Err(e) = self.check_frame(role, &frame) {
            self.frames_rejected += 1;
            tracing::warn!(endpoint = %role, pts = ?frame.pts(), error = %e, "Rejected input frame");
            return Err(e);
        }

        tracing::trace!(endpoint = %role, pts = ?frame.pts(), "Frame queued");
        match role {
            StreamRole::Primary => self.primary.enqueue(frame),
            _ => self.logo.enqueue(frame),
        }
        Ok(())
    }

    /// One synchronization attempt and, if a pair forms, one processing
    /// event.
    pub fn activate(&mut self) -> TmblockResult<()> {
        self.ensure_ready()?;
        if self.output_link.is_none() {
            return Err(TmblockError::invalid_state("output link not configured"));
        }
        self.sync
            .activate(&mut self.primary, &mut self.logo, &mut self.compositor)
    }

    /// Activate until no pair can form. Returns how many pairs were
    /// processed; stops at the first processing error.
    pub fn drain(&mut self) -> TmblockResult<usize> {
        let mut processed = 0;
        loop {
            match self.activate() {
                Ok(()) => processed += 1,
                Err(e) if e.is_would_block() || e.is_end_of_stream() => return Ok(processed),
                Err(e) => return Err(e),
            }
        }
    }

    /// Mark an input finished.
    pub fn end_of_stream(&mut self, role: StreamRole) -> TmblockResult<()> {
        self.ensure_not_torn_down()?;
        if !role.is_input() {
            return Err(TmblockError::invalid_state(format!("{role} is not an input")));
        }
        self.sync.mark_eof(role);
        tracing::debug!(endpoint = %role, "End of stream");
        Ok(())
    }

    /// Frames waiting on an input queue.
    pub fn queued(&self, role: StreamRole) -> usize {
        match role {
            StreamRole::Primary => self.primary.len(),
            StreamRole::Logo => self.logo.len(),
            StreamRole::Output => 0,
        }
    }

    /// Release every queued frame without processing it. Safe to call more
    /// than once.
    pub fn uninit(&mut self) {
        if self.state == LifecycleState::TornDown {
            return;
        }
        let discarded = self.primary.discard_all() + self.logo.discard_all();
        self.frames_discarded += discarded as u64;
        self.state = LifecycleState::TornDown;

        let stats = self.stats();
        tracing::info!(
            pairs = stats.pairs_formed,
            emitted = stats.frames_emitted,
            discarded,
            "TMBlock filter torn down"
        );
    }

    pub fn stats(&self) -> FilterStats {
        let compositor = self.compositor.stats();
        FilterStats {
            pairs_formed: self.sync.pairs(),
            frames_emitted: compositor.emitted,
            alloc_failures: compositor.alloc_failures,
            transform_failures: compositor.transform_failures,
            emit_failures: compositor.emit_failures,
            frames_discarded: self.frames_discarded,
            frames_dropped: self.sync.dropped(),
            frames_rejected: self.frames_rejected,
        }
    }

    pub fn sink(&self) -> &S {
        self.compositor.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.compositor.sink_mut()
    }

    pub fn allocator(&self) -> &M {
        self.compositor.allocator()
    }

    fn ensure_not_torn_down(&self) -> TmblockResult<()> {
        if self.state == LifecycleState::TornDown {
            return Err(TmblockError::invalid_state("filter has been torn down"));
        }
        Ok(())
    }

    fn ensure_ready(&self) -> TmblockResult<()> {
        match self.state {
            LifecycleState::Ready => Ok(()),
            LifecycleState::Uninitialized => {
                Err(TmblockError::invalid_state("filter not initialized"))
            }
            LifecycleState::TornDown => {
                Err(TmblockError::invalid_state("filter has been torn down"))
            }
        }
    }

    fn expected_format(&self, role: StreamRole) -> TmblockResult<PixelFormat> {
        if !role.is_input() {
            return Err(TmblockError::invalid_state(format!("{role} is not an input")));
        }
        Ok(self
            .negotiator
            .accepted(role)
            .unwrap_or_else(|| role.required_format()))
    }

    fn check_frame(&self, role: StreamRole, frame: &VideoFrame) -> TmblockResult<()> {
        let expected = self.expected_format(role)?;
        if frame.format() != expected {
            return Err(TmblockError::format_rejected(
                role.name(),
                format!("frame is {} but {expected} was negotiated", frame.format()),
            ));
        }
        if let (StreamRole::Primary, Some(link)) = (role, self.primary_link) {
            if (frame.width(), frame.height()) != (link.width, link.height) {
                return Err(TmblockError::format_rejected(
                    role.name(),
                    format!(
                        "frame is {}x{} but the link is {}x{}",
                        frame.width(),
                        frame.height(),
                        link.width,
                        link.height
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl<M, S> std::fmt::Debug for TmBlockFilter<M, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmBlockFilter")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("primary_queued", &self.primary.len())
            .field("logo_queued", &self.logo.len())
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}
