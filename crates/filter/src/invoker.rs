//! Turns a synchronized pair into one output frame.

use tmblock_common::error::{TmblockError, TmblockResult};
use tmblock_frame_model::{Layout, LinkProps, Offset};

use crate::framesync::{FramePair, PairHandler};
use crate::host::{FrameAllocator, FrameSink};
use crate::transform::{Transform, TransformSelection};

/// Failure and delivery counters kept by the compositor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositorStats {
    pub emitted: u64,
    pub alloc_failures: u64,
    pub transform_failures: u64,
    pub emit_failures: u64,
}

/// Allocates the output, runs the bound transform, and emits the result.
pub struct Compositor<M, S> {
    transform: Option<(TransformSelection, Box<dyn Transform>)>,
    offset: Offset,
    output_link: Option<LinkProps>,
    allocator: M,
    sink: S,
    stats: CompositorStats,
}

impl<M: FrameAllocator, S: FrameSink> Compositor<M, S> {
    pub fn new(offset: Offset, allocator: M, sink: S) -> Self {
        Self {
            transform: None,
            offset,
            output_link: None,
            allocator,
            sink,
            stats: CompositorStats::default(),
        }
    }

    /// Bind the transform used for every subsequent pair.
    pub fn bind(&mut self, selection: TransformSelection, transform: Box<dyn Transform>) {
        self.transform = Some((selection, transform));
    }

    pub fn selection(&self) -> Option<TransformSelection> {
        self.transform.as_ref().map(|(selection, _)| *selection)
    }

    pub fn set_output_link(&mut self, link: LinkProps) {
        self.output_link = Some(link);
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn stats(&self) -> CompositorStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn allocator(&self) -> &M {
        &self.allocator
    }

    /// Composite one pair. Both input frames are released before this
    /// returns, on every path; the output frame is either handed to the sink
    /// or released.
    pub fn composite(&mut self, pair: FramePair) -> TmblockResult<()> {
        let FramePair { primary, logo } = pair;

        let Some((selection, transform)) = self.transform.as_mut() else {
            return Err(TmblockError::invalid_state("no transform bound"));
        };
        let link = self
            .output_link
            .ok_or_else(|| TmblockError::invalid_state("output link not configured"))?;

        let mut output = self.allocator.alloc_video(&link).map_err(|e| {
            self.stats.alloc_failures += 1;
            tracing::warn!(error = %e, "Output frame allocation failed");
            e
        })?;
        debug_assert_eq!(
            (output.width(), output.height(), output.format()),
            (link.width, link.height, link.format),
            "allocator returned a frame that does not match the output link"
        );

        output.copy_props_from(&primary);
        let status = transform.apply(
            &primary.picture(),
            &logo.picture(),
            self.offset.x,
            self.offset.y,
            &mut output.picture_mut(),
            Layout::Packed,
        );
        drop(primary);
        drop(logo);

        if status != 0 {
            self.stats.transform_failures += 1;
            tracing::warn!(
                transform = %selection,
                status,
                pts = ?output.pts(),
                "Transform failed; dropping output frame"
            );
            return Err(TmblockError::TransformFailed { code: status });
        }

        let pts = output.pts();
        self.sink.push(output).map_err(|e| {
            self.stats.emit_failures += 1;
            tracing::warn!(error = %e, ?pts, "Downstream rejected output frame");
            e
        })?;
        self.stats.emitted += 1;
        tracing::debug!(?pts, transform = %selection, "Emitted composited frame");
        Ok(())
    }
}

impl<M: FrameAllocator, S: FrameSink> PairHandler for Compositor<M, S> {
    fn on_pair(&mut self, pair: FramePair) -> TmblockResult<()> {
        self.composite(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CollectSink, HeapAllocator};
    use tmblock_frame_model::{
        FrameLedger, Picture, PictureMut, PixelFormat, Rational, StreamRole, VideoFrame,
    };

    struct Status(i32);

    impl Transform for Status {
        fn apply(
            &mut self,
            input: &Picture<'_>,
            _logo: &Picture<'_>,
            _offset_x: i32,
            _offset_y: i32,
            output: &mut PictureMut<'_>,
            _layout: Layout,
        ) -> i32 {
            for y in 0..input.height() {
                output.row_mut(y).copy_from_slice(input.row(y));
            }
            self.0
        }
    }

    struct Rejecting;

    impl FrameSink for Rejecting {
        fn push(&mut self, _frame: VideoFrame) -> TmblockResult<()> {
            Err(TmblockError::emit("downstream closed"))
        }
    }

    fn link() -> LinkProps {
        LinkProps::new(PixelFormat::Rgb24, 4, 2, Rational::new(25, 1))
    }

    fn pair(ledger: &FrameLedger, pts: i64) -> FramePair {
        let mut primary = VideoFrame::new(4, 2, StreamRole::Primary.required_format())
            .unwrap()
            .with_pts(pts)
            .tracked(ledger);
        primary.props.key_frame = true;
        primary.data_mut().fill(9);
        FramePair {
            primary,
            logo: VideoFrame::new(1, 1, StreamRole::Logo.required_format())
                .unwrap()
                .tracked(ledger),
        }
    }

    fn compositor<S: FrameSink>(
        status: i32,
        ledger: &FrameLedger,
        sink: S,
    ) -> Compositor<HeapAllocator, S> {
        let alloc = HeapAllocator::new().with_ledger(ledger.clone());
        let mut c = Compositor::new(Offset::new(1, 1), alloc, sink);
        c.bind(TransformSelection::Embed, Box::new(Status(status)));
        c.set_output_link(link());
        c
    }

    #[test]
    fn test_success_emits_with_primary_props() {
        let ledger = FrameLedger::new();
        let mut c = compositor(0, &ledger, CollectSink::new());

        c.composite(pair(&ledger, 7)).unwrap();
        let out = &c.sink().frames()[0];
        assert_eq!(out.pts(), Some(7));
        assert!(out.props.key_frame);
        assert_eq!((out.width(), out.height()), (4, 2));
        assert_eq!(out.to_packed(), vec![9; 24]);
        assert_eq!(c.stats().emitted, 1);
        // Only the emitted output is still alive.
        assert_eq!(ledger.outstanding(), 1);
    }

    #[test]
    fn test_transform_failure_releases_everything() {
        let ledger = FrameLedger::new();
        let mut c = compositor(-5, &ledger, CollectSink::new());

        let err = c.composite(pair(&ledger, 0)).unwrap_err();
        assert!(matches!(err, TmblockError::TransformFailed { code: -5 }));
        assert!(c.sink().is_empty());
        assert_eq!(c.stats().transform_failures, 1);
        assert_eq!(ledger.allocated(), 3);
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn test_emit_failure_releases_everything() {
        let ledger = FrameLedger::new();
        let mut c = compositor(0, &ledger, Rejecting);

        let err = c.composite(pair(&ledger, 0)).unwrap_err();
        assert!(matches!(err, TmblockError::Emit { .. }));
        assert_eq!(c.stats().emit_failures, 1);
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn test_alloc_failure_releases_inputs() {
        let ledger = FrameLedger::new();
        let alloc = HeapAllocator::new().with_budget(0);
        let mut c = Compositor::new(Offset::default(), alloc, CollectSink::new());
        c.bind(TransformSelection::Pre, Box::new(Status(0)));
        c.set_output_link(link());

        let err = c.composite(pair(&ledger, 0)).unwrap_err();
        assert!(matches!(err, TmblockError::ResourceExhausted { .. }));
        assert_eq!(c.stats().alloc_failures, 1);
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn test_unbound_transform_is_invalid_state() {
        let ledger = FrameLedger::new();
        let mut c = Compositor::new(Offset::default(), HeapAllocator::new(), CollectSink::new());
        c.set_output_link(link());
        assert!(matches!(
            c.composite(pair(&ledger, 0)),
            Err(TmblockError::InvalidState { .. })
        ));
        assert_eq!(ledger.outstanding(), 0);
    }
}
