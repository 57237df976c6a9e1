//! Run the filter end to end over raw video files.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use tmblock_common::config::{AppConfig, SyncMode};
use tmblock_common::error::TmblockError;
use tmblock_filter::{FrameSink, HeapAllocator, TmBlockFilter, TransformSet};
use tmblock_frame_model::{LinkProps, Offset, PixelFormat, Rational, StreamRole, VideoFrame};

use crate::rawvideo::{FrameSize, RawVideoReader, RawVideoWriter};

pub struct CompositeArgs {
    pub input: PathBuf,
    pub size: FrameSize,
    pub logo: PathBuf,
    pub logo_size: FrameSize,
    pub offset_x: Option<i32>,
    pub offset_y: Option<i32>,
    pub func: Option<String>,
    pub sync: Option<SyncMode>,
    pub fps: Rational,
    pub still_logo: bool,
    pub config: Option<PathBuf>,
    pub output: PathBuf,
}

/// Embed, pre and post from `tmblock-transforms`.
pub fn builtin_transforms() -> TransformSet {
    TransformSet::new(
        tmblock_transforms::embed,
        tmblock_transforms::pre,
        tmblock_transforms::post,
    )
}

/// Where the logo frames come from.
enum LogoSource<R> {
    Stream(RawVideoReader<R>),
    /// One frame, cloned for every primary frame.
    Still(VideoFrame),
}

impl<R: std::io::Read> LogoSource<R> {
    fn next_for(&mut self, pts: Option<i64>) -> anyhow::Result<Option<VideoFrame>> {
        match self {
            Self::Stream(reader) => Ok(reader.read_frame()?),
            Self::Still(frame) => {
                let mut frame = frame.clone();
                frame.props.pts = pts;
                Ok(Some(frame))
            }
        }
    }
}

#[derive(Debug, Default)]
struct RunSummary {
    primary_frames: u64,
    logo_frames: u64,
    transform_failures: u64,
}

pub fn run(args: CompositeArgs) -> anyhow::Result<()> {
    let mut app = match &args.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load(),
    };
    if let Some(x) = args.offset_x {
        app.filter.offset_x = x;
    }
    if let Some(y) = args.offset_y {
        app.filter.offset_y = y;
    }
    if let Some(func) = &args.func {
        app.filter.func = func.clone();
    }
    if let Some(sync) = args.sync {
        app.filter.sync = sync;
    }

    let offset = Offset::new(app.filter.offset_x, app.filter.offset_y);
    if !offset.fits(
        args.logo_size.width,
        args.logo_size.height,
        args.size.width,
        args.size.height,
    ) {
        tracing::warn!(
            offset_x = offset.x,
            offset_y = offset.y,
            logo = %args.logo_size,
            frame = %args.size,
            "Logo does not fit inside the frame and will be clipped"
        );
    }

    let writer = RawVideoWriter::create(&args.output)?;
    let mut filter = TmBlockFilter::with_config(
        &app.filter,
        builtin_transforms(),
        HeapAllocator::new(),
        writer,
    );
    let output_link = configure(&mut filter, &args)?;

    let primary = RawVideoReader::open(&args.input, args.size, PixelFormat::Rgb24)?;
    let mut logo_reader = RawVideoReader::open(&args.logo, args.logo_size, PixelFormat::Rgba)?;
    let logo = if args.still_logo {
        let frame = logo_reader
            .read_frame()?
            .context("Logo file holds no complete frame")?;
        LogoSource::Still(frame)
    } else {
        LogoSource::Stream(logo_reader)
    };

    let summary = feed(&mut filter, primary, logo)?;

    filter.uninit();
    let stats = filter.stats();
    let sink = filter.sink_mut();
    sink.flush()?;
    let written = sink.frames_written();

    let millis = Rational::rescale(
        written as i64,
        output_link.time_base,
        Rational::new(1, 1000),
    );
    println!(
        "Wrote {} ({} frames, {}x{})",
        args.output.display(),
        written,
        output_link.width,
        output_link.height
    );
    println!("  Transform: {}", app.filter.func);
    println!("  Offset: ({}, {})", offset.x, offset.y);
    println!("  Duration: {:.3}s", millis as f64 / 1000.0);
    println!(
        "  Input frames: {} primary, {} logo",
        summary.primary_frames, summary.logo_frames
    );
    if summary.transform_failures > 0 {
        println!("  Transform failures: {}", summary.transform_failures);
    }
    if stats.frames_dropped > 0 {
        println!("  Stale logo frames skipped: {}", stats.frames_dropped);
    }
    if stats.frames_discarded > 0 {
        println!("  Unpaired frames discarded: {}", stats.frames_discarded);
    }
    std::io::stdout().flush().ok();

    Ok(())
}

/// Initialize, negotiate formats and configure links.
fn configure<S: FrameSink>(
    filter: &mut TmBlockFilter<HeapAllocator, S>,
    args: &CompositeArgs,
) -> anyhow::Result<LinkProps> {
    filter.init().context("Failed to initialize filter")?;
    filter.query_formats()?;
    for role in StreamRole::ALL {
        filter.negotiate(role, &[role.required_format()])?;
    }
    filter.config_input(
        StreamRole::Primary,
        LinkProps::new(PixelFormat::Rgb24, args.size.width, args.size.height, args.fps),
    )?;
    filter.config_input(
        StreamRole::Logo,
        LinkProps::new(
            PixelFormat::Rgba,
            args.logo_size.width,
            args.logo_size.height,
            args.fps,
        ),
    )?;
    Ok(filter.config_output()?)
}

/// Push every input frame and process pairs as they form. A failed
/// transform costs one output frame; any other error stops the run.
fn feed<S: FrameSink, R: std::io::Read>(
    filter: &mut TmBlockFilter<HeapAllocator, S>,
    mut primary: RawVideoReader<R>,
    mut logo: LogoSource<R>,
) -> anyhow::Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut logo_done = false;

    while let Some(frame) = primary.read_frame()? {
        let pts = frame.pts();
        filter.filter_frame(StreamRole::Primary, frame)?;
        summary.primary_frames += 1;

        if !logo_done {
            match logo.next_for(pts)? {
                Some(frame) => {
                    filter.filter_frame(StreamRole::Logo, frame)?;
                    summary.logo_frames += 1;
                }
                None => {
                    tracing::info!(frames = summary.logo_frames, "Logo stream ended");
                    filter.end_of_stream(StreamRole::Logo)?;
                    logo_done = true;
                }
            }
        }

        while pump(filter, &mut summary)? {}
        if logo_done && filter.queued(StreamRole::Logo) == 0 {
            break;
        }
    }

    filter.end_of_stream(StreamRole::Primary)?;
    if !logo_done {
        filter.end_of_stream(StreamRole::Logo)?;
    }
    while pump(filter, &mut summary)? {}

    Ok(summary)
}

/// Process at most one pair. Returns `false` once no pair can form until
/// more input arrives, or ever again.
fn pump<S: FrameSink>(
    filter: &mut TmBlockFilter<HeapAllocator, S>,
    summary: &mut RunSummary,
) -> anyhow::Result<bool> {
    match filter.activate() {
        Ok(()) => Ok(true),
        Err(e) if e.is_would_block() || e.is_end_of_stream() => Ok(false),
        Err(TmblockError::TransformFailed { code }) => {
            summary.transform_failures += 1;
            tracing::warn!(code, "Skipping frame after transform failure");
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}
