use anyhow::{bail, Context, Result};
use clap::Parser;
use mattecam::batch::{self, is_image_path};
use mattecam::capture::{FrameSource, ImageSource, VideoSource, WebcamSource};
use mattecam::sink::{ImageFileSink, LoopbackSink, VideoFileSink, DEFAULT_FPS};
use mattecam::{MattingPipeline, OutputMode, StreamConfig, StreamDriver};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Portrait matting for images, videos and cameras")]
struct Args {
    /// Path to the matting model (ONNX file)
    #[arg(long, default_value = "model/matting_1080p.onnx")]
    model: String,

    /// Input image/video file or directory. With --camera, the camera index.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory. Defaults to the input's directory; results are
    /// named after the input with a _result suffix.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output mode: alpha (mask) or merge (foreground on black)
    #[arg(short, long, default_value = "alpha")]
    mode: String,

    /// Capture from a camera and preview through the loopback device
    #[arg(short, long)]
    camera: bool,

    /// v4l2loopback device used as the live preview sink
    #[arg(long, default_value = "/dev/video10")]
    loopback: String,

    /// Override the output frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Configuration errors are reported before any session is constructed.
    let mode: OutputMode = args.mode.parse()?;
    if !args.camera && args.input.is_none() {
        bail!("path to a video or image is required: use --input (or --camera)");
    }

    let mut pipeline =
        MattingPipeline::new(&args.model).context("failed to load the matting model")?;
    let never_cancelled = AtomicBool::new(false);

    if args.camera {
        let index = camera_index(args.input.as_deref())?;
        return run_camera(&mut pipeline, index, &args.loopback, mode, args.fps);
    }

    let input = args.input.as_deref().unwrap();
    let output_dir = resolve_output_dir(input, args.output);

    if input.extension().is_none() {
        tracing::info!("Input is a directory, processing every file in it");
        let summary = batch::run_batch(input, |path| {
            process_file(
                &mut pipeline,
                path,
                &output_dir,
                mode,
                args.fps,
                &never_cancelled,
            )
        })?;
        if summary.failed > 0 {
            bail!(
                "{} of {} batch items failed",
                summary.failed,
                summary.failed + summary.succeeded
            );
        }
    } else {
        process_file(
            &mut pipeline,
            input,
            &output_dir,
            mode,
            args.fps,
            &never_cancelled,
        )?;
    }
    Ok(())
}

/// With --camera, --input is the capture device index; default 0.
fn camera_index(input: Option<&Path>) -> Result<u32> {
    match input.and_then(|p| p.to_str()) {
        None => Ok(0),
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("invalid camera id {raw:?}")),
    }
}

/// Default the output directory to the input's own directory, and reduce a
/// mistakenly specified filename to its parent.
fn resolve_output_dir(input: &Path, output: Option<PathBuf>) -> PathBuf {
    let fallback = || {
        if input.extension().is_some() {
            input.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            input.to_path_buf()
        }
    };
    match output {
        None => {
            tracing::info!("No output directory given, using the input's directory");
            fallback()
        }
        Some(dir) if dir.extension().is_some() => {
            tracing::warn!(
                "Only an output directory is expected, ignoring the filename in {}",
                dir.display()
            );
            dir.parent().map(Path::to_path_buf).unwrap_or_else(fallback)
        }
        Some(dir) => dir,
    }
}

/// One complete matting job over a single file, with a fresh recurrent
/// state.
fn process_file(
    pipeline: &mut MattingPipeline,
    input: &Path,
    output_dir: &Path,
    mode: OutputMode,
    fps_override: Option<u32>,
    cancel: &AtomicBool,
) -> mattecam::Result<()> {
    let output = batch::result_path(input, output_dir);
    let config = StreamConfig {
        mode,
        target_fps: None,
    };

    if is_image_path(input) {
        tracing::info!("Input is image: {}", input.display());
        let mut source = ImageSource::open(input)?;
        let mut sink = ImageFileSink::new(&output);
        StreamDriver::new(pipeline, config).run(&mut source, &mut sink, cancel)?;
    } else {
        tracing::info!("Input is video: {}", input.display());
        let mut source = VideoSource::open(input)?;
        let (width, height) = source.resolution();
        let fps = fps_override
            .map(f64::from)
            .or_else(|| source.fps())
            .unwrap_or(DEFAULT_FPS);
        let mut sink = VideoFileSink::new(&output, width, height, fps, mode)?;
        StreamDriver::new(pipeline, config).run(&mut source, &mut sink, cancel)?;
    }
    Ok(())
}

/// Live camera preview: matte each captured frame and write it to the
/// loopback device until Ctrl+C or the device stops producing. The driver
/// checks the flag once per iteration and exits the loop cleanly, so the
/// camera stream is stopped on the way out.
fn run_camera(
    pipeline: &mut MattingPipeline,
    index: u32,
    loopback: &str,
    mode: OutputMode,
    fps: Option<u32>,
) -> Result<()> {
    let mut source = WebcamSource::open(index)?;
    let (width, height) = source.resolution();
    let mut sink = LoopbackSink::open(loopback, width, height)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .context("failed to install the Ctrl+C handler")?;

    tracing::info!("Processing camera stream, press Ctrl+C to stop");
    let config = StreamConfig {
        mode,
        target_fps: fps,
    };
    StreamDriver::new(pipeline, config).run(&mut source, &mut sink, &cancel)?;
    Ok(())
}
