use crate::capture::FrameSource;
use crate::error::Result;
use crate::matting::{MatteStep, MattingPostprocessor, OutputMode};
use crate::sink::FrameSink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Lifecycle of one stream. The driver zeroes the recurrent state on entry
/// to `Initialized` and never processes a frame outside `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Initialized,
    Running,
    Terminated,
}

/// Per-stream configuration: output mode plus an optional pacing rate for
/// live sinks.
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    pub mode: OutputMode,
    pub target_fps: Option<u32>,
}

/// Drives the per-frame loop of one matting stream: read, matte,
/// postprocess, deliver, until the source is exhausted or the stream is
/// cancelled. Each driver owns its step's recurrent state exclusively for
/// the duration of the run, so concurrent streams never share state.
pub struct StreamDriver<'a> {
    step: &'a mut dyn MatteStep,
    config: StreamConfig,
    state: DriverState,
}

impl<'a> StreamDriver<'a> {
    pub fn new(step: &'a mut dyn MatteStep, config: StreamConfig) -> Self {
        Self {
            step,
            config,
            state: DriverState::Idle,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Run the stream to completion. Returns the number of frames
    /// delivered. Any step or sink failure terminates the stream with no
    /// retry; the recurrent state is considered unusable afterwards.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        cancel: &AtomicBool,
    ) -> Result<u64> {
        self.step.reset();
        self.state = DriverState::Initialized;

        let result = self.run_loop(source, sink, cancel);
        self.state = DriverState::Terminated;
        if let Err(e) = &result {
            tracing::error!("Stream terminated with error: {}", e);
        }
        result
    }

    fn run_loop(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        cancel: &AtomicBool,
    ) -> Result<u64> {
        let total_hint = source.frame_count();
        let frame_duration = self
            .config
            .target_fps
            .map(|fps| Duration::from_secs_f64(1.0 / fps as f64));

        let mut frames = 0u64;
        let mut processing_time = Duration::ZERO;
        let mut sink_time = Duration::ZERO;

        loop {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!("Stream cancelled after {} frames", frames);
                break;
            }
            let loop_start = Instant::now();

            let Some(frame) = source.next_frame()? else {
                break;
            };
            self.state = DriverState::Running;

            // The frame stays alive across the whole step; the inference
            // bindings borrow from it or from the adapter's resized copy.
            let mask = self.step.step(&frame)?;
            let result = MattingPostprocessor::produce(&mask, &frame, self.config.mode);
            processing_time += loop_start.elapsed();

            let sink_start = Instant::now();
            sink.write(&result)?;
            sink_time += sink_start.elapsed();

            frames += 1;
            self.report_progress(frames, total_hint, processing_time, sink_time);

            if let Some(frame_duration) = frame_duration {
                let elapsed = loop_start.elapsed();
                if elapsed < frame_duration {
                    std::thread::sleep(frame_duration - elapsed);
                }
            }
        }

        sink.finish()?;
        tracing::info!(
            "Stream finished: {} frames, processing {:.1}ms/frame, sink {:.1}ms/frame",
            frames,
            avg_ms(processing_time, frames),
            avg_ms(sink_time, frames)
        );
        Ok(frames)
    }

    fn report_progress(
        &self,
        frames: u64,
        total_hint: Option<u64>,
        processing_time: Duration,
        sink_time: Duration,
    ) {
        match total_hint {
            Some(total) if total > 1 => {
                let percent = 100.0 * frames as f64 / total as f64;
                if frames % 30 == 0 || frames == total {
                    tracing::info!(
                        "Frame {}/{} [{:3.0}%], processing {:.1}ms/frame",
                        frames,
                        total,
                        percent,
                        avg_ms(processing_time, frames)
                    );
                }
            }
            _ => {
                if frames % 30 == 0 {
                    tracing::info!(
                        "Frame {}: processing {:.1}ms/frame, sink {:.1}ms/frame",
                        frames,
                        avg_ms(processing_time, frames),
                        avg_ms(sink_time, frames)
                    );
                }
            }
        }
    }
}

fn avg_ms(total: Duration, frames: u64) -> f64 {
    if frames == 0 {
        return 0.0;
    }
    total.as_secs_f64() * 1000.0 / frames as f64
}
