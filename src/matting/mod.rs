mod adapter;
pub mod ports;
mod postprocess;
mod session;
mod state;

pub use adapter::FrameAdapter;
pub use postprocess::{MattingPostprocessor, MattingResult};
pub use session::{InferenceSession, StepOutput};
pub use state::HiddenStateStore;

use crate::error::{MattingError, Result};
use crate::frame::Frame;
use image::GrayImage;
use std::path::Path;
use std::str::FromStr;

/// What a matting step delivers: the mask itself or the composited
/// foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Alpha,
    Merge,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Alpha => "alpha",
            OutputMode::Merge => "merge",
        }
    }
}

impl FromStr for OutputMode {
    type Err = MattingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "alpha" => Ok(OutputMode::Alpha),
            "merge" => Ok(OutputMode::Merge),
            other => Err(MattingError::InvalidMode(other.to_string())),
        }
    }
}

/// One matting step: frame in, alpha mask at the frame's resolution out.
///
/// The seam exists so stream plumbing can be exercised without a model;
/// `MattingPipeline` is the real implementation.
pub trait MatteStep {
    fn step(&mut self, frame: &Frame) -> Result<GrayImage>;

    /// Drop temporal context. Call when starting a new stream.
    fn reset(&mut self);
}

/// The full recurrent matting pipeline: frame adaptation, one inference
/// call, state hand-off, and alpha upscaling.
pub struct MattingPipeline {
    session: InferenceSession,
    state: HiddenStateStore,
    adapter: FrameAdapter,
}

impl MattingPipeline {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Ok(Self {
            session: InferenceSession::new(model_path)?,
            state: HiddenStateStore::new(),
            adapter: FrameAdapter::new(),
        })
    }
}

impl MatteStep for MattingPipeline {
    fn step(&mut self, frame: &Frame) -> Result<GrayImage> {
        let _span = tracing::debug_span!("matte_step").entered();

        // `input` lives until after run_step returns, so the img binding's
        // memory is valid for the whole inference call.
        let input = self.adapter.to_model_input(frame);
        let binding = self.adapter.bind_image(&input)?;
        let output = self.session.run_step(binding, &self.state)?;

        // Absorb strictly after the call completed and before the next one
        // can start; run_step and absorb_outputs both need &mut self.
        self.state.absorb_outputs(output.state)?;

        self.adapter
            .alpha_to_resolution(&output.alpha, frame.width(), frame.height())
    }

    fn reset(&mut self) {
        tracing::debug!("Resetting recurrent matting state");
        self.state.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_the_two_valid_strings() {
        assert_eq!("alpha".parse::<OutputMode>().unwrap(), OutputMode::Alpha);
        assert_eq!("merge".parse::<OutputMode>().unwrap(), OutputMode::Merge);
    }

    #[test]
    fn any_other_mode_is_a_configuration_error() {
        for bad in ["Alpha", "MERGE", "mask", ""] {
            assert!(matches!(
                bad.parse::<OutputMode>(),
                Err(MattingError::InvalidMode(_))
            ));
        }
    }
}
