use super::ports::{TensorBinding, ALPHA, STATE_PORTS};
use super::state::HiddenStateStore;
use crate::error::Result;
use ndarray::{Array4, Ix4};
use ort::{GraphOptimizationLevel, Session};
use std::path::Path;

/// Alpha map plus the recurrent state produced by one inference step.
pub struct StepOutput {
    /// Raw alpha at model resolution, row-major, values nominally 0..=1.
    pub alpha: Vec<f32>,
    /// State outputs `s1o..s4o`, to be absorbed before the next step.
    pub state: [Array4<f32>; 4],
}

/// Owner of the compiled model and the single in-flight inference request.
///
/// `run_step` takes `&mut self`, so at most one call per session is ever in
/// flight. A backend-reported failure is returned as-is and never retried;
/// the caller tears the stream down.
pub struct InferenceSession {
    session: Session,
}

impl InferenceSession {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();
        tracing::info!("Loading matting model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)?;

        tracing::info!("Matting model loaded successfully");
        Ok(Self { session })
    }

    /// Bind the frame and the four state inputs, run one inference call,
    /// and return the alpha output plus the new state.
    ///
    /// All bindings borrow caller-owned memory; the borrows held by this
    /// call keep that memory alive and unmodified until it returns.
    pub fn run_step(
        &mut self,
        img: TensorBinding<'_, u8>,
        state: &HiddenStateStore,
    ) -> Result<StepOutput> {
        let _span = tracing::debug_span!("inference").entered();
        let bindings = state.as_input_bindings();

        let outputs = self.session.run(ort::inputs![
            img.port() => img.view(),
            bindings[0].port() => bindings[0].view(),
            bindings[1].port() => bindings[1].view(),
            bindings[2].port() => bindings[2].view(),
            bindings[3].port() => bindings[3].view(),
        ]?)?;

        let alpha: Vec<f32> = outputs[ALPHA]
            .try_extract_tensor::<f32>()?
            .iter()
            .copied()
            .collect();

        let extract = |name: &str| -> Result<Array4<f32>> {
            Ok(outputs[name]
                .try_extract_tensor::<f32>()?
                .to_owned()
                .into_dimensionality::<Ix4>()?)
        };
        let state = [
            extract(STATE_PORTS[0].output)?,
            extract(STATE_PORTS[1].output)?,
            extract(STATE_PORTS[2].output)?,
            extract(STATE_PORTS[3].output)?,
        ];

        Ok(StepOutput { alpha, state })
    }
}
