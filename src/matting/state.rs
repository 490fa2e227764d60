use super::ports::{TensorBinding, STATE_PORTS};
use crate::error::{MattingError, Result};
use ndarray::Array4;

/// Owner of the four recurrent state buffers carried between frames.
///
/// The buffers are zero-filled at construction and on `reset`, matching the
/// model's training-time initial state. After each inference step the
/// returned state outputs are absorbed by move, so step N's outputs become
/// step N+1's inputs verbatim. The move also makes it impossible to bind a
/// state buffer while the tensors that refill it are still in use.
pub struct HiddenStateStore {
    buffers: [Array4<f32>; 4],
}

impl HiddenStateStore {
    pub fn new() -> Self {
        Self {
            buffers: STATE_PORTS.map(|port| Array4::zeros(port.shape)),
        }
    }

    /// Zero-fill all four buffers. Must run before the first frame of a
    /// session; reuses the allocations.
    pub fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
    }

    /// Expose each buffer as a read-only binding for the next inference
    /// call. The borrow keeps the buffers alive and unmodified while the
    /// call runs.
    pub fn as_input_bindings(&self) -> [TensorBinding<'_, f32>; 4] {
        [
            TensorBinding::new(STATE_PORTS[0].input, self.buffers[0].view()),
            TensorBinding::new(STATE_PORTS[1].input, self.buffers[1].view()),
            TensorBinding::new(STATE_PORTS[2].input, self.buffers[2].view()),
            TensorBinding::new(STATE_PORTS[3].input, self.buffers[3].view()),
        ]
    }

    /// Replace the buffers with the state outputs of the step that just
    /// completed. Taking the outputs by value enforces the ordering: they
    /// only exist once the inference call has returned.
    pub fn absorb_outputs(&mut self, outputs: [Array4<f32>; 4]) -> Result<()> {
        for (port, output) in STATE_PORTS.iter().zip(&outputs) {
            if output.shape() != port.shape {
                return Err(MattingError::ShapeMismatch {
                    port: port.output,
                    expected: port.element_count(),
                    actual: output.len(),
                });
            }
        }
        self.buffers = outputs;
        Ok(())
    }
}

impl Default for HiddenStateStore {
    fn default() -> Self {
        Self::new()
    }
}
