use ndarray::ArrayView4;

/// Model input resolution. The network is exported static at 1920x1080
/// with u8 NHWC BGR preprocessing folded into the graph.
pub const MODEL_WIDTH: u32 = 1920;
pub const MODEL_HEIGHT: u32 = 1080;

/// Frame input port.
pub const IMG: &str = "img";
/// Alpha output port, f32 [1, 1, 1080, 1920].
pub const ALPHA: &str = "alp";

/// One recurrent state slot: its input port, the output port that refills
/// it, and its fixed NCHW shape.
#[derive(Debug, Clone, Copy)]
pub struct StatePort {
    pub input: &'static str,
    pub output: &'static str,
    pub shape: [usize; 4],
}

impl StatePort {
    pub const fn element_count(&self) -> usize {
        self.shape[0] * self.shape[1] * self.shape[2] * self.shape[3]
    }
}

/// The four recurrent feature maps, largest first. Shapes are fixed by the
/// static export and never change after session construction.
pub const STATE_PORTS: [StatePort; 4] = [
    StatePort {
        input: "s1i",
        output: "s1o",
        shape: [1, 16, 135, 240],
    },
    StatePort {
        input: "s2i",
        output: "s2o",
        shape: [1, 20, 68, 120],
    },
    StatePort {
        input: "s3i",
        output: "s3o",
        shape: [1, 40, 34, 60],
    },
    StatePort {
        input: "s4i",
        output: "s4o",
        shape: [1, 64, 17, 30],
    },
];

/// A non-owning view over caller-owned tensor memory, paired with the port
/// it feeds. The borrow ties the memory's validity to the inference call
/// the binding is passed to.
#[derive(Debug)]
pub struct TensorBinding<'a, T> {
    port: &'static str,
    view: ArrayView4<'a, T>,
}

impl<'a, T> TensorBinding<'a, T> {
    pub fn new(port: &'static str, view: ArrayView4<'a, T>) -> Self {
        Self { port, view }
    }

    pub fn port(&self) -> &'static str {
        self.port
    }

    pub fn view(&self) -> ArrayView4<'a, T> {
        self.view.clone()
    }

    pub fn element_count(&self) -> usize {
        self.view.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_element_counts_match_export() {
        let counts: Vec<usize> = STATE_PORTS.iter().map(|p| p.element_count()).collect();
        assert_eq!(counts, vec![518_400, 163_200, 81_600, 32_640]);
    }

    #[test]
    fn port_names_pair_inputs_with_outputs() {
        for port in &STATE_PORTS {
            assert_eq!(&port.input[..2], &port.output[..2]);
            assert!(port.input.ends_with('i'));
            assert!(port.output.ends_with('o'));
        }
    }
}
