use crate::capture::FrameSource;
use crate::error::{MattingError, Result};
use crate::frame::Frame;
use crate::matting::{MatteStep, MattingPostprocessor};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use std::time::Duration;

/// Base 16:9 tile of the negotiable output geometries.
pub const TILE_WIDTH: u32 = 160;
pub const TILE_HEIGHT: u32 = 90;
/// Largest advertised geometry, 2880x1620.
pub const MAX_TILE_SCALE: u32 = 18;

const TILE_BYTES: usize = (TILE_WIDTH * TILE_HEIGHT * 3) as usize;
/// Padding written past the end of the produced frame.
const PAD_BYTE: u8 = 255;

/// One negotiable output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcamFormat {
    pub width: u32,
    pub height: u32,
    /// Nominal delivery interval; consumers may poll slower or faster.
    pub frame_interval: Duration,
}

/// The closed set of formats offered to the host: every multiple of the
/// base tile up to the maximum scale.
pub fn supported_formats() -> Vec<VcamFormat> {
    (1..=MAX_TILE_SCALE)
        .map(|scale| VcamFormat {
            width: TILE_WIDTH * scale,
            height: TILE_HEIGHT * scale,
            frame_interval: Duration::from_millis(100),
        })
        .collect()
}

/// Derive the frame geometry from the length of the buffer the host hands
/// over: the largest tile multiple whose BGR frame fits.
pub fn negotiated_geometry(buffer_len: usize) -> Option<(u32, u32)> {
    let scale = ((buffer_len / TILE_BYTES) as f64).sqrt() as u32;
    if scale == 0 {
        return None;
    }
    let scale = scale.min(MAX_TILE_SCALE);
    Some((TILE_WIDTH * scale, TILE_HEIGHT * scale))
}

/// Whether the last fill delivered live matting output or degraded to
/// synthetic noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Live,
    Degraded,
}

/// Pull-driven adapter between the matting pipeline and a virtual-camera
/// host. The host calls `fill_buffer` once per buffer it wants; the feeder
/// must always return a fully defined buffer and must never block
/// indefinitely.
///
/// The feeder owns its step and camera exclusively; its recurrent state is
/// never shared with a file or preview stream.
pub struct VirtualCameraFeeder<S, C> {
    step: S,
    camera: Option<C>,
    rng: SmallRng,
}

impl<S: MatteStep, C: FrameSource> VirtualCameraFeeder<S, C> {
    /// `camera` is `None` when the capture device could not be opened; the
    /// feeder then produces noise instead of failing the host graph.
    pub fn new(mut step: S, camera: Option<C>) -> Self {
        step.reset();
        if camera.is_none() {
            tracing::warn!("No camera available, virtual camera will produce noise");
        }
        Self {
            step,
            camera,
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Fill one host buffer. Copies at most the produced frame's bytes,
    /// pads the remainder with a fixed sentinel, and yields briefly so
    /// cooperating threads are never starved.
    pub fn fill_buffer(&mut self, buffer: &mut [u8]) -> FeedStatus {
        let status = match negotiated_geometry(buffer.len()) {
            Some((width, height)) => match self.next_composite(width, height) {
                Ok(frame) => {
                    let bytes = frame.as_bytes();
                    let copied = bytes.len().min(buffer.len());
                    buffer[..copied].copy_from_slice(&bytes[..copied]);
                    buffer[copied..].fill(PAD_BYTE);
                    FeedStatus::Live
                }
                Err(e) => {
                    tracing::warn!("Virtual camera degraded to noise: {}", e);
                    // A failed step leaves the recurrent state mid-update;
                    // discard it so the next live attempt starts from a
                    // fresh zeroed state instead of reusing corrupt buffers.
                    self.step.reset();
                    self.rng.fill_bytes(buffer);
                    FeedStatus::Degraded
                }
            },
            None => {
                self.rng.fill_bytes(buffer);
                FeedStatus::Degraded
            }
        };

        // Yield between pulls; the host may poll from a tight loop.
        std::thread::sleep(Duration::from_millis(1));
        status
    }

    /// One full matting iteration: capture, matte, composite, scale to the
    /// negotiated geometry.
    fn next_composite(&mut self, width: u32, height: u32) -> Result<Frame> {
        let camera = self.camera.as_mut().ok_or_else(|| MattingError::SourceOpen {
            path: "camera".into(),
            reason: "no capture device".to_string(),
        })?;
        let frame = camera
            .next_frame()?
            .ok_or_else(|| MattingError::SourceOpen {
                path: "camera".into(),
                reason: "device stopped producing frames".to_string(),
            })?;

        let mask = self.step.step(&frame)?;
        let composite = MattingPostprocessor::composite(&mask, &frame);
        Ok(composite.resized(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    struct FullStep;

    impl MatteStep for FullStep {
        fn step(&mut self, frame: &Frame) -> Result<GrayImage> {
            let (w, h) = frame.resolution();
            Ok(GrayImage::from_pixel(w, h, image::Luma([255])))
        }

        fn reset(&mut self) {}
    }

    struct SolidCamera {
        value: u8,
    }

    impl FrameSource for SolidCamera {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            let data = vec![self.value; 320 * 180 * 3];
            Ok(Some(Frame::new(320, 180, data).unwrap()))
        }

        fn resolution(&self) -> (u32, u32) {
            (320, 180)
        }
    }

    #[test]
    fn geometry_follows_the_tile_grid() {
        assert_eq!(negotiated_geometry(TILE_BYTES), Some((160, 90)));
        assert_eq!(negotiated_geometry(TILE_BYTES * 4), Some((320, 180)));
        assert_eq!(negotiated_geometry(TILE_BYTES * 9), Some((480, 270)));
        // Between grid points the geometry rounds down.
        assert_eq!(negotiated_geometry(TILE_BYTES * 3), Some((160, 90)));
        assert_eq!(negotiated_geometry(TILE_BYTES - 1), None);
    }

    #[test]
    fn formats_are_tile_multiples() {
        let formats = supported_formats();
        assert_eq!(formats.len(), MAX_TILE_SCALE as usize);
        assert_eq!(formats[0].width, 160);
        assert_eq!(formats[17].height, 1620);
        assert!(formats.iter().all(|f| f.width * 9 == f.height * 16));
    }

    #[test]
    fn live_fill_copies_the_frame_and_pads_the_tail() {
        let mut feeder = VirtualCameraFeeder::new(FullStep, Some(SolidCamera { value: 200 }));
        // Three tiles' worth of buffer negotiates a one-tile frame, so the
        // tail past the frame must be sentinel-padded.
        let mut buffer = vec![0u8; TILE_BYTES * 3];
        let status = feeder.fill_buffer(&mut buffer);

        assert_eq!(status, FeedStatus::Live);
        assert!(buffer[..TILE_BYTES].iter().all(|&b| b == 200));
        assert!(buffer[TILE_BYTES..].iter().all(|&b| b == PAD_BYTE));
    }

    #[test]
    fn inference_failure_resets_state_before_the_next_live_frame() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct FlakyStep {
            failures_left: u32,
            resets: Rc<Cell<u32>>,
        }

        impl MatteStep for FlakyStep {
            fn step(&mut self, frame: &Frame) -> Result<GrayImage> {
                if self.failures_left > 0 {
                    self.failures_left -= 1;
                    return Err(MattingError::SinkWrite("injected failure".to_string()));
                }
                let (w, h) = frame.resolution();
                Ok(GrayImage::from_pixel(w, h, image::Luma([255])))
            }

            fn reset(&mut self) {
                self.resets.set(self.resets.get() + 1);
            }
        }

        let resets = Rc::new(Cell::new(0));
        let step = FlakyStep {
            failures_left: 1,
            resets: Rc::clone(&resets),
        };
        let mut feeder = VirtualCameraFeeder::new(step, Some(SolidCamera { value: 50 }));
        let after_construction = resets.get();

        let mut buffer = vec![0u8; TILE_BYTES];
        assert_eq!(feeder.fill_buffer(&mut buffer), FeedStatus::Degraded);
        // The failed step's state was discarded, not carried forward.
        assert_eq!(resets.get(), after_construction + 1);

        // The next pull runs live again, from fresh state.
        assert_eq!(feeder.fill_buffer(&mut buffer), FeedStatus::Live);
        assert!(buffer.iter().all(|&b| b == 50));
    }

    #[test]
    fn missing_camera_degrades_to_a_fully_defined_buffer() {
        let mut feeder: VirtualCameraFeeder<FullStep, SolidCamera> =
            VirtualCameraFeeder::new(FullStep, None);
        let mut buffer = vec![0u8; TILE_BYTES];
        let status = feeder.fill_buffer(&mut buffer);
        assert_eq!(status, FeedStatus::Degraded);
    }

    #[test]
    fn undersized_buffer_is_noise_filled_without_panicking() {
        let mut feeder = VirtualCameraFeeder::new(FullStep, Some(SolidCamera { value: 10 }));
        let mut buffer = vec![0u8; 100];
        assert_eq!(feeder.fill_buffer(&mut buffer), FeedStatus::Degraded);
    }
}
