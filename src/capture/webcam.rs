use super::FrameSource;
use crate::error::{MattingError, Result};
use crate::frame::Frame;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

/// Live camera source backed by nokhwa. Runs until the device stops
/// producing frames or the driver is cancelled.
pub struct WebcamSource {
    camera: Camera,
    width: u32,
    height: u32,
}

impl WebcamSource {
    pub fn open(device_index: u32) -> Result<Self> {
        tracing::info!("Opening camera {}", device_index);

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(index, requested).map_err(|e| MattingError::SourceOpen {
            path: format!("camera:{device_index}").into(),
            reason: e.to_string(),
        })?;
        camera.open_stream().map_err(|e| MattingError::SourceOpen {
            path: format!("camera:{device_index}").into(),
            reason: e.to_string(),
        })?;

        let resolution = camera.resolution();
        tracing::info!(
            "Camera {} streaming at {}x{}",
            device_index,
            resolution.width(),
            resolution.height()
        );

        Ok(Self {
            camera,
            width: resolution.width(),
            height: resolution.height(),
        })
    }
}

impl FrameSource for WebcamSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        // A capture failure on a live device means the device stopped
        // producing; report end of stream rather than an error so the
        // driver can terminate cleanly.
        let buffer = match self.camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                tracing::warn!("Camera stopped producing frames: {}", e);
                return Ok(None);
            }
        };
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| MattingError::SourceOpen {
                path: "camera".into(),
                reason: format!("failed to decode camera frame: {e}"),
            })?;
        Ok(Some(Frame::from_rgb(&decoded)))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::debug!("Error stopping camera stream: {}", e);
        }
    }
}
