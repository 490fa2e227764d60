use super::ports::{TensorBinding, ALPHA, IMG, MODEL_HEIGHT, MODEL_WIDTH};
use crate::error::{MattingError, Result};
use crate::frame::Frame;
use image::{imageops, GrayImage};
use ndarray::ArrayView4;
use std::borrow::Cow;

/// Bridges arbitrary-resolution frames and the model's fixed geometry:
/// resizes frames down to the input shape and alpha maps back up.
pub struct FrameAdapter {
    model_width: u32,
    model_height: u32,
}

impl FrameAdapter {
    pub fn new() -> Self {
        Self {
            model_width: MODEL_WIDTH,
            model_height: MODEL_HEIGHT,
        }
    }

    pub fn model_resolution(&self) -> (u32, u32) {
        (self.model_width, self.model_height)
    }

    /// Resize a frame to the model input resolution. Frames already at
    /// model resolution are passed through without a copy.
    pub fn to_model_input<'a>(&self, frame: &'a Frame) -> Cow<'a, Frame> {
        if frame.resolution() == (self.model_width, self.model_height) {
            Cow::Borrowed(frame)
        } else {
            Cow::Owned(frame.resized(self.model_width, self.model_height))
        }
    }

    /// View a model-resolution frame as the `img` input binding,
    /// u8 NHWC BGR. The binding borrows the frame's pixel buffer, so the
    /// frame outlives the inference call by construction.
    pub fn bind_image<'a>(&self, frame: &'a Frame) -> Result<TensorBinding<'a, u8>> {
        let shape = (
            1,
            self.model_height as usize,
            self.model_width as usize,
            3,
        );
        let view: ArrayView4<'_, u8> = ArrayView4::from_shape(shape, frame.as_bytes())?;
        Ok(TensorBinding::new(IMG, view))
    }

    /// Quantize a raw model-resolution alpha map to 8 bits and resize it to
    /// the original frame resolution. Identity when the resolutions match.
    pub fn alpha_to_resolution(&self, alpha: &[f32], width: u32, height: u32) -> Result<GrayImage> {
        let expected = (self.model_width as usize) * (self.model_height as usize);
        if alpha.len() != expected {
            return Err(MattingError::ShapeMismatch {
                port: ALPHA,
                expected,
                actual: alpha.len(),
            });
        }

        let mask = GrayImage::from_fn(self.model_width, self.model_height, |x, y| {
            let idx = (y * self.model_width + x) as usize;
            let value = (alpha[idx] * 255.0).clamp(0.0, 255.0).round() as u8;
            image::Luma([value])
        });

        if (width, height) == (self.model_width, self.model_height) {
            return Ok(mask);
        }
        Ok(imageops::resize(
            &mask,
            width,
            height,
            imageops::FilterType::Triangle,
        ))
    }
}

impl Default for FrameAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_resolution_frame_is_passed_through() {
        let adapter = FrameAdapter::new();
        let frame = Frame::black(MODEL_WIDTH, MODEL_HEIGHT);
        assert!(matches!(
            adapter.to_model_input(&frame),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn other_resolutions_are_resized_to_model_shape() {
        let adapter = FrameAdapter::new();
        let frame = Frame::black(640, 360);
        let input = adapter.to_model_input(&frame);
        assert_eq!(input.resolution(), (MODEL_WIDTH, MODEL_HEIGHT));
    }

    #[test]
    fn image_binding_borrows_the_frame_buffer() {
        let adapter = FrameAdapter::new();
        let frame = Frame::black(MODEL_WIDTH, MODEL_HEIGHT);
        let binding = adapter.bind_image(&frame).unwrap();
        assert_eq!(binding.port(), IMG);
        assert_eq!(binding.element_count(), frame.byte_len());
    }

    #[test]
    fn alpha_round_trips_to_original_resolution() {
        let adapter = FrameAdapter::new();
        let alpha = vec![1.0f32; (MODEL_WIDTH * MODEL_HEIGHT) as usize];
        let mask = adapter.alpha_to_resolution(&alpha, 777, 333).unwrap();
        assert_eq!(mask.dimensions(), (777, 333));
        assert!(mask.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn alpha_quantizes_and_clamps() {
        let adapter = FrameAdapter::new();
        let mut alpha = vec![0.0f32; (MODEL_WIDTH * MODEL_HEIGHT) as usize];
        alpha[0] = 0.5;
        alpha[1] = 2.0;
        alpha[2] = -1.0;
        let mask = adapter
            .alpha_to_resolution(&alpha, MODEL_WIDTH, MODEL_HEIGHT)
            .unwrap();
        assert_eq!(mask.get_pixel(0, 0)[0], 128);
        assert_eq!(mask.get_pixel(1, 0)[0], 255);
        assert_eq!(mask.get_pixel(2, 0)[0], 0);
    }

    #[test]
    fn alpha_of_wrong_length_is_rejected() {
        let adapter = FrameAdapter::new();
        assert!(adapter.alpha_to_resolution(&[0.0; 4], 2, 2).is_err());
    }
}
