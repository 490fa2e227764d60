use crate::frame::Frame;
use crate::matting::OutputMode;
use image::GrayImage;

/// Final product of one matting step, at the original frame resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MattingResult {
    /// Single-channel alpha mask, 0 = background, 255 = foreground.
    Alpha(GrayImage),
    /// Foreground composited on black, three BGR channels.
    Merge(Frame),
}

impl MattingResult {
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            MattingResult::Alpha(mask) => mask.dimensions(),
            MattingResult::Merge(frame) => frame.resolution(),
        }
    }

    /// Raw pixel bytes: one byte per pixel for a mask, three for a merge.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MattingResult::Alpha(mask) => mask.as_raw(),
            MattingResult::Merge(frame) => frame.as_bytes(),
        }
    }
}

/// Turns an alpha mask into the requested output. Pure and idempotent:
/// identical inputs produce byte-identical results.
pub struct MattingPostprocessor;

impl MattingPostprocessor {
    /// The mask must already be sized to the original frame's resolution.
    pub fn produce(mask: &GrayImage, original: &Frame, mode: OutputMode) -> MattingResult {
        match mode {
            OutputMode::Alpha => MattingResult::Alpha(mask.clone()),
            OutputMode::Merge => MattingResult::Merge(Self::composite(mask, original)),
        }
    }

    /// Multiply each channel by the broadcast alpha:
    /// `out = round(channel * alpha / 255)`, clamped to 0..=255.
    pub fn composite(mask: &GrayImage, original: &Frame) -> Frame {
        let (width, height) = original.resolution();
        debug_assert_eq!(mask.dimensions(), (width, height));

        let src = original.as_bytes();
        let alpha = mask.as_raw();
        let mut out = Vec::with_capacity(src.len());
        for (pixel, &a) in src.chunks_exact(3).zip(alpha.iter()) {
            let a = a as f32 / 255.0;
            for &channel in pixel {
                out.push((channel as f32 * a).round().clamp(0.0, 255.0) as u8);
            }
        }
        Frame::new(width, height, out).expect("composite preserves frame geometry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_of(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, image::Luma([value]))
    }

    #[test]
    fn alpha_mode_returns_the_mask_at_frame_resolution() {
        let frame = Frame::black(6, 4);
        let mask = mask_of(6, 4, 200);
        let result = MattingPostprocessor::produce(&mask, &frame, OutputMode::Alpha);
        assert_eq!(result.resolution(), (6, 4));
        assert_eq!(result.as_bytes(), mask.as_raw().as_slice());
    }

    #[test]
    fn merge_follows_the_rounding_formula() {
        // One pixel, BGR (10, 128, 255), alpha 100:
        // round(10*100/255)=4, round(128*100/255)=50, round(255*100/255)=100
        let frame = Frame::new(1, 1, vec![10, 128, 255]).unwrap();
        let mask = mask_of(1, 1, 100);
        let result = MattingPostprocessor::produce(&mask, &frame, OutputMode::Merge);
        assert_eq!(result.as_bytes(), &[4, 50, 100]);
    }

    #[test]
    fn merge_extremes_pass_through() {
        let frame = Frame::new(2, 1, vec![7, 8, 9, 250, 251, 252]).unwrap();
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(0, 0, image::Luma([0]));
        mask.put_pixel(1, 0, image::Luma([255]));
        let merged = MattingPostprocessor::composite(&mask, &frame);
        assert_eq!(merged.as_bytes(), &[0, 0, 0, 250, 251, 252]);
    }

    #[test]
    fn postprocessing_is_idempotent() {
        let frame = Frame::new(2, 2, (0u8..12).collect()).unwrap();
        let mask = mask_of(2, 2, 173);
        let first = MattingPostprocessor::produce(&mask, &frame, OutputMode::Merge);
        let second = MattingPostprocessor::produce(&mask, &frame, OutputMode::Merge);
        assert_eq!(first, second);
    }
}
