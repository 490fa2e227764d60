use super::FrameSink;
use crate::error::{MattingError, Result};
use crate::matting::MattingResult;
use std::path::PathBuf;

/// Writes a single result image. The alpha variant saves as one grayscale
/// channel, the merge variant as RGB.
pub struct ImageFileSink {
    path: PathBuf,
}

impl ImageFileSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl FrameSink for ImageFileSink {
    fn write(&mut self, result: &MattingResult) -> Result<()> {
        let saved = match result {
            MattingResult::Alpha(mask) => mask.save(&self.path),
            MattingResult::Merge(frame) => frame.to_rgb().save(&self.path),
        };
        saved.map_err(|e| MattingError::SinkWrite(format!("{}: {}", self.path.display(), e)))?;
        tracing::info!("Output: {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use image::GrayImage;

    #[test]
    fn alpha_result_saves_a_grayscale_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        let mask = GrayImage::from_pixel(5, 3, image::Luma([127]));

        let mut sink = ImageFileSink::new(&path);
        sink.write(&MattingResult::Alpha(mask)).unwrap();

        let reloaded = image::open(&path).unwrap().to_luma8();
        assert_eq!(reloaded.dimensions(), (5, 3));
        assert!(reloaded.pixels().all(|p| p[0] == 127));
    }

    #[test]
    fn merge_result_round_trips_through_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fg.png");
        let frame = Frame::new(1, 1, vec![30, 20, 10]).unwrap(); // BGR

        let mut sink = ImageFileSink::new(&path);
        sink.write(&MattingResult::Merge(frame)).unwrap();

        let reloaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(reloaded.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn unwritable_path_is_a_sink_write_error() {
        let mask = GrayImage::new(2, 2);
        let mut sink = ImageFileSink::new("/no/such/dir/mask.png");
        let err = sink.write(&MattingResult::Alpha(mask)).unwrap_err();
        assert!(matches!(err, MattingError::SinkWrite(_)));
    }
}
