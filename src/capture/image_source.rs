use super::FrameSource;
use crate::error::{MattingError, Result};
use crate::frame::Frame;
use std::path::Path;

/// Single-image source: yields its frame exactly once, then reports end of
/// stream.
#[derive(Debug)]
pub struct ImageSource {
    frame: Option<Frame>,
    resolution: (u32, u32),
}

impl ImageSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| MattingError::SourceOpen {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .to_rgb8();
        let frame = Frame::from_rgb(&image);
        let resolution = frame.resolution();

        tracing::info!(
            "Opened image {} ({}x{})",
            path.display(),
            resolution.0,
            resolution.1
        );
        Ok(Self {
            frame: Some(frame),
            resolution,
        })
    }
}

impl FrameSource for ImageSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frame.take())
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn frame_count(&self) -> Option<u64> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_path_is_a_source_open_error() {
        let err = ImageSource::open("/no/such/image.png").unwrap_err();
        assert!(matches!(err, MattingError::SourceOpen { .. }));
    }

    #[test]
    fn yields_exactly_one_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.png");
        image::RgbImage::from_pixel(8, 6, image::Rgb([1, 2, 3]))
            .save(&path)
            .unwrap();

        let mut source = ImageSource::open(&path).unwrap();
        assert_eq!(source.frame_count(), Some(1));
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.resolution(), (8, 6));
        assert!(source.next_frame().unwrap().is_none());
        assert!(source.next_frame().unwrap().is_none());
    }
}
