mod image_source;
mod video;
mod webcam;

pub use image_source::ImageSource;
pub use video::VideoSource;
pub use webcam::WebcamSource;

use crate::error::Result;
use crate::frame::Frame;

/// A stream of frames feeding one matting session.
///
/// Each returned frame is owned by the caller for the duration of one
/// pipeline step; `None` means end of stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Resolution of the frames this source produces.
    fn resolution(&self) -> (u32, u32);

    /// Total frame count, when the source knows its own length.
    fn frame_count(&self) -> Option<u64> {
        None
    }

    /// Native frame rate, when the source has one.
    fn fps(&self) -> Option<f64> {
        None
    }
}
