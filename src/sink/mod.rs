mod image_file;
mod loopback;
mod video_file;

pub use image_file::ImageFileSink;
pub use loopback::LoopbackSink;
pub use video_file::{VideoFileSink, DEFAULT_FPS};

use crate::error::Result;
use crate::matting::MattingResult;

/// Destination for matting results.
pub trait FrameSink {
    /// Deliver one result. A write failure aborts the current stream.
    fn write(&mut self, result: &MattingResult) -> Result<()>;

    /// Flush and close. Called once when the stream terminates normally.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
