//! Real-time portrait matting on a recurrent video-matting network.
//!
//! One pipeline serves images, video files, live cameras, and a pull-based
//! virtual-camera feeder: frames are resized to the model's fixed input
//! shape, run through a single in-flight inference call together with four
//! recurrent state buffers, and the resulting alpha is scaled back to the
//! source resolution as either a mask or a foreground composite.

pub mod batch;
pub mod capture;
pub mod error;
pub mod frame;
pub mod matting;
pub mod sink;
pub mod stream;
pub mod vcam;

pub use error::{MattingError, Result};
pub use frame::Frame;
pub use matting::{
    FrameAdapter, HiddenStateStore, InferenceSession, MatteStep, MattingPipeline,
    MattingPostprocessor, MattingResult, OutputMode,
};
pub use stream::{DriverState, StreamConfig, StreamDriver};
pub use vcam::{FeedStatus, VirtualCameraFeeder};
