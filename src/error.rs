use std::path::PathBuf;
use thiserror::Error;

/// Result type for matting operations.
pub type Result<T, E = MattingError> = std::result::Result<T, E>;

/// Errors that can occur while setting up or running a matting stream.
#[derive(Debug, Error)]
pub enum MattingError {
    #[error("invalid output mode {0:?}, mode must be alpha or merge")]
    InvalidMode(String),

    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,

    #[error("cannot open source {path}: {reason}")]
    SourceOpen { path: PathBuf, reason: String },

    #[error("cannot open sink {path}: {reason}")]
    SinkOpen { path: PathBuf, reason: String },

    #[error("cannot write frame to sink: {0}")]
    SinkWrite(String),

    #[error("ffprobe failed on {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("port {port}: expected {expected} elements, got {actual}")]
    ShapeMismatch {
        port: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("frame buffer of {actual} bytes does not hold a {width}x{height} BGR image")]
    FrameSize {
        width: u32,
        height: u32,
        actual: usize,
    },

    #[error("inference failed: {0}")]
    Inference(#[from] ort::Error),

    #[error("tensor layout error: {0}")]
    TensorLayout(#[from] ndarray::ShapeError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
