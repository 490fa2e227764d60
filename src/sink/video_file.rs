use super::FrameSink;
use crate::error::{MattingError, Result};
use crate::matting::{MattingResult, OutputMode};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

/// Fallback playback rate when the source does not report one, matching
/// common webcam-class material.
pub const DEFAULT_FPS: f64 = 25.0;

fn encoder_args(path: &Path, width: u32, height: u32, fps: f64, mode: OutputMode) -> Vec<String> {
    let pix_fmt = match mode {
        OutputMode::Alpha => "gray",
        OutputMode::Merge => "bgr24",
    };
    let mut args: Vec<String> = [
        "-v", "error", "-y", "-f", "rawvideo", "-pix_fmt", pix_fmt, "-s",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(format!("{width}x{height}"));
    args.push("-r".to_string());
    args.push(format!("{fps}"));
    args.extend(["-i", "-", "-pix_fmt", "yuv420p"].iter().map(|s| s.to_string()));
    args.push(path.display().to_string());
    args
}

/// Encodes results into a video container by piping raw frames to an
/// ffmpeg child process. Frame geometry and output mode are fixed at
/// construction; every delivered result must match.
pub struct VideoFileSink {
    path: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
    width: u32,
    height: u32,
    mode: OutputMode,
}

impl VideoFileSink {
    pub fn new<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        fps: f64,
        mode: OutputMode,
    ) -> Result<Self> {
        let path = path.as_ref();
        which::which("ffmpeg").map_err(|_| MattingError::FfmpegNotFound)?;

        tracing::info!(
            "Encoding {} ({}x{} @ {:.2} fps, mode={})",
            path.display(),
            width,
            height,
            fps,
            mode.as_str()
        );

        let mut child = Command::new("ffmpeg")
            .args(encoder_args(path, width, height, fps, mode))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MattingError::SinkOpen {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let stdin = child.stdin.take().ok_or_else(|| MattingError::SinkOpen {
            path: path.to_path_buf(),
            reason: "ffmpeg produced no stdin pipe".to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            child,
            stdin: Some(stdin),
            width,
            height,
            mode,
        })
    }
}

impl FrameSink for VideoFileSink {
    fn write(&mut self, result: &MattingResult) -> Result<()> {
        if result.resolution() != (self.width, self.height) {
            return Err(MattingError::SinkWrite(format!(
                "result is {:?}, sink expects {}x{}",
                result.resolution(),
                self.width,
                self.height
            )));
        }
        let matches_mode = matches!(
            (result, self.mode),
            (MattingResult::Alpha(_), OutputMode::Alpha)
                | (MattingResult::Merge(_), OutputMode::Merge)
        );
        if !matches_mode {
            return Err(MattingError::SinkWrite(
                "result variant does not match the sink's output mode".to_string(),
            ));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MattingError::SinkWrite("encoder already finished".to_string()))?;
        stdin
            .write_all(result.as_bytes())
            .map_err(|e| MattingError::SinkWrite(format!("{}: {}", self.path.display(), e)))
    }

    fn finish(&mut self) -> Result<()> {
        // Closing stdin lets ffmpeg flush and finalize the container.
        drop(self.stdin.take());
        let status = self.child.wait()?;
        if !status.success() {
            return Err(MattingError::SinkWrite(format!(
                "encoder for {} exited with {}",
                self.path.display(),
                status
            )));
        }
        tracing::info!("Output: {}", self.path.display());
        Ok(())
    }
}

impl Drop for VideoFileSink {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            drop(self.stdin.take());
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_encodes_single_channel_merge_encodes_bgr() {
        let args = encoder_args(Path::new("out.mp4"), 640, 360, 29.97, OutputMode::Alpha);
        assert!(args.contains(&"gray".to_string()));
        assert!(args.contains(&"640x360".to_string()));
        assert!(args.contains(&"29.97".to_string()));

        let args = encoder_args(Path::new("out.mp4"), 640, 360, 25.0, OutputMode::Merge);
        assert!(args.contains(&"bgr24".to_string()));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }
}
