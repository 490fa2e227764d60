use super::FrameSource;
use crate::error::{MattingError, Result};
use crate::frame::Frame;
use serde::Deserialize;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

/// ffprobe JSON output, reduced to the fields the source needs.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Parse an ffprobe rational like "30000/1001" into frames per second.
fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = match rate.split_once('/') {
        Some((num, den)) => (num.parse::<f64>().ok()?, den.parse::<f64>().ok()?),
        None => (rate.parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

fn probe(path: &Path) -> Result<FfprobeStream> {
    which::which("ffprobe").map_err(|_| MattingError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,nb_frames",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    if !output.status.success() {
        return Err(MattingError::Probe {
            path: path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| MattingError::Probe {
            path: path.to_path_buf(),
            reason: "no video stream".to_string(),
        })
}

/// Video-file source: an ffmpeg child process decoding to a raw bgr24 pipe,
/// read one frame at a time.
pub struct VideoSource {
    path: PathBuf,
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    fps: Option<f64>,
    frame_count: Option<u64>,
    finished: bool,
}

impl VideoSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        which::which("ffmpeg").map_err(|_| MattingError::FfmpegNotFound)?;

        let stream = probe(path)?;
        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(MattingError::Probe {
                    path: path.to_path_buf(),
                    reason: "stream reports no resolution".to_string(),
                })
            }
        };
        let fps = stream.r_frame_rate.as_deref().and_then(parse_rate);
        let frame_count = stream.nb_frames.as_deref().and_then(|n| n.parse().ok());

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "bgr24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MattingError::SourceOpen {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let stdout = child.stdout.take().ok_or_else(|| MattingError::SourceOpen {
            path: path.to_path_buf(),
            reason: "ffmpeg produced no stdout pipe".to_string(),
        })?;

        tracing::info!(
            "Opened video {} ({}x{}, fps={:?}, frames={:?})",
            path.display(),
            width,
            height,
            fps,
            frame_count
        );

        Ok(Self {
            path: path.to_path_buf(),
            child,
            stdout,
            width,
            height,
            fps,
            frame_count,
            finished: false,
        })
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut data = vec![0u8; (self.width as usize) * (self.height as usize) * 3];
        match self.stdout.read_exact(&mut data) {
            Ok(()) => Ok(Some(Frame::new(self.width, self.height, data)?)),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.finished = true;
                let status = self.child.wait()?;
                if !status.success() {
                    tracing::warn!(
                        "ffmpeg decoder for {} exited with {}",
                        self.path.display(),
                        status
                    );
                }
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_parse_as_rationals_or_plain_numbers() {
        assert_eq!(parse_rate("25/1"), Some(25.0));
        assert_eq!(parse_rate("30"), Some(30.0));
        let ntsc = parse_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("garbage"), None);
    }

    #[test]
    fn ffprobe_json_deserializes() {
        let json = r#"{"streams":[{"width":1920,"height":1080,
            "r_frame_rate":"25/1","nb_frames":"100"}]}"#;
        let parsed: FfprobeOutput = serde_json::from_str(json).unwrap();
        let stream = &parsed.streams[0];
        assert_eq!(stream.width, Some(1920));
        assert_eq!(stream.nb_frames.as_deref(), Some("100"));
    }
}
