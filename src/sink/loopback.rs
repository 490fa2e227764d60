use super::FrameSink;
use crate::error::{MattingError, Result};
use crate::frame::Frame;
use crate::matting::MattingResult;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Live display sink: a v4l2loopback device, which accepts raw YUYV frames
/// written to the device file. Any application reading the device sees the
/// matting output as a camera feed.
pub struct LoopbackSink {
    path: PathBuf,
    file: File,
    width: u32,
    height: u32,
}

impl LoopbackSink {
    pub fn open<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device {} ({}x{})",
            path.display(),
            width,
            height
        );

        let file = File::options()
            .write(true)
            .open(path)
            .map_err(|e| MattingError::SinkOpen {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            width,
            height,
        })
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pack a BGR frame into YUYV 4:2:2, the format loopback devices
    /// typically expect. U and V are averaged over each horizontal pixel
    /// pair.
    fn bgr_to_yuyv(frame: &Frame) -> Vec<u8> {
        let (width, height) = frame.resolution();
        let data = frame.as_bytes();
        let mut yuyv = Vec::with_capacity((width * height * 2) as usize);

        for row in data.chunks_exact((width * 3) as usize) {
            for pair in row.chunks(6) {
                let first = &pair[0..3];
                let second = if pair.len() == 6 { &pair[3..6] } else { first };

                let (y0, u0, v0) = bgr_to_yuv(first[0], first[1], first[2]);
                let (y1, u1, v1) = bgr_to_yuv(second[0], second[1], second[2]);

                let u = ((u0 as u16 + u1 as u16) / 2) as u8;
                let v = ((v0 as u16 + v1 as u16) / 2) as u8;
                yuyv.extend_from_slice(&[y0, u, y1, v]);
            }
        }
        yuyv
    }
}

fn bgr_to_yuv(b: u8, g: u8, r: u8) -> (u8, u8, u8) {
    let (b, g, r) = (b as f32, g as f32, r as f32);
    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;
    (y, u, v)
}

impl FrameSink for LoopbackSink {
    fn write(&mut self, result: &MattingResult) -> Result<()> {
        // Masks display as a grayscale silhouette by replicating the
        // single channel.
        let frame = match result {
            MattingResult::Merge(frame) => frame.clone(),
            MattingResult::Alpha(mask) => {
                let (w, h) = mask.dimensions();
                let mut data = Vec::with_capacity((w * h * 3) as usize);
                for p in mask.pixels() {
                    data.extend_from_slice(&[p[0], p[0], p[0]]);
                }
                Frame::new(w, h, data)?
            }
        };
        let frame = frame.resized(self.width, self.height);

        self.file
            .write_all(&Self::bgr_to_yuyv(&frame))
            .map_err(|e| MattingError::SinkWrite(format!("{}: {}", self.path.display(), e)))
    }
}
