use crate::error::{MattingError, Result};
use image::{imageops, ImageBuffer, Rgb, RgbImage};

/// An owned 8-bit BGR frame, three interleaved channels.
///
/// BGR is the model's wire order, so frames stay in that order end to end
/// and only flip to RGB at the `image`-crate boundary (file load/save,
/// camera decode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != (width as usize) * (height as usize) * 3 {
            return Err(MattingError::FrameSize {
                width,
                height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// All-black frame, used as a placeholder geometry.
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 3],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Convert an RGB image (camera decode, file load) into a BGR frame.
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 3);
        for pixel in image.pixels() {
            data.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Convert back to RGB for the `image` crate.
    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let idx = ((y * self.width + x) * 3) as usize;
            image::Rgb([self.data[idx + 2], self.data[idx + 1], self.data[idx]])
        })
    }

    /// Linear resample to a new resolution. Resampling is channel-order
    /// agnostic, so the BGR data can be viewed as an RGB buffer directly.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if (width, height) == (self.width, self.height) {
            return self.clone();
        }
        let view: ImageBuffer<Rgb<u8>, &[u8]> =
            ImageBuffer::from_raw(self.width, self.height, self.data.as_slice())
                .expect("frame length is validated at construction");
        let resized = imageops::resize(&view, width, height, imageops::FilterType::Triangle);
        Frame {
            width,
            height,
            data: resized.into_raw(),
        }
    }
}
