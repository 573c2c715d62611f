//! Grayscale image buffer shared across callback records.
//!
//! Pixel data lives behind an `Arc` so that a best-shot crop and the
//! visual records of the same frame can reference the frame buffer
//! without copying it once per record.

use std::sync::Arc;

use thiserror::Error;

use crate::types::Rect;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("buffer too short: expected {expected} bytes for {width}x{height}, got {actual}")]
    BufferTooShort {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("empty crop region")]
    EmptyCrop,
}

/// 8-bit grayscale image. Cloning is cheap; the pixel buffer is shared.
#[derive(Clone)]
pub struct Image {
    data: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl Image {
    /// Wrap a grayscale buffer. Fails fast when the buffer does not hold
    /// `width * height` bytes.
    pub fn from_gray(data: Vec<u8>, width: u32, height: u32) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize;
        if data.len() < expected {
            return Err(ImageError::BufferTooShort {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data: Arc::from(data),
            width,
            height,
        })
    }

    /// Solid-gray image, mostly useful in tests and simulations.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            data: Arc::from(vec![value; width as usize * height as usize]),
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Average pixel intensity in [0, 255].
    pub fn avg_brightness(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.data.iter().map(|&p| p as u64).sum();
        sum as f32 / self.data.len() as f32
    }

    /// Whether the mean intensity falls below `threshold`, in [0, 255].
    /// Dark frames are poor input for quality estimation.
    pub fn is_dark(&self, threshold: f32) -> bool {
        self.avg_brightness() < threshold
    }

    /// Copy out the pixels under `rect`, clamped to the image bounds.
    pub fn crop(&self, rect: &Rect) -> Result<Image, ImageError> {
        let clamped = rect
            .clamp_to(self.width, self.height)
            .ok_or(ImageError::EmptyCrop)?;

        let x0 = clamped.x as u32;
        let y0 = clamped.y as u32;
        let w = (clamped.width as u32).max(1);
        let h = (clamped.height as u32).max(1);

        let mut out = Vec::with_capacity(w as usize * h as usize);
        for row in y0..y0 + h {
            let start = (row * self.width + x0) as usize;
            out.extend_from_slice(&self.data[start..start + w as usize]);
        }

        Ok(Image {
            data: Arc::from(out),
            width: w,
            height: h,
        })
    }

    /// Whether two images share the same underlying pixel buffer.
    pub fn shares_buffer(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}
