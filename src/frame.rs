//! Camera frames.
//!
//! A `Frame` pairs a color buffer with a grayscale buffer of the same
//! dimensions. It is owned by one processing call and not retained after it.

use std::time::Instant;

use anyhow::{anyhow, Result};
use image::{GrayImage, RgbaImage};

pub struct Frame {
    color: RgbaImage,
    gray: GrayImage,
    /// Delivery sequence number assigned by the source.
    pub sequence: u64,
    captured_at: Instant,
}

impl Frame {
    /// Build a frame from matching color and grayscale buffers.
    pub fn new(color: RgbaImage, gray: GrayImage, sequence: u64) -> Result<Self> {
        if color.dimensions() != gray.dimensions() {
            return Err(anyhow!(
                "frame buffers differ in size: color {}x{}, gray {}x{}",
                color.width(),
                color.height(),
                gray.width(),
                gray.height()
            ));
        }
        Ok(Self {
            color,
            gray,
            sequence,
            captured_at: Instant::now(),
        })
    }

    /// Build a frame from a color buffer, deriving the grayscale buffer.
    pub fn from_rgba(color: RgbaImage, sequence: u64) -> Self {
        let gray = image::imageops::grayscale(&color);
        Self {
            color,
            gray,
            sequence,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }

    pub fn color(&self) -> &RgbaImage {
        &self.color
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Milliseconds since capture.
    pub fn age_ms(&self) -> u128 {
        self.captured_at.elapsed().as_millis()
    }

    /// Split into the color buffer (to annotate) and the grayscale buffer.
    pub fn into_buffers(self) -> (RgbaImage, GrayImage) {
        (self.color, self.gray)
    }
}
