//! Synthetic camera (`stub://`).
//!
//! Renders a dark gradient background with sensor noise and a yellow block
//! sweeping left to right, so the pipeline can run without hardware.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::normalize::{normalize_to_rgba, PixelFormat};
use super::{CameraConfig, CameraStats};
use crate::frame::Frame;

const BLOCK_COLOR: [u8; 3] = [235, 210, 40];

pub(super) struct SyntheticSource {
    config: CameraConfig,
    frame_count: u64,
    rng: StdRng,
}

impl SyntheticSource {
    pub(super) fn new(config: CameraConfig) -> Self {
        let seed = seed_from_device(&config.device);
        Self {
            config,
            frame_count: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub(super) fn connect(&mut self) -> Result<()> {
        log::info!(
            "CameraSource: connected to {} (synthetic {}x{})",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    pub(super) fn next_frame(&mut self) -> Result<Frame> {
        let sequence = self.frame_count;
        self.frame_count += 1;
        let pixels = self.render(sequence);
        let color = normalize_to_rgba(
            &pixels,
            self.config.width,
            self.config.height,
            PixelFormat::Rgb24,
        )?;
        Ok(Frame::from_rgba(color, sequence))
    }

    fn render(&mut self, sequence: u64) -> Vec<u8> {
        let w = self.config.width as usize;
        let h = self.config.height as usize;
        let mut pixels = vec![0u8; w * h * 3];

        let block_w = (w / 4).max(1);
        let block_h = (h / 3).max(1);
        let travel = w.saturating_sub(block_w).max(1);
        let block_x = (sequence as usize * 8) % travel;
        let block_y = h.saturating_sub(block_h) / 2;

        for y in 0..h {
            for x in 0..w {
                let offset = (y * w + x) * 3;
                let inside = x >= block_x && x < block_x + block_w && y >= block_y && y < block_y + block_h;
                if inside {
                    pixels[offset..offset + 3].copy_from_slice(&BLOCK_COLOR);
                } else {
                    let base = ((x + y) * 64 / (w + h).max(1)) as u8;
                    let noise: u8 = self.rng.gen_range(0..8);
                    let value = base.saturating_add(noise);
                    pixels[offset..offset + 3].copy_from_slice(&[value, value, value]);
                }
            }
        }
        pixels
    }

    pub(super) fn is_healthy(&self) -> bool {
        true
    }

    pub(super) fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

/// `stub://name?seed=N` selects a fixed seed; otherwise the name is hashed.
fn seed_from_device(device: &str) -> u64 {
    if let Some((_, query)) = device.split_once("?seed=") {
        if let Ok(seed) = query.parse() {
            return seed;
        }
    }
    device
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| (acc ^ b as u64).wrapping_mul(0x100_0000_01b3))
}
