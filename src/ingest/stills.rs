//! Still-image directory source.
//!
//! Replays the PNG/JPEG files of a local directory in name order, looping
//! when the end is reached. Useful for bench runs against recorded scenes.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::{CameraConfig, CameraStats};
use crate::frame::Frame;

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub(super) struct StillsSource {
    config: CameraConfig,
    files: Vec<PathBuf>,
    cursor: usize,
    frame_count: u64,
    last_error: Option<String>,
}

impl StillsSource {
    pub(super) fn new(config: CameraConfig) -> Self {
        Self {
            config,
            files: Vec::new(),
            cursor: 0,
            frame_count: 0,
            last_error: None,
        }
    }

    pub(super) fn connect(&mut self) -> Result<()> {
        let dir = Path::new(&self.config.device);
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("read stills directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            return Err(anyhow!("no PNG/JPEG images in {}", dir.display()));
        }
        log::info!(
            "CameraSource: connected to {} ({} stills)",
            dir.display(),
            files.len()
        );
        self.files = files;
        self.cursor = 0;
        self.last_error = None;
        Ok(())
    }

    pub(super) fn next_frame(&mut self) -> Result<Frame> {
        if self.files.is_empty() {
            return Err(anyhow!("stills source not connected"));
        }
        let path = &self.files[self.cursor];
        self.cursor = (self.cursor + 1) % self.files.len();

        let decoded = image::open(path)
            .with_context(|| format!("decode still {}", path.display()))
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                err
            })?;
        let sequence = self.frame_count;
        self.frame_count += 1;
        self.last_error = None;
        Ok(Frame::from_rgba(decoded.to_rgba8(), sequence))
    }

    pub(super) fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    pub(super) fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
