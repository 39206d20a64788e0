//! Camera frame sources.
//!
//! `CameraSource` picks a backend from the device string:
//! - `stub://name[?seed=N]`: synthetic scene (testing, dry runs)
//! - a local directory: PNG/JPEG stills replayed in name order
//! - `/dev/video*`: V4L2 capture (feature: ingest-v4l2)
//!
//! Every backend yields `Frame`s whose grayscale buffer is derived from the
//! color buffer, so both always share dimensions.

mod normalize;
mod stills;
mod synthetic;
#[cfg(feature = "ingest-v4l2")]
mod v4l2;

use std::path::Path;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraConfig {
    /// Device string (see module docs).
    pub device: String,
    /// Frames per second the pipeline paces delivery to.
    pub target_fps: u32,
    /// Preferred frame width (synthetic and V4L2 only).
    pub width: u32,
    /// Preferred frame height (synthetic and V4L2 only).
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "stub://camera".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(synthetic::SyntheticSource),
    Stills(stills::StillsSource),
    #[cfg(feature = "ingest-v4l2")]
    V4l2(v4l2::V4l2Source),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        let device = config.device.trim();
        if device.is_empty() {
            return Err(anyhow!("camera device must not be empty"));
        }
        if device.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(synthetic::SyntheticSource::new(config)),
            });
        }
        if device.contains("://") {
            return Err(anyhow!(
                "camera device '{}' uses an unsupported scheme; only local devices are supported",
                device
            ));
        }
        if Path::new(device).is_dir() {
            return Ok(Self {
                backend: CameraBackend::Stills(stills::StillsSource::new(config)),
            });
        }
        if device.starts_with("/dev/video") {
            #[cfg(feature = "ingest-v4l2")]
            {
                return Ok(Self {
                    backend: CameraBackend::V4l2(v4l2::V4l2Source::new(config)),
                });
            }
            #[cfg(not(feature = "ingest-v4l2"))]
            {
                return Err(anyhow!("v4l2 capture requires the ingest-v4l2 feature"));
            }
        }
        Err(anyhow!("camera device '{}' not found", device))
    }

    /// Connect to the camera.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            CameraBackend::Stills(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::V4l2(source) => source.connect(),
        }
    }

    /// Capture the next frame.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            CameraBackend::Stills(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::V4l2(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
            CameraBackend::Stills(source) => source.is_healthy(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::V4l2(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            CameraBackend::Stills(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::V4l2(source) => source.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(device: &str) -> CameraConfig {
        CameraConfig {
            device: device.to_string(),
            ..CameraConfig::default()
        }
    }

    #[test]
    fn stub_device_produces_frames() -> Result<()> {
        let mut source = CameraSource::new(config("stub://front"))?;
        source.connect()?;
        let frame = source.next_frame()?;
        assert_eq!((frame.width(), frame.height()), (640, 480));
        assert!(source.is_healthy());
        assert_eq!(source.stats().frames_captured, 1);
        assert_eq!(source.stats().device, "stub://front");
        Ok(())
    }

    #[test]
    fn rejects_remote_and_unknown_devices() {
        assert!(CameraSource::new(config("rtsp://camera-1")).is_err());
        assert!(CameraSource::new(config("")).is_err());
        assert!(CameraSource::new(config("/no/such/dir")).is_err());
    }

    #[test]
    fn directory_selects_stills() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = CameraSource::new(config(&dir.path().display().to_string()))?;
        assert!(matches!(source.backend, CameraBackend::Stills(_)));
        Ok(())
    }
}
