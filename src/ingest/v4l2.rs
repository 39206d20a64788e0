//! V4L2 camera source.
//!
//! Captures from a local device node (e.g. `/dev/video0`) through memory
//! mapped buffers. The device is asked for RGB3; NV12 is accepted when the
//! driver refuses. Each capture is normalized to RGBA and paired with its
//! grayscale derivation.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::normalize::{normalize_to_rgba, PixelFormat};
use super::{CameraConfig, CameraStats};
use crate::frame::Frame;

const MMAP_BUFFERS: u32 = 4;
const MIN_HEALTH_GRACE_MS: u32 = 2_000;

pub(super) struct V4l2Source {
    config: CameraConfig,
    capture: Option<Capture>,
    negotiated: Negotiated,
    captured: u64,
    last_capture: Option<Instant>,
    fault: Option<String>,
}

#[self_referencing]
struct Capture {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

/// Format the driver settled on.
#[derive(Clone, Copy, Debug)]
struct Negotiated {
    format: PixelFormat,
    width: u32,
    height: u32,
}

fn negotiate(device: &mut v4l::Device, config: &CameraConfig) -> Result<Negotiated> {
    use v4l::video::Capture as _;

    let mut wanted = device.format().context("read v4l2 format")?;
    wanted.width = config.width;
    wanted.height = config.height;
    wanted.fourcc = v4l::FourCC::new(b"RGB3");

    let actual = device.set_format(&wanted).or_else(|err| {
        log::warn!("CameraSource: {} rejected RGB3 {}x{}: {}", config.device, config.width, config.height, err);
        device.format().context("read v4l2 format after set failure")
    })?;

    let format = match &actual.fourcc.repr {
        b"RGB3" => PixelFormat::Rgb24,
        b"NV12" => PixelFormat::Nv12,
        other => {
            return Err(anyhow!(
                "unsupported v4l2 pixel format {}",
                String::from_utf8_lossy(other)
            ))
        }
    };

    if config.target_fps > 0 {
        let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
        if let Err(err) = device.set_params(&params) {
            log::warn!("CameraSource: {} ignored fps {}: {}", config.device, config.target_fps, err);
        }
    }

    Ok(Negotiated {
        format,
        width: actual.width,
        height: actual.height,
    })
}

impl V4l2Source {
    pub(super) fn new(config: CameraConfig) -> Self {
        let negotiated = Negotiated {
            format: PixelFormat::Rgb24,
            width: config.width,
            height: config.height,
        };
        Self {
            config,
            capture: None,
            negotiated,
            captured: 0,
            last_capture: None,
            fault: None,
        }
    }

    /// Remember the failure for health reporting, then pass it on.
    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.fault = Some(format!("{:#}", err));
        }
        result
    }

    pub(super) fn connect(&mut self) -> Result<()> {
        let opened = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device));
        let mut device = self.record(opened)?;
        let negotiated = negotiate(&mut device, &self.config);
        self.negotiated = self.record(negotiated)?;

        let capture = CaptureTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(
                    device,
                    v4l::buffer::Type::VideoCapture,
                    MMAP_BUFFERS,
                )
                .context("create v4l2 buffer stream")
            },
        }
        .try_build();
        self.capture = Some(self.record(capture)?);
        self.fault = None;

        log::info!(
            "CameraSource: connected to {} ({}x{} {:?})",
            self.config.device,
            self.negotiated.width,
            self.negotiated.height,
            self.negotiated.format
        );
        Ok(())
    }

    pub(super) fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let Negotiated {
            format,
            width,
            height,
        } = self.negotiated;
        let captured = match self.capture.as_mut() {
            None => Err(anyhow!("v4l2 device {} not connected", self.config.device)),
            Some(capture) => capture.with_mut(|fields| {
                let (buf, meta) = fields.stream.next().context("capture v4l2 frame")?;
                let used = (meta.bytesused as usize).min(buf.len());
                let bytes = if used == 0 { buf } else { &buf[..used] };
                normalize_to_rgba(bytes, width, height, format)
            }),
        };
        let color = self.record(captured)?;

        let sequence = self.captured;
        self.captured += 1;
        self.last_capture = Some(Instant::now());
        Ok(Frame::from_rgba(color, sequence))
    }

    pub(super) fn is_healthy(&self) -> bool {
        if self.fault.is_some() {
            return false;
        }
        self.last_capture
            .map_or(true, |at| at.elapsed() <= self.health_grace())
    }

    pub(super) fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.captured,
            device: self.config.device.clone(),
        }
    }

    /// Six frame intervals, never less than two seconds.
    fn health_grace(&self) -> Duration {
        let six_frames_ms = match self.config.target_fps {
            0 => 0,
            fps => (1000 / fps).saturating_mul(6),
        };
        Duration::from_millis(six_frames_ms.max(MIN_HEALTH_GRACE_MS) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(device: &str, target_fps: u32) -> V4l2Source {
        V4l2Source::new(CameraConfig {
            device: device.to_string(),
            target_fps,
            ..CameraConfig::default()
        })
    }

    #[test]
    fn health_grace_has_floor() {
        let source = source("/dev/video0", 30);
        assert_eq!(source.health_grace(), Duration::from_millis(2_000));
        assert!(source.is_healthy());
    }

    #[test]
    fn slow_cameras_get_longer_grace() {
        assert_eq!(source("/dev/video0", 1).health_grace(), Duration::from_millis(6_000));
    }

    #[test]
    fn capture_requires_connect() {
        let mut source = source("/dev/video-missing", 10);
        assert!(source.next_frame().is_err());
        assert!(!source.is_healthy());
    }
}
