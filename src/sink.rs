//! Display side of the pipeline.
//!
//! Annotated frames are either discarded or written as PNG files into an
//! output directory. An optional JSON Lines report records what was drawn
//! on each frame.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::pipeline::AnnotatedFrame;

/// Configuration for a frame sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Directory annotated frames are written to; `None` discards them.
    pub dir: Option<PathBuf>,
    /// Write every n-th frame.
    pub every_n: u32,
    /// JSON Lines detection report.
    pub report: Option<PathBuf>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            dir: None,
            every_n: 1,
            report: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportDetection<'a> {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    label: &'a str,
}

#[derive(Debug, Serialize)]
struct FrameReport<'a> {
    sequence: u64,
    width: u32,
    height: u32,
    min_size_px: u32,
    detections: Vec<ReportDetection<'a>>,
}

pub struct FrameSink {
    config: SinkConfig,
    report: Option<BufWriter<File>>,
    frames_seen: u64,
    frames_written: u64,
}

impl FrameSink {
    pub fn new(config: SinkConfig) -> Result<Self> {
        if config.every_n == 0 {
            return Err(anyhow!("output.every_n must be at least 1"));
        }
        if let Some(dir) = &config.dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create output directory {}", dir.display()))?;
        }
        let report = match &config.report {
            Some(path) => Some(open_report(path)?),
            None => None,
        };
        Ok(Self {
            config,
            report,
            frames_seen: 0,
            frames_written: 0,
        })
    }

    /// Sink that drops every frame.
    pub fn discard() -> Self {
        Self {
            config: SinkConfig::default(),
            report: None,
            frames_seen: 0,
            frames_written: 0,
        }
    }

    /// Present one annotated frame.
    pub fn present(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        self.frames_seen += 1;

        if let Some(report) = self.report.as_mut() {
            let line = FrameReport {
                sequence: frame.sequence,
                width: frame.image.width(),
                height: frame.image.height(),
                min_size_px: frame.min_size_px,
                detections: frame
                    .overlay
                    .boxes
                    .iter()
                    .zip(&frame.overlay.labels)
                    .map(|(rect, label)| ReportDetection {
                        x: rect.x,
                        y: rect.y,
                        width: rect.width,
                        height: rect.height,
                        label: &label.text,
                    })
                    .collect(),
            };
            serde_json::to_writer(&mut *report, &line).context("write detection report")?;
            report.write_all(b"\n").context("write detection report")?;
        }

        if let Some(dir) = &self.config.dir {
            if (self.frames_seen - 1) % self.config.every_n as u64 == 0 {
                let path = dir.join(format!("frame_{:06}.png", frame.sequence));
                frame
                    .image
                    .save(&path)
                    .with_context(|| format!("write frame {}", path.display()))?;
                self.frames_written += 1;
            }
        }
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush buffered report lines.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(report) = self.report.as_mut() {
            report.flush().context("flush detection report")?;
        }
        Ok(())
    }
}

impl Drop for FrameSink {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            log::warn!("FrameSink: {:#}", err);
        }
    }
}

fn open_report(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open detection report {}", path.display()))?;
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::{Label, Overlay};
    use crate::detect::Rect;
    use image::RgbaImage;

    fn annotated(sequence: u64, boxes: usize) -> AnnotatedFrame {
        let mut overlay = Overlay::default();
        for i in 0..boxes {
            overlay.boxes.push(Rect::new(i as i32, 0, 2, 2));
            overlay.labels.push(Label {
                text: format!("banana{}", i),
                origin: (i as i32, 0),
            });
        }
        AnnotatedFrame {
            sequence,
            image: RgbaImage::new(8, 6),
            overlay,
            min_size_px: 3,
        }
    }

    #[test]
    fn writes_every_nth_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut sink = FrameSink::new(SinkConfig {
            dir: Some(dir.path().to_path_buf()),
            every_n: 2,
            report: None,
        })?;
        for seq in 0..5 {
            sink.present(&annotated(seq, 0))?;
        }
        assert_eq!(sink.frames_written(), 3);
        assert!(dir.path().join("frame_000000.png").exists());
        assert!(!dir.path().join("frame_000001.png").exists());
        assert!(dir.path().join("frame_000004.png").exists());
        Ok(())
    }

    #[test]
    fn report_lists_labels() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let report = dir.path().join("detections.jsonl");
        {
            let mut sink = FrameSink::new(SinkConfig {
                dir: None,
                every_n: 1,
                report: Some(report.clone()),
            })?;
            sink.present(&annotated(0, 2))?;
            sink.present(&annotated(1, 0))?;
        }
        let raw = std::fs::read_to_string(&report)?;
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["detections"][1]["label"], "banana1");
        assert_eq!(lines[0]["min_size_px"], 3);
        assert_eq!(lines[1]["detections"].as_array().map(Vec::len), Some(0));
        Ok(())
    }

    #[test]
    fn rejects_zero_stride() {
        let config = SinkConfig {
            every_n: 0,
            ..SinkConfig::default()
        };
        assert!(FrameSink::new(config).is_err());
    }
}
