//! Scripted detector backend.
//!
//! Decodes a plain-text classifier script and reports the same rectangles on
//! every frame, filtered by the size bounds of the call. Used for dry runs
//! without a vision library and for tests.
//!
//! Script format:
//!
//! ```text
//! scripted-cascade v1
//! # x y width height
//! 120 80 200 140
//! 10,10,32,32
//! ```

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::GrayImage;

use crate::detect::backend::{ClassifierFactory, MultiScaleParams, ObjectDetector};
use crate::detect::result::{Detections, Rect};

const HEADER: &str = "scripted-cascade v1";

/// Detector that replays a fixed list of rectangles.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDetector {
    rects: Vec<Rect>,
    calls: u64,
    last_params: Option<MultiScaleParams>,
}

impl ScriptedDetector {
    pub fn new(rects: Vec<Rect>) -> Self {
        Self {
            rects,
            calls: 0,
            last_params: None,
        }
    }

    /// Parse a classifier script.
    pub fn parse(script: &str) -> Result<Self> {
        let mut lines = script
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));
        match lines.next() {
            Some(HEADER) => {}
            Some(other) => return Err(anyhow!("unexpected script header '{}'", other)),
            None => return Err(anyhow!("missing script header")),
        }

        let mut rects = Vec::new();
        for line in lines {
            rects.push(parse_rect(line)?);
        }
        Ok(Self::new(rects))
    }

    /// Number of detection calls served.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Parameters of the most recent call.
    pub fn last_params(&self) -> Option<MultiScaleParams> {
        self.last_params
    }
}

fn parse_rect(line: &str) -> Result<Rect> {
    let fields: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|field| !field.is_empty())
        .collect();
    if fields.len() != 4 {
        return Err(anyhow!("expected 'x y width height', got '{}'", line));
    }
    let x: i32 = fields[0]
        .parse()
        .with_context(|| format!("invalid x in '{}'", line))?;
    let y: i32 = fields[1]
        .parse()
        .with_context(|| format!("invalid y in '{}'", line))?;
    let width: u32 = fields[2]
        .parse()
        .with_context(|| format!("invalid width in '{}'", line))?;
    let height: u32 = fields[3]
        .parse()
        .with_context(|| format!("invalid height in '{}'", line))?;
    Ok(Rect::new(x, y, width, height))
}

impl ObjectDetector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    fn detect_multi_scale(
        &mut self,
        _gray: &GrayImage,
        params: &MultiScaleParams,
    ) -> Result<Detections> {
        self.calls += 1;
        self.last_params = Some(*params);

        let rects = self
            .rects
            .iter()
            .filter(|rect| match params.min_size {
                Some((w, h)) => rect.width >= w && rect.height >= h,
                None => true,
            })
            .filter(|rect| match params.max_size {
                Some((w, h)) => rect.width <= w && rect.height <= h,
                None => true,
            })
            .copied()
            .collect::<Vec<_>>();
        Ok(Detections::from(rects))
    }
}

/// Builds [`ScriptedDetector`]s from script files.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptedFactory;

impl ClassifierFactory for ScriptedFactory {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn from_path(&self, path: &Path) -> Result<Box<dyn ObjectDetector>> {
        let script = std::fs::read_to_string(path)
            .with_context(|| format!("read classifier script {}", path.display()))?;
        Ok(Box::new(ScriptedDetector::parse(&script)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rects_in_order() -> Result<()> {
        let detector = ScriptedDetector::parse(
            "scripted-cascade v1\n# comment\n120 80 200 140\n10,10,32,32\n",
        )?;
        assert!(!detector.is_empty());
        assert_eq!(
            detector.rects,
            vec![Rect::new(120, 80, 200, 140), Rect::new(10, 10, 32, 32)]
        );
        Ok(())
    }

    #[test]
    fn header_only_script_is_empty() -> Result<()> {
        let detector = ScriptedDetector::parse(HEADER)?;
        assert!(detector.is_empty());
        Ok(())
    }

    #[test]
    fn rejects_foreign_content() {
        assert!(ScriptedDetector::parse("").is_err());
        assert!(ScriptedDetector::parse("<?xml version=\"1.0\"?>").is_err());
        assert!(ScriptedDetector::parse("scripted-cascade v1\n1 2 3").is_err());
        assert!(ScriptedDetector::parse("scripted-cascade v1\n1 2 -3 4").is_err());
    }

    #[test]
    fn min_size_filters_small_rects() -> Result<()> {
        let mut detector = ScriptedDetector::new(vec![
            Rect::new(0, 0, 300, 300),
            Rect::new(5, 5, 40, 40),
        ]);
        let gray = GrayImage::new(8, 8);

        let all = detector.detect_multi_scale(&gray, &MultiScaleParams::with_min_pixels(0))?;
        assert_eq!(all.len(), 2);

        let large = detector.detect_multi_scale(&gray, &MultiScaleParams::with_min_pixels(96))?;
        assert_eq!(large.rects, vec![Rect::new(0, 0, 300, 300)]);
        assert_eq!(detector.calls(), 2);
        assert_eq!(
            detector.last_params().and_then(|p| p.min_size),
            Some((96, 96))
        );
        Ok(())
    }
}
