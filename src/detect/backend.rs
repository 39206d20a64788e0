use std::fmt;
use std::path::Path;

use anyhow::{anyhow, Result};
use image::GrayImage;
use serde::Deserialize;

use crate::detect::result::Detections;

/// Scale step between pyramid levels.
pub const SCALE_FACTOR: f64 = 1.1;

/// Overlapping hits required before a candidate is reported.
pub const MIN_NEIGHBORS: u32 = 2;

/// Detection method selector.
///
/// Only the cascade method exists today. The enum is the extension point for
/// alternative detector implementations; the registry keys handle slots by it.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    #[default]
    Cascade,
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::Cascade => f.write_str("cascade"),
        }
    }
}

/// Parameters of one multi-scale detection call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MultiScaleParams {
    pub scale_factor: f64,
    pub min_neighbors: u32,
    pub flags: i32,
    /// `None` leaves the backend's own minimum in place.
    pub min_size: Option<(u32, u32)>,
    /// `None` means no upper bound.
    pub max_size: Option<(u32, u32)>,
}

impl MultiScaleParams {
    /// Square minimum object size, or unconstrained when `min_pixels` is 0.
    pub fn with_min_pixels(min_pixels: u32) -> Self {
        Self {
            scale_factor: SCALE_FACTOR,
            min_neighbors: MIN_NEIGHBORS,
            flags: 0,
            min_size: (min_pixels > 0).then_some((min_pixels, min_pixels)),
            max_size: None,
        }
    }
}

impl Default for MultiScaleParams {
    fn default() -> Self {
        Self::with_min_pixels(0)
    }
}

/// Multi-scale object detector backed by a decoded classifier.
///
/// Implementations own all decoded classifier state: once constructed they
/// must not depend on the file they were loaded from.
pub trait ObjectDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// True when the decoded classifier holds no usable stages.
    fn is_empty(&self) -> bool;

    /// Run multi-scale detection over a grayscale frame.
    fn detect_multi_scale(
        &mut self,
        gray: &GrayImage,
        params: &MultiScaleParams,
    ) -> Result<Detections>;
}

/// Constructs detectors from classifier files on disk.
pub trait ClassifierFactory: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Method the produced detectors implement.
    fn kind(&self) -> DetectorKind {
        DetectorKind::Cascade
    }

    /// Decode the classifier at `path`.
    fn from_path(&self, path: &Path) -> Result<Box<dyn ObjectDetector>>;
}

/// Backend name as configured (`classifier.backend`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    #[default]
    Opencv,
    Scripted,
}

impl BackendChoice {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "opencv" => Ok(Self::Opencv),
            "scripted" => Ok(Self::Scripted),
            other => Err(anyhow!("unknown detector backend '{}'", other)),
        }
    }

    /// Factory for this backend.
    ///
    /// The OpenCV backend is only available with the `backend-opencv` feature.
    pub fn factory(self) -> Result<Box<dyn ClassifierFactory>> {
        match self {
            BackendChoice::Scripted => Ok(Box::new(super::backends::ScriptedFactory)),
            #[cfg(feature = "backend-opencv")]
            BackendChoice::Opencv => Ok(Box::new(super::backends::OpencvFactory)),
            #[cfg(not(feature = "backend-opencv"))]
            BackendChoice::Opencv => Err(anyhow!(
                "opencv backend requires the backend-opencv feature"
            )),
        }
    }
}
