use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use opencv::core::{Mat, Rect as CvRect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;

use crate::detect::backend::{ClassifierFactory, MultiScaleParams, ObjectDetector};
use crate::detect::result::{Detections, Rect};

/// Haar/LBP cascade classifier evaluated by OpenCV.
pub struct OpencvDetector {
    classifier: CascadeClassifier,
    empty: bool,
}

impl OpencvDetector {
    pub fn load(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("classifier path {} is not UTF-8", path.display()))?;
        let classifier = CascadeClassifier::new(path_str)
            .with_context(|| format!("load cascade classifier {}", path.display()))?;
        let empty = classifier.empty().context("query cascade classifier")?;
        Ok(Self { classifier, empty })
    }
}

fn to_cv_size(size: Option<(u32, u32)>) -> Size {
    match size {
        Some((w, h)) => Size::new(w as i32, h as i32),
        None => Size::new(0, 0),
    }
}

fn gray_to_mat(gray: &GrayImage) -> Result<Mat> {
    let flat = Mat::from_slice(gray.as_raw()).context("wrap grayscale frame")?;
    let mat = flat
        .reshape(1, gray.height() as i32)
        .context("reshape grayscale frame")?
        .try_clone()
        .context("copy grayscale frame")?;
    Ok(mat)
}

impl ObjectDetector for OpencvDetector {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn is_empty(&self) -> bool {
        self.empty
    }

    fn detect_multi_scale(
        &mut self,
        gray: &GrayImage,
        params: &MultiScaleParams,
    ) -> Result<Detections> {
        if gray.width() == 0 || gray.height() == 0 {
            return Ok(Detections::empty());
        }
        let mat = gray_to_mat(gray)?;
        let mut objects = Vector::<CvRect>::new();
        self.classifier
            .detect_multi_scale(
                &mat,
                &mut objects,
                params.scale_factor,
                params.min_neighbors as i32,
                params.flags,
                to_cv_size(params.min_size),
                to_cv_size(params.max_size),
            )
            .context("cascade detect_multi_scale")?;

        let rects = objects
            .iter()
            .map(|r| Rect::new(r.x, r.y, r.width.max(0) as u32, r.height.max(0) as u32))
            .collect::<Vec<_>>();
        Ok(Detections::from(rects))
    }
}

/// Builds [`OpencvDetector`]s from cascade XML files.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpencvFactory;

impl ClassifierFactory for OpencvFactory {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn from_path(&self, path: &Path) -> Result<Box<dyn ObjectDetector>> {
        Ok(Box::new(OpencvDetector::load(path)?))
    }
}
