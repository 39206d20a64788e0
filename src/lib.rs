//! Fruit Detect
//!
//! Live fruit detection over camera frames with a cascade classifier.
//!
//! # Architecture
//!
//! 1. **Resource loading**: the packaged classifier is materialized into a
//!    scratch directory, decoded, and the scratch copy removed. Failure leaves
//!    the detector slot absent; frames still flow, unannotated.
//! 2. **Frame processing**: each frame's grayscale buffer is scanned with a
//!    minimum object size derived from the frame height; hits are drawn on
//!    the color buffer as green boxes with `banana{i}` labels.
//! 3. **Size policy**: the minimum size is a fraction of the frame height,
//!    selectable from four presets (50/40/30/20%) at any time.
//!
//! # Module Structure
//!
//! - `classifier`: resource bundles and the background classifier loader
//! - `detect`: detector traits, backends, per-method slot registry
//! - `size_policy`: relative and absolute minimum-size state
//! - `frame`, `ingest`: paired color/grayscale frames and camera sources
//! - `annotate`, `sink`: overlay drawing and frame output
//! - `pipeline`, `control`: session state, processing loop, operator menu

pub mod annotate;
pub mod classifier;
pub mod config;
pub mod control;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod sink;
pub mod size_policy;
pub mod ui;

pub use annotate::{annotate, AnnotationStyle, Label, Overlay};
pub use classifier::{
    ClassifierLoader, DirBundle, LoadedClassifier, MemoryBundle, PendingClassifier,
    ResourceBundle,
};
pub use config::FruitDetectConfig;
pub use control::MenuCommand;
pub use detect::{
    ClassifierFactory, DetectorKind, DetectorRegistry, DetectorSlot, Detections,
    MultiScaleParams, ObjectDetector, Rect,
};
pub use error::{NoDetectorSelected, ResourceLoadFailure};
pub use frame::Frame;
pub use ingest::{CameraConfig, CameraSource};
pub use pipeline::{AnnotatedFrame, FrameProcessor, Pipeline, RunSummary, Session};
pub use sink::{FrameSink, SinkConfig};
pub use size_policy::{SizePolicy, SizePreset};
