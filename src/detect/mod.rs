mod backend;
pub mod backends;
mod registry;
mod result;

pub use backend::{
    BackendChoice, ClassifierFactory, DetectorKind, MultiScaleParams, ObjectDetector,
    MIN_NEIGHBORS, SCALE_FACTOR,
};
pub use backends::{ScriptedDetector, ScriptedFactory};
pub use registry::{DetectorRegistry, DetectorSlot, Resolved};
pub use result::{Detections, Rect};
