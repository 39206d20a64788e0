//! Classifier resource loading.
//!
//! The bundled classifier is copied into a private temporary directory, the
//! detector backend decodes it from that path, and the directory is removed
//! once the detector holds its own state. Any failure leaves the detector
//! slot absent; live view proceeds regardless.

mod loader;
mod resource;

pub use loader::{ClassifierLoader, LoadedClassifier, PendingClassifier};
pub use resource::{DirBundle, MemoryBundle, ResourceBundle};

/// Default resource name of the bundled banana classifier.
pub const DEFAULT_RESOURCE: &str = "banana_classifier.xml";
