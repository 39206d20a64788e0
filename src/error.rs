//! Failure kinds the pipeline recovers from locally.
//!
//! Neither kind is ever propagated out of the pipeline: a load failure leaves
//! the detector slot absent, an unselected method skips detection for the
//! frame. Both are logged.

use std::path::PathBuf;

use thiserror::Error;

use crate::detect::DetectorKind;

/// Materializing or decoding the classifier resource failed.
#[derive(Debug, Error)]
pub enum ResourceLoadFailure {
    #[error("classifier resource '{name}' not found in bundle {bundle}")]
    Missing { name: String, bundle: PathBuf },

    #[error("failed to materialize classifier resource '{name}': {reason}")]
    Io { name: String, reason: String },

    #[error("classifier resource '{name}' digest mismatch (expected {expected}, got {actual})")]
    DigestMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("failed to decode classifier at {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("classifier at {} is empty", path.display())]
    Empty { path: PathBuf },

    #[error("detector backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// The configured detection method has no installed detector slot.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("detection method {0} is not selected")]
pub struct NoDetectorSelected(pub DetectorKind);
