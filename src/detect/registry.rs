use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, Result};

use crate::error::{NoDetectorSelected, ResourceLoadFailure};

use super::backend::{DetectorKind, ObjectDetector};

/// Outcome of loading the detector for one method.
///
/// A slot transitions once from "not installed" to either `Ready` or
/// `Absent` and stays there for the lifetime of the session.
pub enum DetectorSlot {
    Ready(Box<dyn ObjectDetector>),
    Absent(ResourceLoadFailure),
}

impl DetectorSlot {
    pub fn is_ready(&self) -> bool {
        matches!(self, DetectorSlot::Ready(_))
    }
}

impl fmt::Debug for DetectorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorSlot::Ready(detector) => {
                f.debug_tuple("Ready").field(&detector.name()).finish()
            }
            DetectorSlot::Absent(failure) => f.debug_tuple("Absent").field(failure).finish(),
        }
    }
}

/// What the selected detection method currently resolves to.
pub enum Resolved<'a> {
    Ready(&'a mut dyn ObjectDetector),
    Absent(&'a ResourceLoadFailure),
    Unselected(NoDetectorSelected),
}

/// Detector handle slots keyed by detection method.
pub struct DetectorRegistry {
    slots: HashMap<DetectorKind, DetectorSlot>,
    selected: DetectorKind,
}

impl DetectorRegistry {
    pub fn new(selected: DetectorKind) -> Self {
        Self {
            slots: HashMap::new(),
            selected,
        }
    }

    /// Install the load outcome for a method. Each method is installed once.
    pub fn install(&mut self, kind: DetectorKind, slot: DetectorSlot) -> Result<()> {
        if self.slots.contains_key(&kind) {
            return Err(anyhow!("detector for method {} already installed", kind));
        }
        self.slots.insert(kind, slot);
        Ok(())
    }

    pub fn selected(&self) -> DetectorKind {
        self.selected
    }

    pub fn select(&mut self, kind: DetectorKind) {
        self.selected = kind;
    }

    /// Methods with an installed slot.
    pub fn list(&self) -> Vec<DetectorKind> {
        self.slots.keys().copied().collect()
    }

    pub fn has_ready(&self, kind: DetectorKind) -> bool {
        self.slots.get(&kind).is_some_and(DetectorSlot::is_ready)
    }

    /// Resolve the selected method to its slot.
    pub fn resolve(&mut self) -> Resolved<'_> {
        let selected = self.selected;
        match self.slots.get_mut(&selected) {
            Some(DetectorSlot::Ready(detector)) => Resolved::Ready(detector.as_mut()),
            Some(DetectorSlot::Absent(failure)) => Resolved::Absent(failure),
            None => Resolved::Unselected(NoDetectorSelected(selected)),
        }
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new(DetectorKind::default())
    }
}
