use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use sha2::{Digest, Sha256};

use crate::detect::{ClassifierFactory, DetectorKind, DetectorSlot, ObjectDetector};
use crate::error::ResourceLoadFailure;

use super::resource::ResourceBundle;

const COPY_CHUNK: usize = 4096;
const CASCADE_DIR_PREFIX: &str = "cascade";

/// Outcome of a classifier load.
#[derive(Debug)]
pub struct LoadedClassifier {
    pub kind: DetectorKind,
    pub slot: DetectorSlot,
    /// SHA-256 of the materialized resource, when it was copied successfully.
    pub digest: Option<String>,
}

/// Materializes a bundled classifier resource and decodes it into a detector.
pub struct ClassifierLoader {
    bundle: Box<dyn ResourceBundle>,
    factory: Box<dyn ClassifierFactory>,
    resource: String,
    expected_sha256: Option<String>,
    cache_root: Option<PathBuf>,
}

impl ClassifierLoader {
    pub fn new(
        bundle: Box<dyn ResourceBundle>,
        factory: Box<dyn ClassifierFactory>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            bundle,
            factory,
            resource: resource.into(),
            expected_sha256: None,
            cache_root: None,
        }
    }

    /// Reject resources whose SHA-256 (hex) differs.
    pub fn with_expected_sha256(mut self, digest: impl Into<String>) -> Self {
        self.expected_sha256 = Some(digest.into().to_ascii_lowercase());
        self
    }

    /// Directory the private cascade directory is created under.
    /// Defaults to the system temp directory.
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    /// Load the classifier. Never fails: failures yield an absent slot and
    /// are logged once here.
    pub fn load(&self) -> LoadedClassifier {
        let kind = self.factory.kind();
        match self.try_load() {
            Ok((detector, digest, path)) => {
                log::info!(
                    "ClassifierLoader: loaded {} classifier from {} (sha256 {})",
                    self.factory.name(),
                    path.display(),
                    digest
                );
                LoadedClassifier {
                    kind,
                    slot: DetectorSlot::Ready(detector),
                    digest: Some(digest),
                }
            }
            Err((failure, digest)) => {
                log::error!("ClassifierLoader: failed to load cascade classifier: {}", failure);
                LoadedClassifier {
                    kind,
                    slot: DetectorSlot::Absent(failure),
                    digest,
                }
            }
        }
    }

    /// Run `load` on a background thread.
    pub fn spawn(self) -> PendingClassifier {
        let kind = self.factory.kind();
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("classifier-loader".to_string())
            .spawn(move || {
                let _ = tx.send(self.load());
            });
        if let Err(err) = spawned {
            log::error!("ClassifierLoader: failed to start loader thread: {}", err);
        }
        PendingClassifier { kind, rx }
    }

    fn try_load(
        &self,
    ) -> Result<(Box<dyn ObjectDetector>, String, PathBuf), (ResourceLoadFailure, Option<String>)>
    {
        let mut reader = self.bundle.open(&self.resource).map_err(|f| (f, None))?;

        let cascade_dir = self.create_cascade_dir().map_err(|f| (f, None))?;
        let path = cascade_dir.path().join(&self.resource);
        let digest = copy_with_digest(&mut reader, &path)
            .map_err(|reason| (self.io_failure(reason), None))?;

        if let Some(expected) = &self.expected_sha256 {
            if *expected != digest {
                return Err((
                    ResourceLoadFailure::DigestMismatch {
                        name: self.resource.clone(),
                        expected: expected.clone(),
                        actual: digest.clone(),
                    },
                    Some(digest),
                ));
            }
        }

        let detector = self.factory.from_path(&path).map_err(|err| {
            (
                ResourceLoadFailure::Decode {
                    path: path.clone(),
                    reason: format!("{:#}", err),
                },
                Some(digest.clone()),
            )
        })?;
        if detector.is_empty() {
            return Err((
                ResourceLoadFailure::Empty { path: path.clone() },
                Some(digest),
            ));
        }

        // The decoded detector no longer needs the file.
        if let Err(err) = cascade_dir.close() {
            log::warn!("ClassifierLoader: failed to remove cascade dir: {}", err);
        }
        Ok((detector, digest, path))
    }

    fn create_cascade_dir(&self) -> Result<tempfile::TempDir, ResourceLoadFailure> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(CASCADE_DIR_PREFIX);
        let created = match &self.cache_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        created.map_err(|err| self.io_failure(err.to_string()))
    }

    fn io_failure(&self, reason: String) -> ResourceLoadFailure {
        ResourceLoadFailure::Io {
            name: self.resource.clone(),
            reason,
        }
    }
}

fn copy_with_digest(reader: &mut dyn Read, path: &Path) -> Result<String, String> {
    let mut out = File::create(path).map_err(|e| format!("create {}: {}", path.display(), e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; COPY_CHUNK];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| format!("read resource: {}", e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        out.write_all(&buffer[..read])
            .map_err(|e| format!("write {}: {}", path.display(), e))?;
    }
    out.flush()
        .map_err(|e| format!("flush {}: {}", path.display(), e))?;
    Ok(hex::encode(hasher.finalize()))
}

/// One-shot handle to a classifier load in progress.
///
/// `wait` consumes the handle, so the detector slot transitions exactly once.
pub struct PendingClassifier {
    kind: DetectorKind,
    rx: mpsc::Receiver<LoadedClassifier>,
}

impl PendingClassifier {
    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    /// Block until the load finishes.
    pub fn wait(self) -> LoadedClassifier {
        match self.rx.recv() {
            Ok(loaded) => loaded,
            Err(_) => {
                let failure = ResourceLoadFailure::Io {
                    name: self.kind.to_string(),
                    reason: "loader thread exited without a result".to_string(),
                };
                log::error!("ClassifierLoader: {}", failure);
                LoadedClassifier {
                    kind: self.kind,
                    slot: DetectorSlot::Absent(failure),
                    digest: None,
                }
            }
        }
    }
}
