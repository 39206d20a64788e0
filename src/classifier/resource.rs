use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::error::ResourceLoadFailure;

/// Read-only collection of named assets shipped with the application.
pub trait ResourceBundle: Send {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Open a resource as a byte stream.
    fn open(&self, name: &str) -> Result<Box<dyn Read + Send>, ResourceLoadFailure>;
}

/// Bundle backed by a directory on disk (e.g. `res/raw`).
#[derive(Clone, Debug)]
pub struct DirBundle {
    root: PathBuf,
}

impl DirBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceBundle for DirBundle {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn open(&self, name: &str) -> Result<Box<dyn Read + Send>, ResourceLoadFailure> {
        check_resource_name(name)?;
        let path = self.root.join(name);
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(ResourceLoadFailure::Missing {
                    name: name.to_string(),
                    bundle: self.root.clone(),
                })
            }
            Err(err) => Err(ResourceLoadFailure::Io {
                name: name.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

/// Bundle held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryBundle {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(name.to_string(), bytes.into());
        self
    }
}

impl ResourceBundle for MemoryBundle {
    fn describe(&self) -> String {
        format!("memory ({} resources)", self.entries.len())
    }

    fn open(&self, name: &str) -> Result<Box<dyn Read + Send>, ResourceLoadFailure> {
        check_resource_name(name)?;
        match self.entries.get(name) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(ResourceLoadFailure::Missing {
                name: name.to_string(),
                bundle: PathBuf::from("memory"),
            }),
        }
    }
}

/// Resource names are bare file names.
pub(crate) fn check_resource_name(name: &str) -> Result<(), ResourceLoadFailure> {
    let bare = Path::new(name)
        .file_name()
        .is_some_and(|file_name| file_name == name);
    if name.is_empty() || !bare {
        return Err(ResourceLoadFailure::Io {
            name: name.to_string(),
            reason: "resource names must be bare file names".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_bundle_reports_missing_resource() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = DirBundle::new(dir.path());
        match bundle.open("banana_classifier.xml") {
            Err(ResourceLoadFailure::Missing { name, .. }) => {
                assert_eq!(name, "banana_classifier.xml")
            }
            Err(other) => panic!("unexpected failure {other}"),
            Ok(_) => panic!("expected missing resource"),
        }
    }

    #[test]
    fn dir_bundle_streams_bytes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("model.xml"), b"<cascade/>")?;
        let bundle = DirBundle::new(dir.path());
        let mut reader = bundle.open("model.xml")?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        assert_eq!(bytes, b"<cascade/>");
        Ok(())
    }

    #[test]
    fn rejects_paths_as_names() {
        let bundle = MemoryBundle::new().with_resource("ok.xml", b"x".to_vec());
        assert!(bundle.open("../ok.xml").is_err());
        assert!(bundle.open("nested/ok.xml").is_err());
        assert!(bundle.open("").is_err());
        assert!(bundle.open("ok.xml").is_ok());
    }
}
