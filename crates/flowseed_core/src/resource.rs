//! Bundled resource lookup for process definitions and seed attachments.
//!
//! # Responsibility
//! - Resolve logical resource names (`crmGetProcess.bpmn`,
//!   `demo/model/test.svg`) to bytes.
//!
//! # Invariants
//! - Names are relative; absolute paths and `..` components never leave the
//!   configured root.

use log::debug;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Source of named resource bytes.
pub trait ResourceLoader {
    /// Loads the full contents of `name`.
    ///
    /// # Errors
    /// - `NotFound` when no such resource exists.
    /// - `InvalidInput` when `name` escapes the resource root.
    fn load(&self, name: &str) -> io::Result<Vec<u8>>;
}

/// Loads resources from files under one root directory.
#[derive(Debug, Clone)]
pub struct DirResourceLoader {
    root: PathBuf,
}

impl DirResourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        let relative = Path::new(name);
        let is_plain = !name.trim().is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("resource name `{name}` must be a plain relative path"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl ResourceLoader for DirResourceLoader {
    fn load(&self, name: &str) -> io::Result<Vec<u8>> {
        let path = self.resolve(name)?;
        let bytes = std::fs::read(&path)?;
        debug!(
            "event=resource_load module=resource status=ok name={} bytes={}",
            crate::logging::field_value(name),
            bytes.len()
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::{DirResourceLoader, ResourceLoader};
    use std::io::ErrorKind;

    #[test]
    fn loads_nested_relative_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("demo/model")).unwrap();
        std::fs::write(dir.path().join("demo/model/test.svg"), b"<svg/>").unwrap();

        let loader = DirResourceLoader::new(dir.path());
        assert_eq!(loader.load("demo/model/test.svg").unwrap(), b"<svg/>");
    }

    #[test]
    fn missing_resource_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DirResourceLoader::new(dir.path());
        let err = loader.load("absent.bpmn").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn rejects_names_escaping_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DirResourceLoader::new(dir.path());
        for name in ["../secret", "/etc/passwd", "a/../../b", "", "./x"] {
            let err = loader.load(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "name `{name}`");
        }
    }
}
