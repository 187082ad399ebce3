use crate::error::{ReadError, WriteError};
use bytes::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A file produced by a pipeline stage together with the exact bytes stored there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    bytes: Bytes,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, bytes: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reads an artifact left on disk by an earlier invocation.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ReadError> {
        let path = path.into();
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Self::new(path, bytes)),
            Err(source) => Err(ReadError { path, source }),
        }
    }

    /// Writes `bytes` to `path` through a temporary sibling and a rename, so
    /// readers see either the old file or the complete new one.
    pub fn persist(path: impl Into<PathBuf>, bytes: impl Into<Bytes>) -> Result<Self, WriteError> {
        let artifact = Self::new(path, bytes);
        write_atomically(&artifact.path, &artifact.bytes)?;
        Ok(artifact)
    }
}

/// The raw radar snapshot as downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadarImage(pub Artifact);

/// The post-processed radar snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredImage(pub Artifact);

impl AsRef<Artifact> for RadarImage {
    fn as_ref(&self) -> &Artifact {
        &self.0
    }
}

impl AsRef<Artifact> for FilteredImage {
    fn as_ref(&self) -> &Artifact {
        &self.0
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let io_error = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(directory).map_err(io_error)?;
    staged.write_all(bytes).map_err(io_error)?;
    staged.as_file().sync_all().map_err(io_error)?;
    staged
        .persist(path)
        .map_err(|persist_error| io_error(persist_error.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radar.gif");

        Artifact::persist(&path, vec![0xAA; 16]).unwrap();
        let second = Artifact::persist(&path, vec![0xBB; 4]).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![0xBB; 4]);
        assert_eq!(second.bytes(), &[0xBB; 4]);
        // Only the artifact remains, no staging leftovers.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn persist_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("radar.gif");

        let result = Artifact::persist(&path, vec![1, 2, 3]);
        assert!(matches!(result, Err(WriteError::Io { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = Artifact::load(dir.path().join("absent.gif")).unwrap_err();
        assert_eq!(error.source.kind(), std::io::ErrorKind::NotFound);
    }
}
