use crate::common::Artifact;
use crate::error::AppError;
use git2::{ErrorCode, Repository};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whether freshly produced bytes warrant a new commit.
pub fn should_publish(new_bytes: &[u8], last_committed: Option<&[u8]>) -> bool {
    last_committed != Some(new_bytes)
}

/// Source of the bytes last recorded for an artifact path.
pub trait CommittedStore: Send {
    fn last_committed(&self, path: &Path) -> Result<Option<Vec<u8>>, AppError>;
}

/// Reads blobs from the tree at `HEAD` of a git repository.
pub struct GitCommittedStore {
    repository_path: PathBuf,
}

impl GitCommittedStore {
    pub fn new(repository_path: impl Into<PathBuf>) -> Self {
        Self {
            repository_path: repository_path.into(),
        }
    }
}

impl CommittedStore for GitCommittedStore {
    fn last_committed(&self, path: &Path) -> Result<Option<Vec<u8>>, AppError> {
        let repository = Repository::discover(&self.repository_path)?;
        let relative = relative_to_workdir(&repository, path)?;

        let tree = match repository.head() {
            Ok(head) => head.peel_to_tree()?,
            Err(error) if is_missing(&error) => {
                debug!("Repository has no commits yet");
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        };

        let entry = match tree.get_path(&relative) {
            Ok(entry) => entry,
            Err(error) if is_missing(&error) => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let blob = entry.to_object(&repository)?.peel_to_blob()?;
        Ok(Some(blob.content().to_vec()))
    }
}

fn is_missing(error: &git2::Error) -> bool {
    matches!(error.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound)
}

/// Maps an artifact path onto the path git stores it under.
pub(crate) fn relative_to_workdir(repository: &Repository, path: &Path) -> Result<PathBuf, AppError> {
    let workdir = repository
        .workdir()
        .ok_or_else(|| AppError::Pipeline("Repository is bare".to_string()))?;
    let workdir = workdir
        .canonicalize()
        .map_err(|error| AppError::Pipeline(format!("Cannot resolve {}: {error}", workdir.display())))?;
    let absolute = path
        .canonicalize()
        .map_err(|error| AppError::Pipeline(format!("Cannot resolve {}: {error}", path.display())))?;

    absolute
        .strip_prefix(&workdir)
        .map(Path::to_path_buf)
        .map_err(|_| {
            AppError::Pipeline(format!(
                "{} is outside the repository at {}",
                absolute.display(),
                workdir.display()
            ))
        })
}

/// In-memory store, handy when no repository is involved.
#[derive(Debug, Clone, Default)]
pub struct MemoryCommittedStore {
    blobs: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryCommittedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.blobs.insert(path.into(), bytes.into());
    }
}

impl CommittedStore for MemoryCommittedStore {
    fn last_committed(&self, path: &Path) -> Result<Option<Vec<u8>>, AppError> {
        Ok(self.blobs.get(path).cloned())
    }
}

/// Outcome of comparing a run's artifacts with what was last committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitDecision {
    pub changed: bool,
    pub changed_paths: Vec<PathBuf>,
}

impl CommitDecision {
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            changed_paths: Vec::new(),
        }
    }
}

pub struct ChangeDetector {
    store: Box<dyn CommittedStore>,
}

impl ChangeDetector {
    pub fn new(store: Box<dyn CommittedStore>) -> Self {
        Self { store }
    }

    pub fn detect(&self, artifacts: &[&Artifact]) -> Result<CommitDecision, AppError> {
        let mut decision = CommitDecision::unchanged();
        for artifact in artifacts {
            let committed = self.store.last_committed(artifact.path())?;
            if should_publish(artifact.bytes(), committed.as_deref()) {
                debug!("{} differs from the committed version", artifact.path().display());
                decision.changed = true;
                decision.changed_paths.push(artifact.path().to_path_buf());
            }
        }
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;

    #[test]
    fn decision_function() {
        assert!(should_publish(&[0xAA], None));
        assert!(should_publish(&[0xAA], Some(&[0xBB][..])));
        assert!(!should_publish(&[0xAA, 0xAB], Some(&[0xAA, 0xAB][..])));
        assert!(should_publish(&[], None));
    }

    #[test]
    fn detector_lists_only_changed_artifacts() {
        let mut store = MemoryCommittedStore::new();
        store.record("radar.gif", vec![1, 2, 3]);
        store.record("filtered.gif", vec![9]);
        let detector = ChangeDetector::new(Box::new(store));

        let radar = Artifact::new("radar.gif", vec![1, 2, 3]);
        let filtered = Artifact::new("filtered.gif", vec![8]);
        let decision = detector.detect(&[&radar, &filtered]).unwrap();

        assert!(decision.changed);
        assert_eq!(decision.changed_paths, vec![PathBuf::from("filtered.gif")]);

        let same = Artifact::new("filtered.gif", vec![9]);
        assert_eq!(
            detector.detect(&[&radar, &same]).unwrap(),
            CommitDecision::unchanged()
        );
    }

    #[test]
    fn git_store_reads_head_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Repository::init(dir.path()).unwrap();
        let path = dir.path().join("radar.gif");
        std::fs::write(&path, [0xAA, 0xAA]).unwrap();

        let store = GitCommittedStore::new(dir.path());
        assert_eq!(store.last_committed(&path).unwrap(), None);

        let mut index = repository.index().unwrap();
        index.add_path(Path::new("radar.gif")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repository.find_tree(tree_id).unwrap();
        let signature = Signature::now("test", "test@example.com").unwrap();
        repository
            .commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
            .unwrap();

        assert_eq!(store.last_committed(&path).unwrap(), Some(vec![0xAA, 0xAA]));

        let untracked = dir.path().join("filtered.gif");
        std::fs::write(&untracked, [1]).unwrap();
        assert_eq!(store.last_committed(&untracked).unwrap(), None);
    }
}
