use crate::config::RepositorySettings;
use crate::error::AppError;
use crate::pipeline::services::change_detector::relative_to_workdir;
use async_trait::async_trait;
use git2::{Repository, Signature};
use std::path::{Path, PathBuf};
use tracing::info;

/// What a publisher recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub commit_id: String,
    pub paths: Vec<PathBuf>,
}

/// Durably records changed artifacts.
#[async_trait]
pub trait Publisher: Send {
    async fn publish(&mut self, paths: &[PathBuf]) -> Result<PublishReceipt, AppError>;
    fn name(&self) -> &'static str;
}

/// Commits artifacts onto `HEAD` of the local repository. Pushing is left to
/// whatever invoked the run.
pub struct GitPublisher {
    repository_path: PathBuf,
    message: String,
    author_name: String,
    author_email: String,
}

impl GitPublisher {
    pub fn new(settings: &RepositorySettings) -> Self {
        Self {
            repository_path: settings.path.clone(),
            message: settings.commit_message.clone(),
            author_name: settings.author_name.clone(),
            author_email: settings.author_email.clone(),
        }
    }

    /// The commit tree is HEAD's tree plus `paths`; anything else staged in
    /// the repository stays staged and out of the commit.
    fn commit(&self, paths: &[PathBuf]) -> Result<git2::Oid, AppError> {
        let repository = Repository::discover(&self.repository_path)?;

        let parent = match repository.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(error) if error.code() == git2::ErrorCode::UnbornBranch => None,
            Err(error) => return Err(error.into()),
        };

        let mut staged = git2::Index::new()?;
        if let Some(parent) = &parent {
            staged.read_tree(&parent.tree()?)?;
        }

        let mut index = repository.index()?;
        for path in paths {
            let relative = relative_to_workdir(&repository, path)?;
            index.add_path(&relative)?;
            let entry = index.get_path(&relative, 0).ok_or_else(|| {
                AppError::Pipeline(format!("{} missing from the index", relative.display()))
            })?;
            staged.add(&entry)?;
        }
        index.write()?;

        let tree = repository.find_tree(staged.write_tree_to(&repository)?)?;
        let signature = Signature::now(&self.author_name, &self.author_email)?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        Ok(repository.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &self.message,
            &tree,
            &parents,
        )?)
    }
}

#[async_trait]
impl Publisher for GitPublisher {
    async fn publish(&mut self, paths: &[PathBuf]) -> Result<PublishReceipt, AppError> {
        let commit_id = self.commit(paths)?;
        info!("Committed {} artifact(s) as {}", paths.len(), commit_id);
        Ok(PublishReceipt {
            commit_id: commit_id.to_string(),
            paths: paths.to_vec(),
        })
    }

    fn name(&self) -> &'static str {
        "GitPublisher"
    }
}

/// Counts commits reachable from `HEAD`; zero for an unborn branch.
pub fn commit_count(repository_path: &Path) -> Result<usize, AppError> {
    let repository = Repository::discover(repository_path)?;
    if repository.head().is_err() {
        return Ok(0);
    }
    let mut walk = repository.revwalk()?;
    walk.push_head()?;
    Ok(walk.count())
}
