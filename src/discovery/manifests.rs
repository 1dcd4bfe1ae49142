//! Manifest location inside a repository tree.

use crate::github::GitHubApi;
use crate::parser::is_manifest_path;
use crate::types::{ManifestReference, Repository, Result};
use std::sync::Arc;
use tracing::{trace, warn};

/// Lists the manifest files of a repository at its default branch head.
#[derive(Clone)]
pub struct ManifestLocator {
    api: Arc<dyn GitHubApi>,
    manifest_name: String,
}

impl ManifestLocator {
    pub fn new(api: Arc<dyn GitHubApi>, manifest_name: impl Into<String>) -> Self {
        Self {
            api,
            manifest_name: manifest_name.into(),
        }
    }

    /// Every manifest blob in the repository, including nested packages.
    ///
    /// Branch or tree lookup failures are returned to the caller.
    pub async fn locate(&self, repository: &Repository) -> Result<Vec<ManifestReference>> {
        let (owner, repo) = repository.owner_and_name()?;
        let sha = self.api.branch_head(owner, repo, repository.branch()).await?;
        trace!("{} {} is at {}", repository.full_name, repository.branch(), sha);

        let tree = self.api.tree(owner, repo, &sha).await?;
        if tree.truncated {
            warn!(
                "Tree of {} is truncated, some {} files may be missed",
                repository.full_name, self.manifest_name
            );
        }

        Ok(tree
            .tree
            .into_iter()
            .filter(|entry| entry.is_blob() && is_manifest_path(&entry.path, &self.manifest_name))
            .map(|entry| ManifestReference {
                repository: repository.full_name.clone(),
                path: entry.path,
            })
            .collect())
    }
}
