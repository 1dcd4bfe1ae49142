//! Manifest dependency inspection.

use crate::github::{ContentResponse, GitHubApi};
use crate::parser::{decode_content, PackageManifest, ScopeMatcher};
use crate::types::{DepfinderError, Repository, Result};
use std::sync::Arc;
use tracing::trace;

/// Fetches a manifest and tests its dependencies against the scopes.
#[derive(Clone)]
pub struct DependencyInspector {
    api: Arc<dyn GitHubApi>,
    matcher: ScopeMatcher,
}

impl DependencyInspector {
    pub fn new(api: Arc<dyn GitHubApi>, matcher: ScopeMatcher) -> Self {
        Self { api, matcher }
    }

    /// True if the manifest declares a dependency in one of the scopes.
    ///
    /// Anything but a single base64 encoded file is an error for this manifest.
    pub async fn depends_on(&self, repository: &Repository, manifest_path: &str) -> Result<bool> {
        let (owner, repo) = repository.owner_and_name()?;
        let encoded = match self.api.content(owner, repo, manifest_path).await? {
            ContentResponse::Item(item)
                if item.item_type == "file" && item.encoding.as_deref() == Some("base64") =>
            {
                item.content.ok_or(DepfinderError::UnexpectedContent)?
            }
            _ => return Err(DepfinderError::UnexpectedContent),
        };

        let manifest = PackageManifest::parse(&decode_content(&encoded)?)?;
        let found = self.matcher.any_match(manifest.dependency_names());
        trace!(
            "{}:{} matches {}: {}",
            repository.full_name,
            manifest_path,
            self.matcher.as_str(),
            found
        );
        Ok(found)
    }
}
