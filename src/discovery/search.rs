//! Candidate repository discovery.

use crate::github::GitHubApi;
use crate::types::Repository;
use futures::future::join_all;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Where candidate repositories come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySource {
    /// One code search per scope for manifests mentioning `@<scope>/`.
    CodeSearch { scopes: Vec<String> },
    /// Every repository of an organization.
    Organization { org: String },
}

impl fmt::Display for RepositorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CodeSearch { scopes } => {
                let scopes: Vec<String> = scopes.iter().map(|s| format!("@{}", s)).collect();
                write!(f, "code search for {}", scopes.join(", "))
            }
            Self::Organization { org } => write!(f, "organization {}", org),
        }
    }
}

/// Finds repositories that may depend on the configured scopes.
#[derive(Clone)]
pub struct RepositorySearcher {
    api: Arc<dyn GitHubApi>,
    manifest_name: String,
    per_page: u8,
}

impl RepositorySearcher {
    pub fn new(api: Arc<dyn GitHubApi>, manifest_name: impl Into<String>, per_page: u8) -> Self {
        Self {
            api,
            manifest_name: manifest_name.into(),
            per_page,
        }
    }

    /// Code search query for one scope.
    pub fn query_for(&self, scope: &str) -> String {
        format!("@{}/ filename:{}", scope, self.manifest_name)
    }

    /// Discover candidates from the given source. Never fails.
    pub async fn discover(&self, source: &RepositorySource) -> Vec<Repository> {
        match source {
            RepositorySource::CodeSearch { scopes } => self.search(scopes).await,
            RepositorySource::Organization { org } => self.list_organization(org).await,
        }
    }

    /// Search every scope concurrently and merge the active repositories.
    ///
    /// One query per scope instead of a single OR query: the search API limits
    /// query length and complexity. A failing scope contributes nothing.
    pub async fn search(&self, scopes: &[String]) -> Vec<Repository> {
        let searches = scopes.iter().map(|scope| async move {
            let query = self.query_for(scope);
            match self.api.search_code(&query, self.per_page).await {
                Ok(items) => {
                    let repos: Vec<Repository> = items
                        .into_iter()
                        .map(|item| item.repository)
                        .filter(Repository::is_active)
                        .collect();
                    info!(
                        "Found {} repositories with references to @{} in {}",
                        repos.len(),
                        scope,
                        self.manifest_name
                    );
                    repos
                }
                Err(e) => {
                    warn!("Code search for @{} failed: {}", scope, e);
                    Vec::new()
                }
            }
        });

        let repositories = dedup_by_full_name(join_all(searches).await.into_iter().flatten());
        info!("Found {} candidate repositories", repositories.len());
        repositories
    }

    /// List the active repositories of an organization.
    pub async fn list_organization(&self, org: &str) -> Vec<Repository> {
        match self.api.list_org_repositories(org, self.per_page).await {
            Ok(repos) => {
                let repositories =
                    dedup_by_full_name(repos.into_iter().filter(Repository::is_active));
                info!(
                    "Found {} repositories in the organization {}",
                    repositories.len(),
                    org
                );
                repositories
            }
            Err(e) => {
                warn!("Failed to list repositories of the organization {}: {}", org, e);
                Vec::new()
            }
        }
    }
}

/// Order-preserving deduplication, the last occurrence's fields win.
fn dedup_by_full_name(repos: impl IntoIterator<Item = Repository>) -> Vec<Repository> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Repository> = Vec::new();

    for repo in repos {
        match index.get(&repo.full_name) {
            Some(&position) => unique[position] = repo,
            None => {
                index.insert(repo.full_name.clone(), unique.len());
                unique.push(repo);
            }
        }
    }

    unique
}
