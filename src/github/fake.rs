//! In-memory GitHub used by the unit tests.

use super::{CodeSearchItem, ContentItem, ContentResponse, GitHubApi, Tree, TreeEntry};
use crate::types::{DepfinderError, Repository, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn not_found(what: &str) -> DepfinderError {
    DepfinderError::ApiError {
        status: 404,
        message: format!("{} not found", what),
    }
}

pub(crate) fn repository(full_name: &str) -> Repository {
    Repository {
        name: full_name.rsplit('/').next().unwrap_or_default().to_string(),
        full_name: full_name.to_string(),
        default_branch: Some("main".to_string()),
        fork: false,
        archived: false,
    }
}

/// A configurable fake GitHub that records the calls it receives.
#[derive(Default)]
pub(crate) struct FakeGitHub {
    pub search_results: HashMap<String, Vec<Repository>>,
    pub failing_queries: Vec<String>,
    pub org_repositories: HashMap<String, Vec<Repository>>,
    pub branches: HashMap<String, String>,
    pub trees: HashMap<String, Vec<TreeEntry>>,
    pub contents: HashMap<(String, String), ContentResponse>,
    /// Content paths whose fetch never completes.
    pub stalled_paths: Vec<String>,
    pub searches: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeGitHub {
    /// The reference scenario: repo1 depends on `@scope`, repo2 has no manifest.
    pub fn reference_scenario() -> Self {
        let mut fake = Self::default();
        fake.search_results.insert(
            "@scope/ filename:package.json".to_string(),
            vec![repository("testOrg/repo1"), repository("testOrg/repo2")],
        );
        fake.add_repository(
            "testOrg/repo1",
            &[
                ("package.json", Some(r#"{"dependencies":{"@scope/some-package":"^1.0.0"}}"#)),
                ("src/index.ts", None),
                ("libs/@scope/name/package.json", Some(r#"{"dependencies":{"some-other-package":"^1.0.0"}}"#)),
            ],
        );
        fake.add_repository("testOrg/repo2", &[("src/index.ts", None), ("README.md", None)]);
        fake
    }

    /// Register a repository tree; files with content become fetchable.
    pub fn add_repository(&mut self, full_name: &str, files: &[(&str, Option<&str>)]) {
        let sha = format!("sha-{}", full_name);
        self.branches.insert(full_name.to_string(), sha.clone());
        self.trees.insert(
            sha,
            files
                .iter()
                .map(|(path, _)| TreeEntry {
                    path: path.to_string(),
                    entry_type: "blob".to_string(),
                })
                .collect(),
        );
        for (path, content) in files {
            if let Some(content) = content {
                self.contents.insert(
                    (full_name.to_string(), path.to_string()),
                    ContentResponse::Item(ContentItem {
                        item_type: "file".to_string(),
                        encoding: Some("base64".to_string()),
                        content: Some(STANDARD.encode(content)),
                    }),
                );
            }
        }
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    /// Number of branch, tree and content calls made for a repository.
    pub fn calls_for(&self, full_name: &str) -> usize {
        let prefix = format!("{} ", full_name);
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|c| c.starts_with(&prefix)).count())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn search_code(&self, query: &str, _per_page: u8) -> Result<Vec<CodeSearchItem>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.failing_queries.iter().any(|q| q == query) {
            return Err(DepfinderError::ApiError {
                status: 403,
                message: "API rate limit exceeded".to_string(),
            });
        }
        Ok(self
            .search_results
            .get(query)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|repository| CodeSearchItem { repository })
            .collect())
    }

    async fn list_org_repositories(&self, org: &str, _per_page: u8) -> Result<Vec<Repository>> {
        self.org_repositories
            .get(org)
            .cloned()
            .ok_or_else(|| not_found("Organization"))
    }

    async fn branch_head(&self, owner: &str, repo: &str, _branch: &str) -> Result<String> {
        let full_name = format!("{}/{}", owner, repo);
        self.record(format!("{} branch", full_name));
        self.branches
            .get(&full_name)
            .cloned()
            .ok_or_else(|| not_found("Branch"))
    }

    async fn tree(&self, owner: &str, repo: &str, tree_sha: &str) -> Result<Tree> {
        self.record(format!("{}/{} tree", owner, repo));
        self.trees
            .get(tree_sha)
            .cloned()
            .map(|tree| Tree {
                tree,
                truncated: false,
            })
            .ok_or_else(|| not_found("Tree"))
    }

    async fn content(&self, owner: &str, repo: &str, path: &str) -> Result<ContentResponse> {
        let full_name = format!("{}/{}", owner, repo);
        self.record(format!("{} content {}", full_name, path));
        if self.stalled_paths.iter().any(|p| p == path) {
            return std::future::pending().await;
        }
        self.contents
            .get(&(full_name, path.to_string()))
            .cloned()
            .ok_or_else(|| not_found("Content"))
    }
}
