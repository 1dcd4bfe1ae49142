//! GitHub REST API access.
//!
//! The finder only needs five narrow calls, expressed by [`GitHubApi`]:
//! - code search (paginated)
//! - organization repository listing (paginated)
//! - branch head resolution
//! - recursive tree listing
//! - file content retrieval

pub mod client;
#[cfg(test)]
pub(crate) mod fake;

pub use client::GitHubClient;

use crate::types::{Repository, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// One hit of a code search query.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeSearchItem {
    pub repository: Repository,
}

/// One entry of a git tree.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.entry_type == "blob"
    }
}

/// A git tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

/// Response of the contents endpoint: a directory listing or a single item.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentResponse {
    Directory(Vec<serde_json::Value>),
    Item(ContentItem),
}

/// A single item returned by the contents endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// The subset of the GitHub API used by the finder.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Run a code search query and return every page of hits.
    async fn search_code(&self, query: &str, per_page: u8) -> Result<Vec<CodeSearchItem>>;

    /// List every repository of an organization, most recently updated first.
    async fn list_org_repositories(&self, org: &str, per_page: u8) -> Result<Vec<Repository>>;

    /// Resolve a branch to its head commit SHA.
    async fn branch_head(&self, owner: &str, repo: &str, branch: &str) -> Result<String>;

    /// List the full recursive tree at a commit.
    async fn tree(&self, owner: &str, repo: &str, tree_sha: &str) -> Result<Tree>;

    /// Fetch the content of a path.
    async fn content(&self, owner: &str, repo: &str, path: &str) -> Result<ContentResponse>;
}
