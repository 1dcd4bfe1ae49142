//! Core types and errors for the dependency finder.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while looking for dependent repositories.
#[derive(Error, Debug)]
pub enum DepfinderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Manifest is not valid UTF-8: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    #[error("Invalid scope pattern: {0}")]
    RegexError(#[from] regex::Error),

    #[error("GitHub API returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Unexpected content response structure")]
    UnexpectedContent,

    #[error("Invalid repository name: {0}")]
    InvalidRepositoryName(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, DepfinderError>;

/// A candidate repository discovered on GitHub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    /// Repository name without the owner.
    pub name: String,
    /// Full repository name in "owner/name" format.
    pub full_name: String,
    /// Default branch, when GitHub reported one.
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
}

impl Repository {
    /// Split `full_name` into owner and repository name.
    pub fn owner_and_name(&self) -> Result<(&str, &str)> {
        match self.full_name.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok((owner, repo))
            }
            _ => Err(DepfinderError::InvalidRepositoryName(self.full_name.clone())),
        }
    }

    /// Branch to resolve the head commit from.
    pub fn branch(&self) -> &str {
        match self.default_branch.as_deref() {
            Some(branch) if !branch.is_empty() => branch,
            _ => "main",
        }
    }

    /// Forks and archived repositories are never scanned.
    pub fn is_active(&self) -> bool {
        !self.fork && !self.archived
    }
}

/// A manifest file located inside a repository tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReference {
    /// Full name of the repository the manifest belongs to.
    pub repository: String,
    /// Path of the manifest from the repository root.
    pub path: String,
}

/// Cached verdict for one repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// True if the repository depends on the target library.
    pub depends_on: bool,
    /// When the repository was checked (ISO-8601).
    pub when: String,
}

impl CacheEntry {
    /// Create an entry stamped with the current time.
    pub fn now(depends_on: bool) -> Self {
        Self::at(depends_on, Utc::now())
    }

    /// Create an entry stamped with the given time.
    pub fn at(depends_on: bool, when: DateTime<Utc>) -> Self {
        Self {
            depends_on,
            when: when.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Parse the timestamp, `None` if it is not a valid ISO-8601 date.
    pub fn checked_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.when)
            .ok()
            .map(|when| when.with_timezone(&Utc))
    }
}

/// Configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            user_agent: concat!("depfinder/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
