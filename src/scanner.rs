//! Main scanner orchestrating all components.
//!
//! Per repository: locate manifests, inspect them concurrently until the first
//! one declares a scoped dependency, record the verdict in the cache. No single
//! repository, manifest or scope failure aborts the scan; the worst outcome is
//! an incomplete result list and a few log lines.

use crate::cache::{Cache, CacheStore};
use crate::config::ScanConfig;
use crate::discovery::{DependencyInspector, ManifestLocator, RepositorySearcher, RepositorySource};
use crate::github::{GitHubApi, GitHubClient};
use crate::parser::ScopeMatcher;
use crate::types::{CacheEntry, Repository, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Live view of the repositories found so far.
///
/// Shared between the background scan, which appends, and readers such as the
/// MCP tool handler, which may look at it before the scan completes.
#[derive(Debug, Default)]
pub struct ScanProgress {
    repositories: RwLock<Vec<String>>,
    finished: AtomicBool,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dependent repository. Returns false if it was already listed.
    pub fn push(&self, full_name: &str) -> bool {
        let mut repositories = self
            .repositories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if repositories.iter().any(|r| r == full_name) {
            return false;
        }
        repositories.push(full_name.to_string());
        true
    }

    /// Dependents in insertion order.
    pub fn repositories(&self) -> Vec<String> {
        self.repositories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.repositories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }
}

/// Statistics of a completed scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Dependents taken from the cache without any API call.
    pub cached_dependents: usize,
    /// Candidates that were inspected during this scan.
    pub scanned: usize,
    /// Total number of dependents.
    pub dependents: usize,
    pub duration_ms: u128,
}

/// Handle on a scan running in the background.
pub struct ScanHandle {
    progress: Arc<ScanProgress>,
    task: JoinHandle<ScanSummary>,
}

impl ScanHandle {
    pub fn progress(&self) -> Arc<ScanProgress> {
        self.progress.clone()
    }

    /// Wait for the scan to complete.
    pub async fn wait(self) -> Option<ScanSummary> {
        match self.task.await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("Scan task failed: {}", e);
                self.progress.mark_finished();
                None
            }
        }
    }

    /// Let the scan run on its own. The progress is still marked finished if
    /// the task dies.
    pub fn detach(self) -> Arc<ScanProgress> {
        let progress = self.progress();
        tokio::spawn(self.wait());
        progress
    }
}

/// Finds the repositories depending on the configured scopes.
pub struct Scanner {
    library_name: String,
    scopes: Vec<String>,
    source: RepositorySource,
    searcher: RepositorySearcher,
    locator: ManifestLocator,
    inspector: DependencyInspector,
    cache_store: Option<CacheStore>,
}

impl Scanner {
    /// Create a scanner talking to GitHub with the given token.
    pub fn new(config: &ScanConfig, token: &str, api_url: &str) -> Result<Self> {
        let client = GitHubClient::new(token, api_url, config.http_config(), config.rate_limit)?;
        Self::with_api(config, Arc::new(client))
    }

    /// Create a scanner on top of any GitHub API implementation.
    pub fn with_api(config: &ScanConfig, api: Arc<dyn GitHubApi>) -> Result<Self> {
        let scopes = config.validate()?;
        let matcher = ScopeMatcher::new(&scopes)?;

        let source = match config.org {
            Some(ref org) => RepositorySource::Organization { org: org.clone() },
            None => RepositorySource::CodeSearch {
                scopes: scopes.clone(),
            },
        };

        let cache_store = if config.disable_cache {
            None
        } else {
            Some(
                CacheStore::new(config.resolved_cache_path(), config.cache_max_age)
                    .with_pretty(config.pretty_cache),
            )
        };

        Ok(Self {
            library_name: config.library_name.clone(),
            scopes,
            source,
            searcher: RepositorySearcher::new(api.clone(), &config.manifest_name, config.per_page),
            locator: ManifestLocator::new(api.clone(), &config.manifest_name),
            inspector: DependencyInspector::new(api, matcher),
            cache_store,
        })
    }

    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    /// Normalized scopes, without their `@` prefix.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn source(&self) -> &RepositorySource {
        &self.source
    }

    /// Start the scan as a detached task and return its handle immediately.
    pub fn spawn(self: Arc<Self>) -> ScanHandle {
        let progress = Arc::new(ScanProgress::new());
        let task_progress = progress.clone();
        let task = tokio::spawn(async move { self.run(&task_progress).await });
        ScanHandle { progress, task }
    }

    /// Run the whole scan, appending dependents to `progress` as they are found.
    pub async fn run(&self, progress: &ScanProgress) -> ScanSummary {
        let start_time = Instant::now();

        let cache = match self.cache_store {
            Some(ref store) => store.load().await,
            None => {
                info!("Ignoring cached repositories as caching is disabled");
                Cache::new()
            }
        };

        let cached_dependents = cache.dependents();
        for full_name in &cached_dependents {
            progress.push(full_name);
        }
        if self.cache_store.is_some() {
            info!(
                "Loaded {} cached repositories, {} of them using {} dependencies",
                cache.len(),
                cached_dependents.len(),
                self.library_name
            );
        }

        // Cached negatives are rescanned, they may have adopted the library since
        let candidates: Vec<Repository> = self
            .searcher
            .discover(&self.source)
            .await
            .into_iter()
            .filter(|repo| !cache.is_known_dependent(&repo.full_name))
            .collect();
        let scanned = candidates.len();

        let mut tasks = FuturesUnordered::new();
        for repository in candidates {
            let cache = cache.clone();
            let full_name = repository.full_name.clone();
            tasks.push(async move {
                let verdict = self.scan_repository(&repository, &cache, progress).await;
                (full_name, verdict)
            });
        }
        while let Some((full_name, depends_on)) = tasks.next().await {
            debug!("{} settled (depends on {}: {})", full_name, self.library_name, depends_on);
        }

        info!(
            "Found {} repositories using {} dependencies",
            progress.len(),
            self.library_name
        );

        match self.cache_store {
            Some(ref store) => store.save(&cache).await,
            None => info!("Not updating cache as caching is disabled"),
        }

        progress.mark_finished();

        ScanSummary {
            cached_dependents: cached_dependents.len(),
            scanned,
            dependents: progress.len(),
            duration_ms: start_time.elapsed().as_millis(),
        }
    }

    /// Decide whether one repository depends on the library.
    ///
    /// Always leaves exactly one cache entry for the repository.
    async fn scan_repository(
        &self,
        repository: &Repository,
        cache: &Cache,
        progress: &ScanProgress,
    ) -> bool {
        let full_name = repository.full_name.as_str();
        debug!("Checking repository {}...", full_name);

        let manifests = match self.locator.locate(repository).await {
            Ok(manifests) => manifests,
            Err(e) => {
                warn!("Failed to list manifest files in repository {}: {}", full_name, e);
                Vec::new()
            }
        };

        if manifests.is_empty() {
            info!("No manifest files found in repository {}", full_name);
            cache.insert(full_name, CacheEntry::now(false));
            return false;
        }

        // First positive wins; dropping the stream abandons the other inspections
        let mut inspections: FuturesUnordered<_> = manifests
            .iter()
            .map(|manifest| async move {
                (manifest, self.inspector.depends_on(repository, &manifest.path).await)
            })
            .collect();

        let mut depends_on = false;
        while let Some((manifest, result)) = inspections.next().await {
            match result {
                Ok(true) => {
                    depends_on = true;
                    break;
                }
                Ok(false) => {}
                Err(e) => error!(
                    "Failed to check manifest file at {} in repository {}: {}",
                    manifest.path, full_name, e
                ),
            }
        }
        drop(inspections);

        if depends_on {
            progress.push(full_name);
            info!("Repository {} uses {} dependencies", full_name, self.library_name);
            cache.insert(full_name, CacheEntry::now(true));
        }
        cache.insert_if_absent(full_name, CacheEntry::now(false));

        depends_on
    }
}
