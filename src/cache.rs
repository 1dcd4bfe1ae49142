//! On-disk cache of repository verdicts.
//!
//! The cache maps a repository full name to a [`CacheEntry`]. It is read once
//! when a scan starts, shared by every repository task while the scan runs and
//! written back as a whole when the scan ends. Caching is best effort: a
//! missing or corrupt file is a cold start, a failed write is only logged.

use crate::types::{CacheEntry, Result};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Thread-safe map of repository verdicts.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, full_name: &str) -> Option<CacheEntry> {
        self.entries.get(full_name).map(|entry| entry.clone())
    }

    /// Store an entry, replacing any previous verdict.
    pub fn insert(&self, full_name: &str, entry: CacheEntry) {
        self.entries.insert(full_name.to_string(), entry);
    }

    /// Store an entry only if the repository has none yet.
    ///
    /// Returns true if the entry was inserted.
    pub fn insert_if_absent(&self, full_name: &str, entry: CacheEntry) -> bool {
        let mut inserted = false;
        self.entries.entry(full_name.to_string()).or_insert_with(|| {
            inserted = true;
            entry
        });
        inserted
    }

    /// True if the repository is cached as depending on the library.
    pub fn is_known_dependent(&self, full_name: &str) -> bool {
        self.entries
            .get(full_name)
            .map(|entry| entry.depends_on)
            .unwrap_or(false)
    }

    /// Full names of cached dependents, sorted.
    pub fn dependents(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().depends_on)
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Evict entries older than `max_age_days` or with an unparseable timestamp.
    ///
    /// Returns the number of evicted entries.
    pub fn evict_stale(&self, max_age_days: u32, now: DateTime<Utc>) -> usize {
        let max_age = Duration::days(i64::from(max_age_days));
        let before = self.entries.len();

        self.entries.retain(|full_name, entry| {
            let fresh = entry
                .checked_at()
                .map(|when| now.signed_duration_since(when) <= max_age)
                .unwrap_or(false);
            if !fresh {
                info!("Cache for repository {} is outdated or invalid, removing it", full_name);
            }
            fresh
        });

        before - self.entries.len()
    }

    /// Sorted copy of the entries, used for serialization.
    pub fn snapshot(&self) -> BTreeMap<String, CacheEntry> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

/// Reads and writes the cache file.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    max_age_days: u32,
    pretty: bool,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>, max_age_days: u32) -> Self {
        Self {
            path: path.into(),
            max_age_days,
            pretty: false,
        }
    }

    /// Indent the JSON written by [`CacheStore::save`].
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_age_days(&self) -> u32 {
        self.max_age_days
    }

    /// Read and parse the cache file.
    ///
    /// Fails only if the file is unreadable or not a JSON object. Entries that
    /// do not have the expected shape are dropped one by one.
    pub async fn try_load(&self) -> Result<Cache> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)?;

        let cache = Cache::new();
        for (full_name, value) in raw {
            match serde_json::from_value::<CacheEntry>(value) {
                Ok(entry) => cache.insert(&full_name, entry),
                Err(e) => info!(
                    "Cache for repository {} is outdated or invalid, removing it ({})",
                    full_name, e
                ),
            }
        }
        Ok(cache)
    }

    /// Load the cache and drop stale entries.
    ///
    /// Any failure to read the file yields an empty cache.
    pub async fn load(&self) -> Cache {
        match self.try_load().await {
            Ok(cache) => {
                let evicted = cache.evict_stale(self.max_age_days, Utc::now());
                debug!(
                    "Loaded {} cache entries from {:?} ({} evicted)",
                    cache.len(),
                    self.path,
                    evicted
                );
                cache
            }
            Err(e) => {
                info!("No usable cache file at {:?}, starting fresh: {}", self.path, e);
                Cache::new()
            }
        }
    }

    /// Serialize the whole cache and replace the file.
    pub async fn try_save(&self, cache: &Cache) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let snapshot = cache.snapshot();
        let json = if self.pretty {
            serde_json::to_string_pretty(&snapshot)?
        } else {
            serde_json::to_string(&snapshot)?
        };

        // Write next to the target then rename so readers never see a partial file
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Wrote {} cache entries to {:?}", cache.len(), self.path);
        Ok(())
    }

    /// Save the cache, logging instead of failing.
    pub async fn save(&self, cache: &Cache) {
        if let Err(e) = self.try_save(cache).await {
            error!("Failed to update cache at {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn days_ago(days: i64) -> DateTime<Utc> {
        Utc::now() - Duration::days(days)
    }

    #[test]
    fn test_insert_if_absent_keeps_first_entry() {
        let cache = Cache::new();
        assert!(cache.insert_if_absent("org/repo", CacheEntry::now(true)));
        assert!(!cache.insert_if_absent("org/repo", CacheEntry::now(false)));
        assert!(cache.is_known_dependent("org/repo"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_overwrites() {
        let cache = Cache::new();
        cache.insert("org/repo", CacheEntry::now(false));
        cache.insert("org/repo", CacheEntry::now(true));
        assert!(cache.is_known_dependent("org/repo"));
    }

    #[test]
    fn test_evict_stale() {
        let cache = Cache::new();
        cache.insert("org/fresh", CacheEntry::at(true, days_ago(10)));
        cache.insert("org/old", CacheEntry::at(true, days_ago(91)));
        cache.insert("org/negative-old", CacheEntry::at(false, days_ago(200)));
        cache.insert(
            "org/garbage",
            CacheEntry {
                depends_on: true,
                when: "not a date".to_string(),
            },
        );

        let evicted = cache.evict_stale(90, Utc::now());

        assert_eq!(evicted, 3);
        assert_eq!(cache.dependents(), vec!["org/fresh"]);
    }

    #[test]
    fn test_evict_stale_respects_max_age() {
        let cache = Cache::new();
        cache.insert("org/repo", CacheEntry::at(true, days_ago(2)));
        assert_eq!(cache.evict_stale(3, Utc::now()), 0);
        assert_eq!(cache.evict_stale(1, Utc::now()), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_dependents_are_sorted_and_exclude_negatives() {
        let cache = Cache::new();
        cache.insert("org/b", CacheEntry::now(true));
        cache.insert("org/c", CacheEntry::now(false));
        cache.insert("org/a", CacheEntry::now(true));
        assert_eq!(cache.dependents(), vec!["org/a", "org/b"]);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested/dir/cache.json"), 90);

        let cache = Cache::new();
        let positive = CacheEntry::at(true, days_ago(1));
        let negative = CacheEntry::at(false, days_ago(5));
        cache.insert("org/yes", positive.clone());
        cache.insert("org/no", negative.clone());

        store.try_save(&cache).await.unwrap();
        let reloaded = store.load().await;

        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("org/yes"), Some(positive));
        assert_eq!(reloaded.get("org/no"), Some(negative));
    }

    #[tokio::test]
    async fn test_load_evicts_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let store = CacheStore::new(&path, 90);

        let cache = Cache::new();
        cache.insert("org/recent", CacheEntry::now(true));
        cache.insert("org/ancient", CacheEntry::at(true, Utc.timestamp_opt(0, 0).unwrap()));
        store.try_save(&cache).await.unwrap();

        let reloaded = store.load().await;
        assert!(reloaded.get("org/recent").is_some());
        assert!(reloaded.get("org/ancient").is_none());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("absent.json"), 90);

        assert!(store.try_load().await.is_err());
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = CacheStore::new(&path, 90);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_drops_only_malformed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let fresh = CacheEntry::now(true);
        let content = serde_json::json!({
            "org/good": fresh,
            "org/no-when": { "dependsOn": true },
            "org/numeric-when": { "dependsOn": true, "when": 1700000000 },
            "org/legacy": true,
        });
        tokio::fs::write(&path, content.to_string()).await.unwrap();

        let reloaded = CacheStore::new(&path, 90).load().await;

        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("org/good"), Some(fresh));
    }

    #[tokio::test]
    async fn test_load_non_object_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, "[1, 2, 3]").await.unwrap();

        let store = CacheStore::new(&path, 90);
        assert!(store.try_load().await.is_err());
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_pretty_file_is_indented_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let store = CacheStore::new(&path, 90).with_pretty(true);

        let cache = Cache::new();
        cache.insert("org/b", CacheEntry::now(true));
        cache.insert("org/a", CacheEntry::now(false));
        store.try_save(&cache).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("\n  \"org/a\""));
        assert!(written.find("org/a") < written.find("org/b"));
        assert!(written.contains("\"dependsOn\": false"));
    }

    #[tokio::test]
    async fn test_save_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, "").await.unwrap();
        // The parent "directory" is a regular file
        let store = CacheStore::new(blocker.join("cache.json"), 90);
        store.save(&Cache::new()).await;
        assert!(store.try_save(&Cache::new()).await.is_err());
    }
}
