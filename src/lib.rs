//! depfinder - Finds GitHub repositories depending on scoped npm packages.
//!
//! This library provides tools for listing the repositories that use a library by:
//! - Searching GitHub code for manifests mentioning the library scopes
//! - Locating every manifest in each candidate repository
//! - Checking manifest dependencies against the scopes
//! - Caching verdicts on disk so confirmed dependents are not rescanned
//!
//! # Example
//!
//! ```no_run
//! use depfinder::config::ScanConfig;
//! use depfinder::scanner::{ScanProgress, Scanner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScanConfig {
//!         scopes: vec!["o3r".to_string()],
//!         library_name: "Otter".to_string(),
//!         ..Default::default()
//!     };
//!     let scanner = Scanner::new(&config, "ghp_token", "https://api.github.com").unwrap();
//!     let progress = ScanProgress::new();
//!     scanner.run(&progress).await;
//!     println!("{} repositories use Otter", progress.len());
//! }
//! ```

pub mod cache;
pub mod config;
pub mod discovery;
pub mod github;
pub mod mcp;
pub mod notify;
pub mod parser;
pub mod scanner;
pub mod types;

pub use cache::{Cache, CacheStore};
pub use config::{Commands, Config, ScanCommand, ScanConfig, ServeConfig};
pub use scanner::{ScanHandle, ScanProgress, ScanSummary, Scanner};
pub use types::{CacheEntry, DepfinderError, HttpConfig, ManifestReference, Repository, Result};
