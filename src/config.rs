//! Configuration handling for the finder.

use crate::parser::is_valid_scope;
use crate::types::{DepfinderError, HttpConfig, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

/// GitHub code search allows ten queries per minute.
pub const MAX_RECOMMENDED_SCOPES: usize = 10;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_MANIFEST_NAME: &str = "package.json";
pub const DEFAULT_CACHE_MAX_AGE_DAYS: u32 = 90;

/// Finds GitHub repositories depending on scoped packages.
#[derive(Parser, Debug, Clone)]
#[command(name = "depfinder")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// GitHub token used for every API call
    #[arg(long, env = "DEPFINDER_GITHUB_TOKEN", global = true, hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "DEPFINDER_GITHUB_API_URL", global = true, default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

impl Config {
    /// Token from the command line or `DEPFINDER_GITHUB_TOKEN`, then `GITHUB_TOKEN`.
    pub fn token(&self) -> Option<String> {
        self.github_token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|token| !token.trim().is_empty())
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Scan GitHub and print the repositories depending on the library
    Scan(ScanCommand),
    /// Serve the repositories tool over MCP (JSON-RPC on stdio)
    Serve(ServeConfig),
}

/// Configuration for the scan command.
#[derive(Args, Debug, Clone)]
pub struct ScanCommand {
    #[command(flatten)]
    pub scan: ScanConfig,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Output file path for the JSON results (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Configuration for the serve command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    #[command(flatten)]
    pub scan: ScanConfig,

    /// Tool name (defaults to get_repositories_using_<library>)
    #[arg(long)]
    pub tool_name: Option<String>,

    /// Tool title
    #[arg(long)]
    pub tool_title: Option<String>,

    /// Tool description
    #[arg(long)]
    pub tool_description: Option<String>,
}

/// Options shared by every command that runs a scan.
#[derive(Args, Debug, Clone)]
pub struct ScanConfig {
    /// Package scopes to look for, without the leading @ (e.g. o3r,ama-sdk)
    #[arg(long = "scope", env = "DEPFINDER_SCOPES", value_delimiter = ',', required = true)]
    pub scopes: Vec<String>,

    /// Human readable name of the library (e.g. Otter)
    #[arg(long = "library", env = "DEPFINDER_LIBRARY_NAME")]
    pub library_name: String,

    /// List the repositories of this organization instead of using code search
    #[arg(long, env = "DEPFINDER_GITHUB_ORG")]
    pub org: Option<String>,

    /// Manifest file name to inspect
    #[arg(long, env = "DEPFINDER_MANIFEST_NAME", default_value = DEFAULT_MANIFEST_NAME)]
    pub manifest_name: String,

    /// Results per page for paginated GitHub queries
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub per_page: u8,

    /// Path of the cache file
    #[arg(long, env = "DEPFINDER_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    /// Maximum age in days of a cached repository verdict
    #[arg(
        long,
        env = "DEPFINDER_CACHE_MAX_AGE",
        default_value = "90",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub cache_max_age: u32,

    /// Do not read nor write the cache file
    #[arg(long, env = "DEPFINDER_DISABLE_CACHE")]
    pub disable_cache: bool,

    /// Indent the cache file when writing it
    #[arg(long)]
    pub pretty_cache: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Maximum retries for failed requests
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Rate limit (requests per second)
    #[arg(long, default_value = "10")]
    pub rate_limit: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scopes: Vec::new(),
            library_name: String::new(),
            org: None,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            per_page: 100,
            cache_path: None,
            cache_max_age: DEFAULT_CACHE_MAX_AGE_DAYS,
            disable_cache: false,
            pretty_cache: false,
            timeout: 30,
            max_retries: 3,
            rate_limit: 10,
        }
    }
}

impl ScanConfig {
    /// Get HTTP configuration from scan config.
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout_secs: self.timeout,
            max_retries: self.max_retries,
            ..HttpConfig::default()
        }
    }

    /// Scopes without their `@` prefix or `/` suffix, empties removed.
    pub fn normalized_scopes(&self) -> Result<Vec<String>> {
        let mut scopes: Vec<String> = Vec::new();
        for scope in &self.scopes {
            let scope = scope.trim().trim_start_matches('@').trim_end_matches('/');
            if !scope.is_empty() && !scopes.iter().any(|s| s == scope) {
                scopes.push(scope.to_string());
            }
        }

        if scopes.is_empty() {
            return Err(DepfinderError::ConfigError(
                "at least one package scope is required".to_string(),
            ));
        }

        Ok(scopes)
    }

    /// Check the options that clap cannot validate on its own.
    ///
    /// Returns the normalized scopes and warns once about suspicious ones.
    pub fn validate(&self) -> Result<Vec<String>> {
        if self.library_name.trim().is_empty() {
            return Err(DepfinderError::ConfigError(
                "library name must not be empty".to_string(),
            ));
        }
        if self.manifest_name.trim().is_empty() || self.manifest_name.contains('/') {
            return Err(DepfinderError::ConfigError(format!(
                "invalid manifest file name: {:?}",
                self.manifest_name
            )));
        }

        let scopes = self.normalized_scopes()?;
        for scope in scopes.iter().filter(|scope| !is_valid_scope(scope)) {
            warn!("Scope @{} does not look like a valid npm scope", scope);
        }
        if self.org.is_none() && scopes.len() > MAX_RECOMMENDED_SCOPES {
            warn!(
                "{} scopes configured, GitHub code search only allows {} queries per minute",
                scopes.len(),
                MAX_RECOMMENDED_SCOPES
            );
        }

        Ok(scopes)
    }

    /// Cache file location, derived from the library name when not configured.
    pub fn resolved_cache_path(&self) -> PathBuf {
        if let Some(ref path) = self.cache_path {
            return path.clone();
        }

        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        base.join("depfinder").join(format!(
            "repos-using-{}.json",
            slugify(&self.library_name, '-')
        ))
    }
}

/// Lowercase the name and replace whitespace runs with `separator`.
pub fn slugify(name: &str, separator: char) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_scopes(scopes: &[&str]) -> ScanConfig {
        ScanConfig {
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            library_name: "Otter".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalized_scopes() {
        let config = config_with_scopes(&["@o3r", "ama-sdk/", " o3r ", ""]);
        assert_eq!(config.normalized_scopes().unwrap(), vec!["o3r", "ama-sdk"]);
    }

    #[test]
    fn test_normalized_scopes_requires_one() {
        let config = config_with_scopes(&["@", " "]);
        assert!(config.normalized_scopes().is_err());
    }

    #[test]
    fn test_validate_rejects_nested_manifest_name() {
        let mut config = config_with_scopes(&["o3r"]);
        assert_eq!(config.validate().unwrap(), vec!["o3r"]);
        config.manifest_name = "sub/package.json".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_returns_normalized_scopes() {
        let config = config_with_scopes(&["@o3r/", "Not Valid", "o3r"]);
        assert_eq!(config.validate().unwrap(), vec!["o3r", "Not Valid"]);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My  Great Library", '-'), "my-great-library");
        assert_eq!(slugify("Otter", '_'), "otter");
    }

    #[test]
    fn test_resolved_cache_path() {
        let mut config = config_with_scopes(&["o3r"]);
        config.library_name = "Test Library".to_string();
        let path = config.resolved_cache_path();
        assert!(path.ends_with("depfinder/repos-using-test-library.json"));

        config.cache_path = Some(PathBuf::from("/tmp/custom.json"));
        assert_eq!(config.resolved_cache_path(), PathBuf::from("/tmp/custom.json"));
    }

    #[test]
    fn test_cli_parsing() {
        let config = Config::try_parse_from([
            "depfinder",
            "scan",
            "--scope",
            "o3r,ama-sdk",
            "--library",
            "Otter",
            "--disable-cache",
        ])
        .unwrap();

        match config.command {
            Commands::Scan(cmd) => {
                assert_eq!(cmd.scan.scopes, vec!["o3r", "ama-sdk"]);
                assert!(cmd.scan.disable_cache);
                assert_eq!(cmd.scan.cache_max_age, 90);
                assert_eq!(cmd.scan.manifest_name, "package.json");
            }
            Commands::Serve(_) => panic!("Expected scan command"),
        }
    }

    #[test]
    fn test_cli_rejects_zero_max_age() {
        let parsed = Config::try_parse_from([
            "depfinder",
            "scan",
            "--scope",
            "o3r",
            "--library",
            "Otter",
            "--cache-max-age",
            "0",
        ]);
        assert!(parsed.is_err());
    }
}
