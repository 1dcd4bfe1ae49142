//! Manifest parsing and dependency matching.
//!
//! Pure functions only, no network access:
//! - Decoding base64 file content returned by GitHub
//! - Parsing `package.json` dependency maps
//! - Matching dependency names against the configured scopes

pub mod manifest;
pub mod scope;

pub use manifest::{decode_content, PackageManifest};
pub use scope::ScopeMatcher;

/// Check if a scope name (without `@`) is a valid npm scope.
pub fn is_valid_scope(scope: &str) -> bool {
    if scope.is_empty() || scope.len() > 214 {
        return false;
    }

    // Must be lowercase and URL-safe
    scope
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' || c == '.')
        && !scope.starts_with('.')
}

/// Check if a tree path ends with `manifest_name`.
///
/// Plain suffix match: `tools/my-package.json` counts as a `package.json`.
pub fn is_manifest_path(path: &str, manifest_name: &str) -> bool {
    path.ends_with(manifest_name)
}
