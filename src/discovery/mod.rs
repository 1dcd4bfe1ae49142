//! Repository and manifest discovery.
//!
//! This module handles:
//! - Finding candidate repositories (code search per scope, or organization listing)
//! - Locating manifest files in a repository tree
//! - Inspecting manifests for scoped dependencies

pub mod inspector;
pub mod manifests;
pub mod search;

pub use inspector::DependencyInspector;
pub use manifests::ManifestLocator;
pub use search::{RepositorySearcher, RepositorySource};
