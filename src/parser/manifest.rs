//! `package.json` decoding.

use crate::types::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::collections::HashMap;

/// The part of a `package.json` the finder looks at.
///
/// Missing or `null` dependency maps are treated as empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub dependencies: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub dev_dependencies: Option<HashMap<String, serde_json::Value>>,
}

impl PackageManifest {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Names declared in `devDependencies` and `dependencies`.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dev_dependencies
            .iter()
            .chain(self.dependencies.iter())
            .flat_map(|deps| deps.keys())
            .map(String::as_str)
    }
}

/// Decode base64 content as returned by the GitHub contents API.
///
/// GitHub wraps the encoded payload every 60 characters.
pub fn decode_content(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}
