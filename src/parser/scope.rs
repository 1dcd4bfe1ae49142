//! Dependency name matching against configured scopes.

use crate::types::Result;
use regex::Regex;

/// Matches package names belonging to any of the configured scopes.
///
/// Built once per scan as `^@(?:scope1|scope2|...)/`, each scope escaped.
#[derive(Debug, Clone)]
pub struct ScopeMatcher {
    regex: Regex,
}

impl ScopeMatcher {
    /// Build a matcher for scopes given without their leading `@`.
    pub fn new<S: AsRef<str>>(scopes: &[S]) -> Result<Self> {
        let alternatives = scopes
            .iter()
            .map(|scope| regex::escape(scope.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!("^@(?:{})/", alternatives))?;
        Ok(Self { regex })
    }

    /// True if `package_name` belongs to one of the scopes.
    pub fn is_match(&self, package_name: &str) -> bool {
        self.regex.is_match(package_name)
    }

    /// True if any of the names belongs to one of the scopes.
    pub fn any_match<'a, I>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().any(|name| self.is_match(name))
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
