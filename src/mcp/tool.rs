//! The "repositories using a library" tool.

use super::types::{ToolAnnotations, ToolCallResult, ToolDefinition};
use crate::config::slugify;
use crate::scanner::ScanProgress;
use std::sync::Arc;

const IN_PROGRESS_PREFIX: &str = "I did not finish to look for repositories. For the moment:\n";

/// Exposes the live scan results as an MCP tool.
pub struct RepositoriesTool {
    name: String,
    title: String,
    description: String,
    library_name: String,
    progress: Arc<ScanProgress>,
}

impl RepositoriesTool {
    /// Create the tool with names derived from the library.
    pub fn new(
        library_name: &str,
        scopes: &[String],
        manifest_name: &str,
        progress: Arc<ScanProgress>,
    ) -> Self {
        let scope_list = scopes
            .iter()
            .map(|scope| format!("@{}", scope))
            .collect::<Vec<_>>()
            .join(" or ");

        Self {
            name: format!("get_repositories_using_{}", slugify(library_name, '_')),
            title: format!("Get repositories using {} dependencies", library_name),
            description: format!(
                "List all repositories that use {} dependencies ({}) in their {} files.",
                library_name, scope_list, manifest_name
            ),
            library_name: library_name.to_string(),
            progress,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        if let Some(name) = name {
            self.name = name;
        }
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        if let Some(title) = title {
            self.title = title;
        }
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        if let Some(description) = description {
            self.description = description;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
            output_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "repositories": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": format!("List of repositories depending on {}", self.library_name)
                    }
                },
                "required": ["repositories"]
            }),
            annotations: ToolAnnotations {
                read_only_hint: true,
                open_world_hint: false,
            },
        }
    }

    /// Answer with whatever the scan has found so far.
    pub fn call(&self) -> ToolCallResult {
        let repositories = self.progress.repositories();
        let text = summary_text(&self.library_name, &repositories, self.progress.is_finished());
        ToolCallResult::success(text, serde_json::json!({ "repositories": repositories }))
    }
}

/// Human readable list of dependents, sorted.
pub fn summary_text(library_name: &str, repositories: &[String], finished: bool) -> String {
    let mut text = String::new();
    if !finished {
        text.push_str(IN_PROGRESS_PREFIX);
    }

    if repositories.is_empty() {
        text.push_str(&format!("No repositories found using {} dependencies.", library_name));
        return text;
    }

    let mut sorted = repositories.to_vec();
    sorted.sort();
    text.push_str(&format!("The following repositories use {} dependencies:\n", library_name));
    text.push_str(
        &sorted
            .iter()
            .map(|repo| format!("- {}", repo))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(progress: Arc<ScanProgress>) -> RepositoriesTool {
        RepositoriesTool::new(
            "TestAmaMcpLibrary",
            &["ama-mcp".to_string(), "scope".to_string()],
            "package.json",
            progress,
        )
    }

    #[test]
    fn test_default_naming() {
        let tool = tool(Arc::new(ScanProgress::new()));
        let definition = tool.definition();
        assert_eq!(definition.name, "get_repositories_using_testamamcplibrary");
        assert_eq!(definition.title, "Get repositories using TestAmaMcpLibrary dependencies");
        assert_eq!(
            definition.description,
            "List all repositories that use TestAmaMcpLibrary dependencies (@ama-mcp or @scope) in their package.json files."
        );
        assert!(definition.annotations.read_only_hint);
    }

    #[test]
    fn test_overrides() {
        let tool = tool(Arc::new(ScanProgress::new()))
            .with_name(Some("custom".to_string()))
            .with_title(None);
        assert_eq!(tool.name(), "custom");
        assert_eq!(tool.definition().title, "Get repositories using TestAmaMcpLibrary dependencies");
    }

    #[test]
    fn test_summary_text_sorted() {
        let repos = vec!["testOrg/repoCached".to_string(), "testOrg/repo1".to_string()];
        assert_eq!(
            summary_text("TestAmaMcpLibrary", &repos, true),
            "The following repositories use TestAmaMcpLibrary dependencies:\n- testOrg/repo1\n- testOrg/repoCached"
        );
    }

    #[test]
    fn test_summary_text_in_progress_and_empty() {
        assert_eq!(
            summary_text("Otter", &[], false),
            "I did not finish to look for repositories. For the moment:\nNo repositories found using Otter dependencies."
        );
        assert_eq!(
            summary_text("Otter", &[], true),
            "No repositories found using Otter dependencies."
        );
    }

    #[test]
    fn test_call_keeps_insertion_order_in_structured_content() {
        let progress = Arc::new(ScanProgress::new());
        progress.push("org/b");
        progress.push("org/a");

        let result = tool(progress).call();

        assert_eq!(
            result.structured_content,
            Some(serde_json::json!({ "repositories": ["org/b", "org/a"] }))
        );
        assert!(result.content[0].text.starts_with(IN_PROGRESS_PREFIX));
        assert!(result.content[0].text.ends_with("- org/a\n- org/b"));
    }
}
