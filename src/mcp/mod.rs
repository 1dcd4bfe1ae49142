//! MCP (Model Context Protocol) Server Module
//!
//! Exposes the scan results as an MCP tool for AI agents.
//! Uses JSON-RPC 2.0 over stdio transport.
//!
//! ## Tools
//!
//! - `get_repositories_using_<library>` - List the repositories depending on the library

mod server;
mod tool;
mod types;

pub use server::McpServer;
pub use tool::{summary_text, RepositoriesTool};
pub use types::*;
