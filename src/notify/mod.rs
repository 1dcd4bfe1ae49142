//! Terminal output for the `scan` command.
//!
//! This module handles:
//! - Colored console output
//! - Progress spinner while the scan runs

pub mod console;

pub use console::ConsoleOutput;
