//! CLI module for the stackgraph tool.
//!
//! This module provides the command-line interface for planning and
//! resolving the built-in stack.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
