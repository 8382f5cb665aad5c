//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stackgraph - plan and resolve declarative resource graphs.
#[derive(Parser, Debug)]
#[command(name = "stackgraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the settings file.
    #[arg(short, long, global = true, env = "STACKGRAPH_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter settings file and `.env.example`.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Load settings, declare the stack, and check that it plans.
    Validate,

    /// Build and display the execution plan.
    Plan {
        /// Show each resource's declared properties.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Resolve the plan against the simulated executor and print outputs.
    Up {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Print secret outputs in plaintext.
        #[arg(long)]
        show_secrets: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_up_with_globals() {
        let cli = Cli::try_parse_from([
            "stackgraph",
            "--output",
            "json",
            "up",
            "--yes",
            "--show-secrets",
            "--settings",
            "infra/stackgraph.yaml",
        ])
        .expect("parse");

        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.settings, Some(PathBuf::from("infra/stackgraph.yaml")));
        assert!(matches!(
            cli.command,
            Commands::Up { yes: true, show_secrets: true }
        ));
    }

    #[test]
    fn test_plan_defaults() {
        let cli = Cli::try_parse_from(["stackgraph", "plan"]).expect("parse");
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Plan { detailed: false }));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["stackgraph", "destroy"]).is_err());
    }
}
