//! Stackgraph CLI entrypoint.
//!
//! Plans and resolves the built-in Azure web stack against the simulated
//! executor.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use stackgraph::cli::{Cli, Commands, OutputFormatter};
use stackgraph::config::{SettingsParser, StackSettings, find_settings_file};
use stackgraph::error::{ConfigError, Result, StackError};
use stackgraph::graph::ResourceGraph;
use stackgraph::provider::SimulatedExecutor;
use stackgraph::stacks::AzureWebStack;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate => cmd_validate(cli.settings.as_deref(), &formatter),
        Commands::Plan { detailed } => cmd_plan(cli.settings.as_deref(), detailed, &formatter),
        Commands::Up { yes, show_secrets } => {
            cmd_up(cli.settings.as_deref(), yes, show_secrets, &formatter).await
        }
    }
}

/// Writes a starter settings file and `.env.example`.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing stack settings in: {}", path.display());

    let settings_path = path.join("stackgraph.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && settings_path.exists() {
        eprintln!("Settings file already exists: {}", settings_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&settings_path, include_str!("../templates/stackgraph.yaml"))?;
    eprintln!("Created: {}", settings_path.display());

    std::fs::write(&env_path, include_str!("../templates/.env.example"))?;
    eprintln!("Created: {}", env_path.display());

    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.lines().any(|line| line.trim() == ".env") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# stackgraph\n.env")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nNext steps:");
    eprintln!("  1. Copy .env.example to .env and set the admin passwords");
    eprintln!("  2. Set sqlServerName in stackgraph.yaml");
    eprintln!("  3. Run 'stackgraph validate', then 'stackgraph plan'");

    Ok(())
}

/// Loads settings, declares the stack, and builds the plan.
fn cmd_validate(settings_path: Option<&Path>, formatter: &OutputFormatter) -> Result<()> {
    let settings = load_settings(settings_path)?;
    let (graph, _) = AzureWebStack::build(&settings)?;
    let plan = graph.build_plan()?;

    emit(&formatter.format_validation(&plan, settings.len()))
}

/// Shows the execution plan.
fn cmd_plan(
    settings_path: Option<&Path>,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let graph = declare_stack(settings_path)?;
    let plan = graph.build_plan()?;

    emit(&formatter.format_plan(&plan, detailed))
}

/// Resolves the plan against the simulated executor.
async fn cmd_up(
    settings_path: Option<&Path>,
    auto_approve: bool,
    show_secrets: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let graph = declare_stack(settings_path)?;
    let plan = graph.build_plan()?;

    if plan.is_empty() {
        eprintln!("Nothing to do.");
        return Ok(());
    }

    eprintln!("{}", formatter.format_plan(&plan, false));

    if !auto_approve {
        eprint!("Do you want to resolve this plan? [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Cancelled.");
            return Ok(());
        }
    }

    let executor = SimulatedExecutor::new();
    let outputs = graph.resolve(&plan, &executor).await?;

    if show_secrets {
        warn!("Printing secret outputs in plaintext");
    }
    emit(&formatter.format_outputs(&outputs, show_secrets))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Loads settings and declares the stack into a fresh graph.
fn declare_stack(settings_path: Option<&Path>) -> Result<ResourceGraph> {
    let settings = load_settings(settings_path)?;
    let (graph, _) = AzureWebStack::build(&settings)?;
    Ok(graph)
}

/// Loads settings from the given or discovered file, plus the environment.
///
/// Without an explicit path and with no file found, settings come from the
/// environment alone.
fn load_settings(settings_path: Option<&Path>) -> Result<StackSettings> {
    let settings_file = match settings_path {
        Some(path) => Some(path.to_path_buf()),
        None => match find_settings_file(".") {
            Ok(path) => Some(path),
            Err(StackError::Config(ConfigError::FileNotFound { .. })) => None,
            Err(e) => return Err(e),
        },
    };

    let base_dir = settings_file
        .as_deref()
        .and_then(Path::parent)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let parser = SettingsParser::new().with_base_path(base_dir);
    parser.load_dotenv()?;

    let Some(settings_file) = settings_file else {
        warn!("No settings file found; reading settings from the environment only");
        let mut settings = StackSettings::new();
        SettingsParser::apply_env_overrides(&mut settings, AzureWebStack::SETTINGS);
        return Ok(settings);
    };

    debug!("Loading settings from: {}", settings_file.display());
    parser.load_with_env(&settings_file, AzureWebStack::SETTINGS)
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}
