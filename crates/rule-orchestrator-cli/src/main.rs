// crates/rule-orchestrator-cli/src/main.rs
// ============================================================================
// Module: Rule Orchestrator CLI Entry Point
// Description: Command dispatcher for hierarchy inspection and composition.
// Purpose: Run facade operations against a rule root and print JSON results.
// Dependencies: clap, rule-orchestrator, rule-orchestrator-config, serde_jcs
// ============================================================================

//! ## Overview
//! Each invocation loads configuration, initializes an [`Orchestrator`] over
//! the configured (or overridden) rule root, runs one operation, and prints
//! its result as canonical JSON on stdout. Errors go to stderr with a failure
//! exit code.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use rule_orchestrator::Orchestrator;
use rule_orchestrator_config::OrchestratorConfig;
use rule_orchestrator_core::RulePath;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rule-orchestrator", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (defaults to `RULE_ORCHESTRATOR_CONFIG` or
    /// `rule-orchestrator.toml`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Rule root override.
    #[arg(long, value_name = "DIR", global = true)]
    root: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Report component health, cache statistics, and the hierarchy summary.
    Info,
    /// Compose one rule with its inheritance chain.
    Compose {
        /// Rule path relative to the root.
        path: String,
        /// Print only the composed text instead of the full JSON result.
        #[arg(long)]
        content_only: bool,
    },
    /// Validate the hierarchy; exits non-zero when errors are found.
    Validate,
    /// Order the dependencies of one rule.
    Deps {
        /// Rule path relative to the root.
        path: String,
    },
    /// List reference cycles.
    Cycles,
    /// List rule files without parsing them.
    Catalog,
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the configuration file.
    Validate,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying the printed message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run(cli: Cli) -> CliResult<ExitCode> {
    let config = load_config(cli.config.as_deref(), cli.root.as_deref())?;
    match cli.command {
        Commands::Config {
            command: ConfigCommand::Validate,
        } => {
            write_stdout_line("config ok").map_err(|err| CliError::new(output_error(&err)))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Catalog => {
            let orchestrator = open(config)?;
            write_json(&orchestrator.catalog())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Info => {
            let mut orchestrator = open(config)?;
            let info = orchestrator.info().map_err(|err| failed("info", &err))?;
            write_json(&info)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Compose {
            path,
            content_only,
        } => {
            let mut orchestrator = open(config)?;
            let composed =
                orchestrator.compose(&RulePath::new(&path)).map_err(|err| failed("compose", &err))?;
            if content_only {
                write_stdout_line(&composed.result.content)
                    .map_err(|err| CliError::new(output_error(&err)))?;
            } else {
                write_json(&composed)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => {
            let mut orchestrator = open(config)?;
            let report =
                orchestrator.validate_hierarchy().map_err(|err| failed("validate", &err))?;
            write_json(&report)?;
            Ok(if report.valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Deps {
            path,
        } => {
            let mut orchestrator = open(config)?;
            let order = orchestrator
                .resolve_dependencies(&RulePath::new(&path))
                .map_err(|err| failed("deps", &err))?;
            write_json(&order)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Cycles => {
            let mut orchestrator = open(config)?;
            let cycles = orchestrator.detect_cycles().map_err(|err| failed("cycles", &err))?;
            write_json(&cycles)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Loads configuration and applies the `--root` override.
fn load_config(path: Option<&Path>, root: Option<&Path>) -> CliResult<OrchestratorConfig> {
    let mut config = OrchestratorConfig::load_or_default(path)
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    if let Some(root) = root {
        config.rules.root = root.to_path_buf();
    }
    config.validate().map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    Ok(config)
}

/// Initializes the orchestrator.
fn open(config: OrchestratorConfig) -> CliResult<Orchestrator> {
    Orchestrator::initialize(config).map_err(|err| failed("initialize", &err))
}

/// Formats a facade failure with its stable code.
fn failed(operation: &str, err: &rule_orchestrator::OrchestratorError) -> CliError {
    CliError::new(format!("{operation} failed [{}]: {err}", err.code()))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes canonical JSON to stdout with a trailing newline.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(format!("json encoding failed: {err}")))?;
    bytes.push(b'\n');
    let mut stdout = std::io::stdout();
    stdout.write_all(&bytes).map_err(|err| CliError::new(output_error(&err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output write failure.
fn output_error(error: &std::io::Error) -> String {
    format!("failed to write output: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
