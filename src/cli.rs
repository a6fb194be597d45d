// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::ExecMode;

/// Command-line arguments for `bpm`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bpm",
    version,
    about = "Run named actions across the modules of a monorepo.",
    long_about = None
)]
pub struct CliArgs {
    /// Action (or action group) to run.
    #[arg(value_name = "ACTION", required_unless_present = "list")]
    pub action: Option<String>,

    /// Additional arguments passed to the action, if it accepts them.
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,

    /// Run the action only within this module.
    #[arg(short, long, value_name = "MODULE")]
    pub module: Option<String>,

    /// Run the watch variant of the action and keep it running.
    #[arg(short, long)]
    pub watch: bool,

    /// Path to the config file (TOML or YAML).
    ///
    /// Default: `BPM_CONFIG_PATH`, else `bpm.toml` / `bpm.yml` / `bpm.yaml`
    /// in the repository root.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Prefix every output line with `[module.action]`.
    #[arg(long)]
    pub prefix_output: bool,

    /// List modules and their actions, then exit.
    #[arg(long)]
    pub list: bool,

    /// Resolve and print what would run, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BPM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    pub fn mode(&self) -> ExecMode {
        if self.watch {
            ExecMode::Watch
        } else {
            ExecMode::Normal
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
