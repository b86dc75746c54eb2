// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_projects_dir;
use crate::types::SchedulerTimezone;

/// Command-line arguments for `agentplane`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "agentplane",
    version,
    about = "Run AI agent CLIs against project workspaces on a cron schedule.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory holding one sub-directory per project.
    #[arg(long, global = true, value_name = "DIR", default_value_os_t = default_projects_dir())]
    pub projects_dir: PathBuf,

    /// Directory receiving one log file per provider run.
    #[arg(long, global = true, value_name = "DIR", default_value = "logs")]
    pub logs_dir: PathBuf,

    /// Timezone cron expressions are evaluated in.
    #[arg(long, global = true, value_enum, default_value_t = SchedulerTimezone::Local)]
    pub timezone: SchedulerTimezone,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `AGENTPLANE_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List configured projects.
    List,

    /// Run projects once, now.
    Run {
        /// Run only this project (default: every enabled project).
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Print what would be staged and executed without doing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check every project configuration and report all problems.
    Validate,

    /// Start the scheduler and run until interrupted.
    Schedule,
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
