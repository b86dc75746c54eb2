// src/types.rs

//! Small shared value types: providers, their command templates, and the
//! timezone the scheduler evaluates cron expressions in.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use cron::Schedule;

/// Placeholder token substituted with the rendered prompt.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Supported external agent CLIs.
///
/// This is a closed set: anything else is rejected when the config is
/// validated or converted, never at dispatch time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
    #[default]
    Claude,
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Claude, Provider::Gemini];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
        }
    }

    /// Immutable argument-vector template for this provider.
    pub fn command_template(self) -> CommandTemplate {
        match self {
            Provider::Claude => CommandTemplate::new(
                "claude",
                &[
                    "-p",
                    PROMPT_PLACEHOLDER,
                    "--dangerously-skip-permissions",
                    "--model",
                    "sonnet",
                ],
            ),
            Provider::Gemini => CommandTemplate::new(
                "gemini",
                &[
                    "-p",
                    PROMPT_PLACEHOLDER,
                    "--model",
                    "gemini-3-pro-preview",
                    "--yolo",
                ],
            ),
        }
    }

    /// Comma-separated list of accepted identifiers, for error messages.
    pub fn expected_list() -> String {
        Provider::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" => Ok(Provider::Claude),
            "gemini" => Ok(Provider::Gemini),
            other => Err(format!(
                "invalid provider '{other}' (expected one of: {})",
                Provider::expected_list()
            )),
        }
    }
}

/// Program plus argument vector, with `{prompt}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Substitute the prompt into every argument.
    ///
    /// The prompt is inserted verbatim: arguments are handed to the OS as a
    /// vector, so no quoting or escaping is involved.
    pub fn render(&self, prompt: &str) -> ResolvedCommand {
        ResolvedCommand {
            program: self.program.clone(),
            args: self
                .args
                .iter()
                .map(|a| a.replace(PROMPT_PLACEHOLDER, prompt))
                .collect(),
        }
    }
}

/// A fully substituted command line, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for ResolvedCommand {
    /// Human-readable rendering for dry-run output. Display only; the
    /// command is never re-parsed from this string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                write!(f, " '{}'", arg.replace('\'', "'\\''"))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Timezone used to evaluate cron expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SchedulerTimezone {
    /// The host's local timezone.
    #[default]
    Local,
    Utc,
}

impl SchedulerTimezone {
    /// First fire time of `schedule` strictly after `now`.
    pub fn next_after(self, schedule: &Schedule, now: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            SchedulerTimezone::Local => schedule
                .after(&now.with_timezone(&chrono::Local))
                .next()
                .map(|t| t.with_timezone(&Utc)),
            SchedulerTimezone::Utc => schedule.after(now).next(),
        }
    }

    /// Human-readable name for the startup banner.
    pub fn describe(self) -> String {
        match self {
            SchedulerTimezone::Local => {
                format!("local (UTC{})", chrono::Local::now().format("%:z"))
            }
            SchedulerTimezone::Utc => "UTC".to_string(),
        }
    }

    /// `YYYY-MM-DD HH:MM:SS` in this timezone.
    pub fn format(self, at: DateTime<Utc>) -> String {
        const FMT: &str = "%Y-%m-%d %H:%M:%S";
        match self {
            SchedulerTimezone::Local => at.with_timezone(&chrono::Local).format(FMT).to_string(),
            SchedulerTimezone::Utc => format!("{} UTC", at.format(FMT)),
        }
    }
}
