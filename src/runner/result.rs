// src/runner/result.rs

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::stage::StageEntry;
use crate::types::{Provider, ResolvedCommand};

/// Why a run was skipped before touching the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    /// Target workspace missing at run time; expected and non-fatal.
    PathMissing,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => f.write_str("not run: project disabled"),
            SkipReason::PathMissing => f.write_str("not run: path missing"),
        }
    }
}

/// What a dry run would have done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunReport {
    pub command: ResolvedCommand,
    pub working_dir: PathBuf,
    pub staged: Vec<StageEntry>,
}

impl fmt::Display for DryRunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  cwd: {}", self.working_dir.display())?;
        writeln!(f, "  cmd: {}", self.command)?;
        if self.staged.is_empty() {
            write!(f, "  stage: (nothing)")
        } else {
            write!(f, "  stage:")?;
            for entry in &self.staged {
                write!(f, "\n    {entry}")?;
            }
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The provider ran; non-zero exit codes land here too.
    Completed { exit_code: i32 },
    Skipped(SkipReason),
    DryRun(DryRunReport),
}

/// Outcome of one job runner invocation. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub project: String,
    pub provider: Provider,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub status: RunStatus,
    /// Captured output; `None` when nothing was executed.
    pub log_path: Option<PathBuf>,
}

impl RunResult {
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            RunStatus::Completed { exit_code } => Some(exit_code),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, RunStatus::Skipped(_))
    }

    /// True for a zero exit code or a dry run.
    pub fn succeeded(&self) -> bool {
        match &self.status {
            RunStatus::Completed { exit_code } => *exit_code == 0,
            RunStatus::DryRun(_) => true,
            RunStatus::Skipped(_) => false,
        }
    }
}
