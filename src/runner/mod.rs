// src/runner/mod.rs

//! One execution of one project.
//!
//! Each call to [`JobRunner::run`] walks a fixed sequence of phases:
//!
//! ```text
//! Idle -> PathCheck -> Staging -> Executing -> Reverting -> Done
//!             |            |
//!             |            +--> Done (dry run: plan reported, nothing touched)
//!             +--> Done (skipped: disabled or path missing)
//! ```
//!
//! Any phase may end in an error. Once staging has succeeded the workspace
//! is owned by a [`StagedWorkspace`](crate::stage::StagedWorkspace) guard,
//! so reverting happens on every exit path.

pub mod prompt;
pub mod result;

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::config::ProjectConfig;
use crate::engine::ProjectRunner;
use crate::errors::Result;
use crate::exec::{Invocation, ProcessBackend};
use crate::fs::FileSystem;
use crate::stage::{discover_instruction_files, FileStager, StagingPlan};

pub use prompt::{render_prompt, render_template, PROMPT_TEMPLATE_FILE};
pub use result::{DryRunReport, RunResult, RunStatus, SkipReason};

/// Phases of a single run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    PathCheck,
    Staging,
    Executing,
    Reverting,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Idle => "idle",
            RunPhase::PathCheck => "path-check",
            RunPhase::Staging => "staging",
            RunPhase::Executing => "executing",
            RunPhase::Reverting => "reverting",
            RunPhase::Done => "done",
        };
        f.write_str(s)
    }
}

struct PhaseTracker<'a> {
    project: &'a str,
    phase: RunPhase,
}

impl<'a> PhaseTracker<'a> {
    fn new(project: &'a str) -> Self {
        Self {
            project,
            phase: RunPhase::Idle,
        }
    }

    fn enter(&mut self, next: RunPhase) {
        debug!(project = %self.project, from = %self.phase, to = %next, "run phase");
        self.phase = next;
    }
}

/// Orchestrates path check, staging, execution and revert for a project.
pub struct JobRunner {
    fs: Arc<dyn FileSystem>,
    backend: Arc<dyn ProcessBackend>,
    stager: FileStager,
    logs_dir: PathBuf,
}

impl fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRunner")
            .field("stager", &self.stager)
            .field("logs_dir", &self.logs_dir)
            .finish_non_exhaustive()
    }
}

impl JobRunner {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        backend: Arc<dyn ProcessBackend>,
        stager: FileStager,
        logs_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fs,
            backend,
            stager,
            logs_dir: logs_dir.into(),
        }
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Run `project` once.
    ///
    /// Returns `Ok` for skipped runs and for non-zero exit codes; `Err` only
    /// for staging failures (after rollback), revert failures, template
    /// errors and failures to spawn the provider.
    pub async fn run(&self, project: &ProjectConfig, dry_run: bool) -> Result<RunResult> {
        let started_at = Local::now();
        let mut phase = PhaseTracker::new(&project.name);

        phase.enter(RunPhase::PathCheck);
        if !project.enabled {
            debug!(project = %project.name, "project disabled; not running");
            return Ok(self.finish(project, started_at, RunStatus::Skipped(SkipReason::Disabled), None));
        }
        if !self.fs.is_dir(&project.path) {
            warn!(
                project = %project.name,
                path = ?project.path,
                "target path not found; skipping run"
            );
            return Ok(self.finish(
                project,
                started_at,
                RunStatus::Skipped(SkipReason::PathMissing),
                None,
            ));
        }

        phase.enter(RunPhase::Staging);
        let prompt = render_prompt(self.fs.as_ref(), project)?;
        let files = discover_instruction_files(self.fs.as_ref(), &project.source_dir)?;
        let plan = StagingPlan::build(&project.path, &files);
        let command = project.provider.command_template().render(&prompt);

        if dry_run {
            let report = DryRunReport {
                command,
                working_dir: project.path.clone(),
                staged: plan.entries().to_vec(),
            };
            phase.enter(RunPhase::Done);
            return Ok(self.finish(project, started_at, RunStatus::DryRun(report), None));
        }

        let staged = self.stager.stage(&plan)?;

        phase.enter(RunPhase::Executing);
        let log_path = log_file_path(&self.logs_dir, project, Local::now());
        info!(
            project = %project.name,
            provider = %project.provider,
            staged = plan.len(),
            log = ?log_path,
            "running provider"
        );
        let invocation = Invocation {
            project: project.name.clone(),
            command,
            working_dir: project.path.clone(),
            log_path: log_path.clone(),
        };
        let executed = self.backend.execute(&invocation).await;

        phase.enter(RunPhase::Reverting);
        let reverted = staged.revert();

        phase.enter(RunPhase::Done);
        let outcome = match (executed, reverted) {
            (Ok(outcome), Ok(())) => outcome,
            (Ok(outcome), Err(revert_err)) => {
                error!(
                    project = %project.name,
                    exit_code = outcome.exit_code,
                    error = %revert_err,
                    "provider finished but workspace revert failed"
                );
                return Err(revert_err);
            }
            (Err(exec_err), reverted) => {
                if let Err(revert_err) = reverted {
                    error!(project = %project.name, error = %revert_err, "workspace revert failed");
                }
                return Err(exec_err);
            }
        };

        info!(
            project = %project.name,
            exit_code = outcome.exit_code,
            log = ?log_path,
            "run finished"
        );
        Ok(self.finish(
            project,
            started_at,
            RunStatus::Completed {
                exit_code: outcome.exit_code,
            },
            Some(log_path),
        ))
    }

    fn finish(
        &self,
        project: &ProjectConfig,
        started_at: DateTime<Local>,
        status: RunStatus,
        log_path: Option<PathBuf>,
    ) -> RunResult {
        RunResult {
            project: project.name.clone(),
            provider: project.provider,
            started_at,
            finished_at: Local::now(),
            status,
            log_path,
        }
    }
}

impl ProjectRunner for JobRunner {
    fn run_once<'a>(
        &'a self,
        project: &'a ProjectConfig,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        Box::pin(self.run(project, false))
    }
}

/// `<logs_dir>/<name>_<provider>_<YYYYMMDD_HHMMSS_mmm>.log`
///
/// Milliseconds keep back-to-back repetitions from sharing a file.
pub fn log_file_path(logs_dir: &Path, project: &ProjectConfig, at: DateTime<Local>) -> PathBuf {
    let safe_name: String = project
        .name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    logs_dir.join(format!(
        "{}_{}_{}.log",
        safe_name,
        project.provider,
        at.format("%Y%m%d_%H%M%S_%3f")
    ))
}
