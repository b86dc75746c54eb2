// src/engine/repeat.rs

//! The per-fire repetition loop.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::ProjectConfig;
use crate::engine::ProjectRunner;
use crate::errors::display_chain;
use crate::runner::RunStatus;

/// Tally of one fire event's repetitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepetitionSummary {
    pub times: u32,
    /// Exit code 0.
    pub succeeded: u32,
    /// Ran, non-zero exit code.
    pub failed: u32,
    pub skipped: u32,
    /// Returned an error or panicked.
    pub errored: u32,
}

impl RepetitionSummary {
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.times
    }
}

/// Run `project` `schedule.times` times, strictly one after another.
///
/// Each repetition runs on its own Tokio task and is awaited before the next
/// one starts, so repetition *i + 1* never begins staging before *i* has
/// reverted. An error or panic in one repetition is logged and counted;
/// the remaining repetitions still run.
pub async fn run_repetitions(
    runner: Arc<dyn ProjectRunner>,
    project: Arc<ProjectConfig>,
) -> RepetitionSummary {
    let times = project.schedule.times.max(1);
    let mut summary = RepetitionSummary {
        times,
        ..Default::default()
    };

    info!(project = %project.name, times, "job triggered");

    for repetition in 1..=times {
        info!(project = %project.name, repetition, times, "running {repetition}/{times}");

        let worker = {
            let runner = Arc::clone(&runner);
            let project = Arc::clone(&project);
            tokio::spawn(async move { runner.run_once(&project).await })
        };

        match worker.await {
            Ok(Ok(result)) => match result.status {
                RunStatus::Completed { exit_code: 0 } | RunStatus::DryRun(_) => {
                    summary.succeeded += 1;
                }
                RunStatus::Completed { exit_code } => {
                    warn!(
                        project = %project.name,
                        repetition,
                        exit_code,
                        log = ?result.log_path,
                        "provider exited with non-zero status"
                    );
                    summary.failed += 1;
                }
                RunStatus::Skipped(reason) => {
                    info!(project = %project.name, repetition, %reason, "repetition skipped");
                    summary.skipped += 1;
                }
            },
            Ok(Err(err)) => {
                error!(
                    project = %project.name,
                    repetition,
                    error = %display_chain(&err),
                    "repetition failed"
                );
                summary.errored += 1;
            }
            Err(join_err) => {
                error!(
                    project = %project.name,
                    repetition,
                    error = %join_err,
                    "repetition panicked"
                );
                summary.errored += 1;
            }
        }

        info!(project = %project.name, repetition, times, "completed {repetition}/{times}");
    }

    if summary.all_succeeded() {
        info!(project = %project.name, "job finished successfully");
    } else {
        warn!(project = %project.name, ?summary, "job finished with failures");
    }
    summary
}
