// src/engine/mod.rs

//! Scheduling engine for agentplane.
//!
//! This module ties together:
//! - cron parsing ([`trigger`])
//! - the pure slot bookkeeping that decides what fires when ([`core`])
//! - the per-fire repetition loop ([`repeat`])
//! - the async dispatcher that reacts to:
//!   - timer wake-ups
//!   - finished repetition loops
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tracing::{info, warn};

use crate::config::ProjectConfig;
use crate::errors::Result;
use crate::runner::RunResult;
use crate::types::SchedulerTimezone;

pub mod core;
pub mod repeat;
pub mod runtime;
pub mod trigger;

pub use self::core::{CoreCommand, Exclusion, SchedulerCore};
pub use self::repeat::{run_repetitions, RepetitionSummary};
pub use self::runtime::{SchedulerRuntime, ShutdownHandle};
pub use self::trigger::parse_cron;

/// Runs one project once. The scheduler's only view of the job runner.
pub trait ProjectRunner: Send + Sync + 'static {
    fn run_once<'a>(
        &'a self,
        project: &'a ProjectConfig,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>>;
}

/// Events flowing into the dispatcher from workers and signal handlers.
#[derive(Debug)]
pub enum SchedulerEvent {
    /// A project's repetition loop returned (or its worker panicked).
    LoopFinished {
        project: String,
        summary: RepetitionSummary,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Optional observer of scheduler activity. All methods default to no-ops.
pub trait SchedulerListener: Send + Sync {
    fn job_started(&self, _project: &str) {}
    fn job_missed(&self, _project: &str, _scheduled_for: DateTime<Utc>) {}
    fn job_finished(&self, _project: &str, _summary: &RepetitionSummary) {}
}

/// Schedule every enabled project with a cron expression and block until
/// Ctrl-C or SIGTERM.
///
/// Returns immediately when nothing is schedulable.
pub async fn start(
    projects: &[ProjectConfig],
    runner: Arc<dyn ProjectRunner>,
    timezone: SchedulerTimezone,
) -> Result<()> {
    let core = SchedulerCore::new(projects, timezone, Utc::now());
    if core.is_empty() {
        info!("no scheduled jobs found; exiting");
        return Ok(());
    }

    print_banner(&core);

    let runtime = SchedulerRuntime::new(core, runner);
    let shutdown = runtime.shutdown_handle();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.request();
    });

    runtime.run().await
}

fn print_banner(core: &SchedulerCore) {
    println!(
        "agentplane scheduler started at {} ({})",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        core.timezone().describe()
    );
    for name in core.job_names() {
        let Some(project) = core.project(name) else {
            continue;
        };
        let next = match core.next_fire_of(name) {
            Some(at) => core.timezone().format(at),
            None => "never".to_string(),
        };
        println!(
            "  {name}: cron '{}' x{} (next run: {next})",
            project.schedule.cron.as_deref().unwrap_or("-"),
            project.schedule.times
        );
    }
    println!("Press Ctrl+C to stop.");
}

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it.
pub(crate) async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(e) = res {
                            warn!(error = %e, "failed to listen for Ctrl+C");
                        }
                    }
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "failed to listen for SIGTERM"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
