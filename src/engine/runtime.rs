// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::core::{CoreCommand, SchedulerCore};
use crate::engine::repeat::{run_repetitions, RepetitionSummary};
use crate::engine::{ProjectRunner, SchedulerEvent, SchedulerListener};
use crate::errors::Result;

/// Cloneable handle that asks a running [`SchedulerRuntime`] to stop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: mpsc::UnboundedSender<SchedulerEvent>,
}

impl ShutdownHandle {
    /// Stop issuing new fires. In-flight loops still run to completion.
    pub fn request(&self) {
        let _ = self.tx.send(SchedulerEvent::ShutdownRequested);
    }
}

/// Timer-driven dispatcher around [`SchedulerCore`].
///
/// This is the async IO shell: it sleeps until the core's next wake-up,
/// feeds ticks and loop completions into the core, and runs each
/// `StartLoop` on its own Tokio task. Per-project single-flight is enforced
/// by the core; this shell only reports loop completion back to it.
pub struct SchedulerRuntime {
    core: SchedulerCore,
    runner: Arc<dyn ProjectRunner>,
    listener: Option<Arc<dyn SchedulerListener>>,
    event_tx: mpsc::UnboundedSender<SchedulerEvent>,
    event_rx: mpsc::UnboundedReceiver<SchedulerEvent>,
    active: HashMap<String, JoinHandle<()>>,
}

impl fmt::Debug for SchedulerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerRuntime")
            .field("core", &self.core)
            .field("active", &self.active.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SchedulerRuntime {
    pub fn new(core: SchedulerCore, runner: Arc<dyn ProjectRunner>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            core,
            runner,
            listener: None,
            event_tx,
            event_rx,
            active: HashMap::new(),
        }
    }

    /// Observe fires, misses and finished loops.
    pub fn with_listener(mut self, listener: Arc<dyn SchedulerListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.event_tx.clone(),
        }
    }

    /// Main dispatcher loop. Returns after a shutdown request once every
    /// in-flight repetition loop has finished.
    pub async fn run(mut self) -> Result<()> {
        info!(jobs = self.core.len(), "scheduler started; waiting for jobs");

        loop {
            let wait = self
                .core
                .next_wakeup()
                .map(|at| (at - Utc::now()).to_std().unwrap_or(Duration::ZERO));

            tokio::select! {
                _ = sleep_or_forever(wait) => {
                    for command in self.core.on_tick(Utc::now()) {
                        self.execute_command(command);
                    }
                }
                event = self.event_rx.recv() => {
                    debug!(?event, "scheduler received event");
                    match event {
                        Some(SchedulerEvent::LoopFinished { project, summary }) => {
                            self.active.remove(&project);
                            self.core.on_loop_finished(&project);
                            if let Some(listener) = &self.listener {
                                listener.job_finished(&project, &summary);
                            }
                        }
                        Some(SchedulerEvent::ShutdownRequested) | None => {
                            info!("shutdown requested; no further jobs will be fired");
                            break;
                        }
                    }
                }
            }
        }

        self.drain().await;
        Ok(())
    }

    fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::StartLoop(project) => {
                let name = project.name.clone();
                info!(project = %name, "job fired");
                if let Some(listener) = &self.listener {
                    listener.job_started(&name);
                }

                let runner = Arc::clone(&self.runner);
                let tx = self.event_tx.clone();
                let handle = tokio::spawn(async move {
                    let project_name = project.name.clone();
                    let times = project.schedule.times.max(1);
                    let summary =
                        supervise_loop(&project_name, times, run_repetitions(runner, project)).await;
                    let _ = tx.send(SchedulerEvent::LoopFinished {
                        project: project_name,
                        summary,
                    });
                });
                self.active.insert(name, handle);
            }
            CoreCommand::ReportMissed {
                project,
                scheduled_for,
            } => {
                warn!(
                    project = %project,
                    %scheduled_for,
                    "job missed its scheduled time: previous run still in flight"
                );
                if let Some(listener) = &self.listener {
                    listener.job_missed(&project, scheduled_for);
                }
            }
        }
    }

    async fn drain(&mut self) {
        if !self.active.is_empty() {
            info!(
                in_flight = self.active.len(),
                "waiting for in-flight jobs to finish"
            );
        }
        for (project, handle) in std::mem::take(&mut self.active) {
            if let Err(e) = handle.await {
                warn!(project = %project, error = %e, "job loop ended abnormally");
            }
        }
        while let Ok(event) = self.event_rx.try_recv() {
            if let (SchedulerEvent::LoopFinished { project, summary }, Some(listener)) =
                (event, &self.listener)
            {
                listener.job_finished(&project, &summary);
            }
        }
        info!("scheduler stopped");
    }
}

/// Await a repetition loop on its own task. A panicking loop still yields a
/// summary (every repetition counted as errored) so its slot is released.
async fn supervise_loop<F>(project: &str, times: u32, repetitions: F) -> RepetitionSummary
where
    F: Future<Output = RepetitionSummary> + Send + 'static,
{
    match tokio::spawn(repetitions).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(project = %project, error = %e, "job loop ended abnormally");
            RepetitionSummary {
                times,
                errored: times,
                ..Default::default()
            }
        }
    }
}

async fn sleep_or_forever(wait: Option<Duration>) {
    match wait {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending::<()>().await,
    }
}
