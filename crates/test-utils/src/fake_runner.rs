use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use tokio::sync::Semaphore;

use agentplane::config::ProjectConfig;
use agentplane::engine::{ProjectRunner, RepetitionSummary, SchedulerListener};
use agentplane::errors::{AgentPlaneError, Result};
use agentplane::runner::{RunResult, RunStatus};

/// What happened inside [`ScriptedRunner`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    Started { project: String, call: usize },
    Finished { project: String, call: usize },
}

/// How one call to [`ScriptedRunner::run_once`] ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Exit(i32),
    Error,
    Panic,
}

/// A fake project runner for scheduler tests that:
/// - records start/finish of every call
/// - can hold each call for a fixed time, or until a gate semaphore has a
///   permit
/// - follows a script of outcomes (default: exit code 0)
pub struct ScriptedRunner {
    script: Mutex<Vec<Step>>,
    hold: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    events: Mutex<Vec<RunnerEvent>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            hold: None,
            gate: None,
            calls: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Outcomes for successive calls; calls beyond the script exit with 0.
    pub fn script(self, steps: &[Step]) -> Self {
        *self.script.lock().unwrap() = steps.iter().rev().copied().collect();
        self
    }

    pub fn hold_for(mut self, d: Duration) -> Self {
        self.hold = Some(d);
        self
    }

    /// Block every call until `gate` has a permit. Permits are returned, so
    /// one `add_permits(1)` releases every blocked and future call.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<RunnerEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectRunner for ScriptedRunner {
    fn run_once<'a>(
        &'a self,
        project: &'a ProjectConfig,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let step = self.script.lock().unwrap().pop().unwrap_or(Step::Exit(0));
            let started_at = Local::now();
            self.events.lock().unwrap().push(RunnerEvent::Started {
                project: project.name.clone(),
                call,
            });

            if let Some(d) = self.hold {
                tokio::time::sleep(d).await;
            }
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await;
            }

            self.events.lock().unwrap().push(RunnerEvent::Finished {
                project: project.name.clone(),
                call,
            });

            match step {
                Step::Exit(exit_code) => Ok(RunResult {
                    project: project.name.clone(),
                    provider: project.provider,
                    started_at,
                    finished_at: Local::now(),
                    status: RunStatus::Completed { exit_code },
                    log_path: None,
                }),
                Step::Error => Err(AgentPlaneError::Other(anyhow::anyhow!(
                    "scripted failure in call {call}"
                ))),
                Step::Panic => panic!("scripted panic in call {call}"),
            }
        })
    }
}

/// Listener counting scheduler notifications per kind.
#[derive(Default)]
pub struct CountingListener {
    pub started: AtomicUsize,
    pub missed: AtomicUsize,
    pub finished: Mutex<Vec<(String, RepetitionSummary)>>,
}

impl CountingListener {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn missed(&self) -> usize {
        self.missed.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> Vec<(String, RepetitionSummary)> {
        self.finished.lock().unwrap().clone()
    }
}

impl SchedulerListener for CountingListener {
    fn job_started(&self, _project: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn job_missed(&self, _project: &str, _scheduled_for: chrono::DateTime<chrono::Utc>) {
        self.missed.fetch_add(1, Ordering::SeqCst);
    }

    fn job_finished(&self, project: &str, summary: &RepetitionSummary) {
        self.finished
            .lock()
            .unwrap()
            .push((project.to_string(), *summary));
    }
}
