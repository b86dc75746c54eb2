use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentplane::errors::{AgentPlaneError, Result};
use agentplane::exec::{ExecOutcome, Invocation, ProcessBackend};
use agentplane::fs::FileSystem;

/// Files directly inside the working directory at the moment the fake
/// "process" ran: file name -> contents.
pub type WorkspaceSnapshot = BTreeMap<String, String>;

/// A fake process backend that:
/// - records every invocation instead of spawning anything
/// - snapshots the working directory while "running" (so tests can see what
///   was staged)
/// - writes a one-line log file through the given filesystem
/// - returns a configurable exit code, or an error
pub struct RecordingBackend {
    fs: Option<Arc<dyn FileSystem>>,
    exit_code: i32,
    fail_with: Option<String>,
    delay: Option<Duration>,
    invocations: Mutex<Vec<Invocation>>,
    snapshots: Mutex<Vec<WorkspaceSnapshot>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl RecordingBackend {
    /// Records invocations only; exits with 0.
    pub fn new() -> Self {
        Self {
            fs: None,
            exit_code: 0,
            fail_with: None,
            delay: None,
            invocations: Mutex::new(Vec::new()),
            snapshots: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Also snapshot the workspace and write log files through `fs`.
    pub fn with_fs(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs: Some(fs),
            ..Self::new()
        }
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Make every execution fail with an error carrying `msg`.
    pub fn failing(mut self, msg: &str) -> Self {
        self.fail_with = Some(msg.to_string());
        self
    }

    /// Pretend each run takes `delay`.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn snapshots(&self) -> Vec<WorkspaceSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn log_paths(&self) -> Vec<PathBuf> {
        self.invocations()
            .into_iter()
            .map(|i| i.log_path)
            .collect()
    }

    /// Highest number of executions observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn snapshot(&self, fs: &dyn FileSystem, invocation: &Invocation) -> WorkspaceSnapshot {
        let mut snap = WorkspaceSnapshot::new();
        for path in fs.read_dir(&invocation.working_dir).unwrap_or_default() {
            if !fs.is_file(&path) {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let contents = fs.read_to_string(&path).unwrap_or_default();
            snap.insert(name, contents);
        }
        snap
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessBackend for RecordingBackend {
    fn execute<'a>(
        &'a self,
        invocation: &'a Invocation,
    ) -> Pin<Box<dyn Future<Output = Result<ExecOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);

            self.invocations.lock().unwrap().push(invocation.clone());
            if let Some(fs) = &self.fs {
                let snap = self.snapshot(fs.as_ref(), invocation);
                self.snapshots.lock().unwrap().push(snap);
                fs.write(
                    &invocation.log_path,
                    format!("fake run of {}\n", invocation.project).as_bytes(),
                )?;
            }

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            match &self.fail_with {
                Some(msg) => Err(AgentPlaneError::Other(anyhow::anyhow!(msg.clone()))),
                None => Ok(ExecOutcome {
                    exit_code: self.exit_code,
                    output: format!("fake run of {}\n", invocation.project),
                }),
            }
        })
    }
}
