// src/exec/backend.rs

//! Pluggable process backend.
//!
//! The job runner talks to a `ProcessBackend` instead of spawning processes
//! itself. Production code uses [`RealProcessBackend`]; tests provide fakes
//! that record invocations and inspect the staged workspace without
//! spawning anything.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::{AgentPlaneError, Result};
use crate::exec::process::{run_process, ExecOutcome, Invocation};
use crate::exec::sink::{OutputSink, StdoutSink};

/// Trait abstracting how a provider invocation is executed.
pub trait ProcessBackend: Send + Sync {
    /// Run the invocation to completion and report its exit code.
    fn execute<'a>(
        &'a self,
        invocation: &'a Invocation,
    ) -> Pin<Box<dyn Future<Output = Result<ExecOutcome>> + Send + 'a>>;
}

/// Spawns real OS processes via `tokio::process`.
#[derive(Clone)]
pub struct RealProcessBackend {
    sink: Arc<dyn OutputSink>,
}

impl fmt::Debug for RealProcessBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealProcessBackend").finish_non_exhaustive()
    }
}

impl RealProcessBackend {
    /// Backend forwarding live output to `sink`.
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self { sink }
    }

    /// Backend echoing live output to stdout.
    pub fn stdout() -> Self {
        Self::new(Arc::new(StdoutSink))
    }
}

impl ProcessBackend for RealProcessBackend {
    fn execute<'a>(
        &'a self,
        invocation: &'a Invocation,
    ) -> Pin<Box<dyn Future<Output = Result<ExecOutcome>> + Send + 'a>> {
        Box::pin(async move {
            run_process(invocation, self.sink.as_ref())
                .await
                .map_err(AgentPlaneError::from)
        })
    }
}
