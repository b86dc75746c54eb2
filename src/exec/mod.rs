// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running provider commands, using
//! `tokio::process::Command`, and capturing their output.
//!
//! - [`process`] spawns one process and streams its combined output.
//! - [`sink`] holds the live pass-through destinations for that output.
//! - [`backend`] provides the `ProcessBackend` trait and the concrete
//!   `RealProcessBackend` used in production, which tests replace with a
//!   fake implementation.

pub mod backend;
pub mod process;
pub mod sink;

pub use backend::{ProcessBackend, RealProcessBackend};
pub use process::{run_process, ExecOutcome, Invocation};
pub use sink::{MemorySink, NullSink, OutputSink, StdoutSink};
