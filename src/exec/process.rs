// src/exec/process.rs

//! Running one provider process to completion.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exec::sink::OutputSink;
use crate::types::ResolvedCommand;

/// Everything needed to spawn one provider run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Project name, for logging.
    pub project: String,
    pub command: ResolvedCommand,
    /// Current directory of the spawned process.
    pub working_dir: PathBuf,
    /// Append-only log receiving the combined output.
    pub log_path: PathBuf,
}

/// Result of a finished process. A non-zero `exit_code` is data, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    /// Combined stdout/stderr in arrival order, one `\n` per line.
    pub output: String,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawn `invocation.command` without a shell and stream its output.
///
/// stdout and stderr are read line by line by two reader tasks feeding one
/// channel, so lines are interleaved in arrival order. Each line is written
/// and flushed to the log before it is forwarded to `sink`, so a killed
/// process leaves a log that is complete up to its last finished line.
pub async fn run_process(invocation: &Invocation, sink: &dyn OutputSink) -> Result<ExecOutcome> {
    info!(
        project = %invocation.project,
        cmd = %invocation.command,
        cwd = ?invocation.working_dir,
        log = ?invocation.log_path,
        "starting provider process"
    );

    if let Some(parent) = invocation.log_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating log directory {:?}", parent))?;
    }
    let mut log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&invocation.log_path)
        .await
        .with_context(|| format!("opening log file {:?}", invocation.log_path))?;

    let mut cmd = Command::new(&invocation.command.program);
    cmd.args(&invocation.command.args)
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().with_context(|| {
        format!(
            "spawning '{}' for project '{}'",
            invocation.command.program, invocation.project
        )
    })?;

    let (tx, mut rx) = mpsc::channel::<String>(256);
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward_lines(stderr, tx.clone()));
    }
    drop(tx);

    let mut output = String::new();
    while let Some(line) = rx.recv().await {
        log.write_all(line.as_bytes()).await?;
        log.write_all(b"\n").await?;
        log.flush().await?;

        sink.write_line(&line);
        output.push_str(&line);
        output.push('\n');
    }

    for reader in readers {
        if let Err(e) = reader.await {
            warn!(project = %invocation.project, error = %e, "output reader task failed");
        }
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for provider of project '{}'", invocation.project))?;
    let exit_code = status.code().unwrap_or(-1);

    info!(
        project = %invocation.project,
        exit_code,
        success = status.success(),
        "provider process exited"
    );

    Ok(ExecOutcome { exit_code, output })
}

/// Read `reader` line by line (lossy UTF-8) into `tx` until EOF.
fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "stopped reading process output");
                    break;
                }
            }
        }
    })
}
