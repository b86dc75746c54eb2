// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod runner;
pub mod stage;
pub mod types;

use std::collections::HashMap;
use std::fmt::Write as _;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{validate_project, ConfigStore, ProjectConfig, RawProjectConfig};
use crate::errors::{display_chain, AgentPlaneError, Result};
use crate::exec::RealProcessBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::runner::{JobRunner, RunResult, RunStatus};
use crate::stage::FileStager;

/// High-level entry point used by `main.rs`.
///
/// Fatal configuration problems come back as `Err`; "soft" failures such as
/// an invalid project under `validate` are reported through the exit code.
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    let store = ConfigStore::new(&args.projects_dir);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    match &args.command {
        Command::List => {
            let projects = store.load()?;
            print!("{}", format_project_table(&projects, fs.as_ref()));
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate => {
            let raws = store.load_raw()?;
            let (report, all_valid) = validation_report(&raws, fs.as_ref());
            print!("{report}");
            Ok(if all_valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Run { project, dry_run } => {
            let projects = store.load()?;
            let selected = select_projects(&projects, project.as_deref())?;
            let runner = build_runner(&args, fs);
            run_now(&runner, &selected, *dry_run).await
        }
        Command::Schedule => {
            let projects = store.load()?;
            let runner = Arc::new(build_runner(&args, fs));
            engine::start(&projects, runner, args.timezone).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_runner(args: &CliArgs, fs: Arc<dyn FileSystem>) -> JobRunner {
    let stager = FileStager::with_default_backup_root(Arc::clone(&fs));
    JobRunner::new(
        fs,
        Arc::new(RealProcessBackend::stdout()),
        stager,
        &args.logs_dir,
    )
}

/// The named project, or every project when `name` is `None`.
pub fn select_projects<'a>(
    projects: &'a [ProjectConfig],
    name: Option<&str>,
) -> Result<Vec<&'a ProjectConfig>> {
    match name {
        None => Ok(projects.iter().collect()),
        Some(name) => projects
            .iter()
            .find(|p| p.name == name)
            .map(|p| vec![p])
            .ok_or_else(|| AgentPlaneError::ProjectNotFound(name.to_string())),
    }
}

/// Exit status after Ctrl-C or SIGTERM interrupted a manual run.
const INTERRUPTED: u8 = 130;

async fn run_now(runner: &JobRunner, projects: &[&ProjectConfig], dry_run: bool) -> Result<ExitCode> {
    let mut errored = 0usize;
    let signal = engine::wait_for_signal();
    tokio::pin!(signal);

    for project in projects {
        // Dropping an interrupted run reverts its staged files and kills the
        // provider process before we exit.
        let outcome = tokio::select! {
            outcome = runner.run(project, dry_run) => outcome,
            () = &mut signal => {
                warn!(project = %project.name, "interrupted; reverting workspace and stopping");
                return Ok(ExitCode::from(INTERRUPTED));
            }
        };
        match outcome {
            Ok(result) => print_run_result(&result),
            Err(err) => {
                error!(project = %project.name, error = %display_chain(&err), "run failed");
                errored += 1;
            }
        }
    }

    debug!(projects = projects.len(), errored, "manual run complete");
    Ok(if errored == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_run_result(result: &RunResult) {
    match &result.status {
        RunStatus::DryRun(report) => {
            println!("[DRY RUN] {} ({})", result.project, result.provider);
            println!("{report}");
        }
        RunStatus::Skipped(reason) => println!("{}: {reason}", result.project),
        RunStatus::Completed { exit_code } => {
            let log = result
                .log_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            info!(project = %result.project, exit_code, "run complete");
            println!("{}: exit code {exit_code} (log: {log})", result.project);
        }
    }
}

/// Aligned `Project / Status / Provider / Schedule / Path` table.
pub fn format_project_table(projects: &[ProjectConfig], fs: &dyn FileSystem) -> String {
    if projects.is_empty() {
        return "No projects configured.\n".to_string();
    }

    let headers = ["Project", "Status", "Provider", "Schedule", "Path"];
    let rows: Vec<[String; 5]> = projects
        .iter()
        .map(|p| {
            let status = if p.enabled { "enabled" } else { "disabled" };
            let mut path = p.path.display().to_string();
            if !fs.exists(&p.path) {
                path.push_str(" (NOT FOUND)");
            }
            [
                p.name.clone(),
                status.to_string(),
                p.provider.to_string(),
                p.schedule_summary(),
                path,
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut line = |cells: [&str; 5]| {
        let joined = cells
            .iter()
            .zip(widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{}", joined.trim_end());
    };

    line(headers);
    line(widths.map(|w| "-".repeat(w)).each_ref().map(String::as_str));
    for row in &rows {
        line(row.each_ref().map(String::as_str));
    }
    out
}

/// `<name>: OK` or the project's errors, one per line. The flag is false
/// when any project is invalid.
pub fn validation_report(raws: &[RawProjectConfig], fs: &dyn FileSystem) -> (String, bool) {
    if raws.is_empty() {
        return ("No projects configured.\n".to_string(), true);
    }

    let mut name_counts: HashMap<String, usize> = HashMap::new();
    for raw in raws {
        if let Some(name) = raw.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            *name_counts.entry(name.to_string()).or_default() += 1;
        }
    }

    let mut out = String::new();
    let mut all_valid = true;
    for raw in raws {
        let mut errors = validate_project(raw, fs);
        if let Some(name) = raw.name.as_deref().map(str::trim) {
            if name_counts.get(name).is_some_and(|n| *n > 1) {
                errors.push(format!("duplicate project name '{name}'"));
            }
        }

        let name = raw.display_name();
        if errors.is_empty() {
            let _ = writeln!(out, "{name}: OK");
        } else {
            all_valid = false;
            let _ = writeln!(out, "{name}:");
            for e in &errors {
                let _ = writeln!(out, "  - {e}");
            }
        }
    }
    (out, all_valid)
}
