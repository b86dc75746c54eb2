// tests/job_runner.rs

mod common;
use crate::common::builders::ProjectConfigBuilder;
use crate::common::{files_under, init_tracing, mock_runner, RecordingBackend, LOGS_DIR};

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agentplane::engine::run_repetitions;
use agentplane::errors::AgentPlaneError;
use agentplane::fs::mock::MockFileSystem;
use agentplane::fs::FileSystem;
use agentplane::runner::{RunStatus, SkipReason};
use agentplane::types::Provider;

type TestResult = Result<(), Box<dyn Error>>;

/// `/projects/docs` with the given instruction files and an empty `/tmp/ws`.
fn docs_fs(files: &[(&str, &str)]) -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_dir("/tmp/ws");
    fs.add_file("/projects/docs/project.toml", "name = 'docs'");
    for (name, contents) in files {
        fs.add_file(format!("/projects/docs/{name}"), *contents);
    }
    fs
}

#[tokio::test]
async fn disabled_project_has_no_side_effects() -> TestResult {
    init_tracing();

    let fs = docs_fs(&[("SKILL.md", "skill")]);
    let before = fs.file_paths();
    let backend = Arc::new(RecordingBackend::with_fs(Arc::new(fs.clone())));
    let runner = mock_runner(&fs, Arc::clone(&backend));

    let project = ProjectConfigBuilder::new("docs").enabled(false).build();
    let result = runner.run(&project, false).await?;

    assert_eq!(result.status, RunStatus::Skipped(SkipReason::Disabled));
    assert!(result.log_path.is_none());
    assert_eq!(fs.copy_count(), 0);
    assert_eq!(fs.removal_count(), 0);
    assert!(backend.invocations().is_empty());
    assert_eq!(fs.file_paths(), before);
    Ok(())
}

#[tokio::test]
async fn missing_workspace_is_a_skip_not_an_error() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("/projects/docs/SKILL.md", "skill");
    let backend = Arc::new(RecordingBackend::new());
    let runner = mock_runner(&fs, Arc::clone(&backend));

    let project = ProjectConfigBuilder::new("docs").path("/tmp/gone").build();
    let result = runner.run(&project, false).await?;

    assert!(result.is_skipped());
    assert_eq!(result.status, RunStatus::Skipped(SkipReason::PathMissing));
    assert_eq!(fs.copy_count(), 0);
    assert!(backend.invocations().is_empty());
    Ok(())
}

#[tokio::test]
async fn dry_run_reports_plan_without_copying_or_spawning() -> TestResult {
    init_tracing();

    let fs = docs_fs(&[("AGENTS.md", "agents"), ("SKILL.md", "skill")]);
    fs.add_file("/projects/docs/prompt.txt", "Improve {{ project.name }}");
    let backend = Arc::new(RecordingBackend::new());
    let runner = mock_runner(&fs, Arc::clone(&backend));

    let project = ProjectConfigBuilder::new("docs").build();
    let result = runner.run(&project, true).await?;

    let RunStatus::DryRun(report) = &result.status else {
        panic!("expected a dry run, got {:?}", result.status);
    };
    assert_eq!(report.working_dir, PathBuf::from("/tmp/ws"));
    assert_eq!(report.command.program, "claude");
    assert_eq!(report.command.args[1], "Improve docs");

    let destinations: Vec<_> = report
        .staged
        .iter()
        .map(|e| e.destination.display().to_string())
        .collect();
    assert_eq!(
        destinations,
        vec!["/tmp/ws/AGENTS.md", "/tmp/ws/CLAUDE.md", "/tmp/ws/SKILL.md"]
    );

    let text = report.to_string();
    assert!(text.contains("cmd: claude -p 'Improve docs'"), "{text}");

    assert!(result.succeeded());
    assert_eq!(fs.copy_count(), 0);
    assert!(backend.invocations().is_empty());
    assert!(files_under(&fs, "/tmp/ws").is_empty());
    Ok(())
}

#[tokio::test]
async fn staging_failure_rolls_back_earlier_files() -> TestResult {
    init_tracing();

    let fs = docs_fs(&[("A.md", "new a"), ("B.md", "new b"), ("C.md", "new c")]);
    fs.add_file("/tmp/ws/B.md", "OLD");
    fs.fail_copies_to("/tmp/ws/C.md");
    let backend = Arc::new(RecordingBackend::new());
    let runner = mock_runner(&fs, Arc::clone(&backend));

    let project = ProjectConfigBuilder::new("docs").build();
    let err = runner.run(&project, false).await.unwrap_err();

    match err {
        AgentPlaneError::Staging { path, .. } => assert_eq!(path, PathBuf::from("/tmp/ws/C.md")),
        other => panic!("expected staging error, got {other:?}"),
    }
    assert_eq!(files_under(&fs, "/tmp/ws"), vec!["/tmp/ws/B.md"]);
    assert_eq!(fs.contents("/tmp/ws/B.md"), Some(b"OLD".to_vec()));
    assert!(files_under(&fs, "/backups").is_empty());
    assert!(backend.invocations().is_empty());
    Ok(())
}

#[tokio::test]
async fn two_repetitions_stage_run_and_remove_skill_file() -> TestResult {
    init_tracing();

    let fs = docs_fs(&[("SKILL.md", "do the docs")]);
    let backend = Arc::new(
        RecordingBackend::with_fs(Arc::new(fs.clone())).delay(Duration::from_millis(5)),
    );
    let runner = Arc::new(mock_runner(&fs, Arc::clone(&backend)));

    let project = ProjectConfigBuilder::new("docs")
        .path("/tmp/ws")
        .provider(Provider::Claude)
        .cron("0 * * * *")
        .times(2)
        .build();
    let summary = run_repetitions(runner, Arc::new(project)).await;

    assert_eq!(summary.times, 2);
    assert_eq!(summary.succeeded, 2);
    assert!(summary.all_succeeded());

    let invocations = backend.invocations();
    assert_eq!(invocations.len(), 2);
    assert_eq!(backend.max_concurrent(), 1);
    for invocation in &invocations {
        assert_eq!(invocation.working_dir, PathBuf::from("/tmp/ws"));
        assert_eq!(invocation.command.program, "claude");
    }
    for snapshot in backend.snapshots() {
        assert_eq!(snapshot.get("SKILL.md").map(String::as_str), Some("do the docs"));
    }

    // Staged copy is gone again.
    assert!(!fs.exists(&PathBuf::from("/tmp/ws/SKILL.md")));
    assert!(files_under(&fs, "/tmp/ws").is_empty());

    let logs = files_under(&fs, LOGS_DIR);
    assert_eq!(logs.len(), 2, "{logs:?}");
    assert!(logs[0] < logs[1]);
    assert!(logs.iter().all(|l| l.starts_with("/logs/docs_claude_")));
    let requested: Vec<String> = backend
        .log_paths()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    assert_eq!(requested, logs);
    Ok(())
}

#[tokio::test]
async fn pre_existing_file_is_restored_after_run() -> TestResult {
    init_tracing();

    let fs = docs_fs(&[("SKILL.md", "NEW")]);
    fs.add_file("/tmp/ws/SKILL.md", "OLD");
    let backend = Arc::new(RecordingBackend::with_fs(Arc::new(fs.clone())));
    let runner = mock_runner(&fs, Arc::clone(&backend));

    let project = ProjectConfigBuilder::new("docs").build();
    let result = runner.run(&project, false).await?;

    assert_eq!(result.exit_code(), Some(0));
    assert_eq!(
        backend.snapshots()[0].get("SKILL.md").map(String::as_str),
        Some("NEW")
    );
    assert_eq!(fs.contents("/tmp/ws/SKILL.md"), Some(b"OLD".to_vec()));
    assert!(files_under(&fs, "/backups").is_empty());
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_data_and_workspace_is_still_reverted() -> TestResult {
    init_tracing();

    let fs = docs_fs(&[("AGENTS.md", "agents")]);
    let backend = Arc::new(RecordingBackend::with_fs(Arc::new(fs.clone())).exit_code(3));
    let runner = mock_runner(&fs, Arc::clone(&backend));

    let result = runner
        .run(&ProjectConfigBuilder::new("docs").build(), false)
        .await?;

    assert_eq!(result.exit_code(), Some(3));
    assert!(!result.succeeded());
    assert!(result.log_path.is_some());
    let snapshot = &backend.snapshots()[0];
    assert!(snapshot.contains_key("AGENTS.md"));
    assert!(snapshot.contains_key("CLAUDE.md"));
    assert!(files_under(&fs, "/tmp/ws").is_empty());
    Ok(())
}

#[tokio::test]
async fn backend_error_still_reverts() -> TestResult {
    init_tracing();

    let fs = docs_fs(&[("SKILL.md", "skill")]);
    let backend = Arc::new(RecordingBackend::new().failing("provider binary not found"));
    let runner = mock_runner(&fs, Arc::clone(&backend));

    let err = runner
        .run(&ProjectConfigBuilder::new("docs").build(), false)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("provider binary not found"), "{err}");
    assert_eq!(backend.invocations().len(), 1);
    assert!(files_under(&fs, "/tmp/ws").is_empty());
    Ok(())
}

#[tokio::test]
async fn broken_prompt_template_fails_before_staging() -> TestResult {
    init_tracing();

    let fs = docs_fs(&[("SKILL.md", "skill")]);
    fs.add_file("/projects/docs/prompt.txt", "{{ unknown.thing }}");
    let backend = Arc::new(RecordingBackend::new());
    let runner = mock_runner(&fs, Arc::clone(&backend));

    let err = runner
        .run(&ProjectConfigBuilder::new("docs").build(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, AgentPlaneError::Template(_)), "{err:?}");
    assert_eq!(fs.copy_count(), 0);
    assert!(backend.invocations().is_empty());
    Ok(())
}

#[tokio::test]
async fn fs_seam_is_shared_between_stager_and_runner() -> TestResult {
    // The backend sees exactly what the stager wrote through the same seam.
    let fs = docs_fs(&[("SKILL.md", "skill")]);
    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let backend = Arc::new(RecordingBackend::with_fs(shared));
    let runner = mock_runner(&fs, Arc::clone(&backend));

    runner
        .run(&ProjectConfigBuilder::new("docs").build(), false)
        .await?;
    assert_eq!(fs.copy_count(), 1);
    assert_eq!(backend.snapshots().len(), 1);
    Ok(())
}
