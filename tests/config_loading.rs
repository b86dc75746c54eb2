// tests/config_loading.rs

mod common;
use crate::common::builders::{write_project_dir, RawProjectConfigBuilder};

use std::collections::HashSet;
use std::error::Error;
use std::fs;

use tempfile::TempDir;

use agentplane::config::{validate_project, ConfigStore};
use agentplane::errors::AgentPlaneError;
use agentplane::fs::mock::MockFileSystem;
use agentplane::fs::RealFileSystem;
use agentplane::types::Provider;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn loads_projects_sorted_with_defaults() -> TestResult {
    let tmp = TempDir::new()?;
    write_project_dir(
        tmp.path(),
        "zeta",
        r#"
name = "zeta"
path = "/tmp/zeta"
enabled = true
provider = "Gemini"

[schedule]
cron = "*/15 * * * *"
times = 2
"#,
        &[("SKILL.md", "skill")],
    );
    write_project_dir(tmp.path(), "alpha", "name = \"alpha\"\npath = \"/tmp/alpha\"\n", &[]);
    // Reserved directories and stray files are ignored.
    fs::create_dir_all(tmp.path().join("_shared"))?;
    fs::create_dir_all(tmp.path().join(".git"))?;
    fs::write(tmp.path().join("README.md"), "notes")?;

    let projects = ConfigStore::new(tmp.path()).load()?;

    let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);

    let alpha = &projects[0];
    assert!(!alpha.enabled);
    assert_eq!(alpha.provider, Provider::Claude);
    assert_eq!(alpha.schedule.cron, None);
    assert_eq!(alpha.schedule.times, 1);
    assert_eq!(alpha.source_dir, tmp.path().join("alpha"));

    let zeta = &projects[1];
    assert!(zeta.enabled);
    assert_eq!(zeta.provider, Provider::Gemini);
    assert_eq!(zeta.schedule_summary(), "*/15 * * * * (x2)");
    Ok(())
}

#[test]
fn directory_without_project_file_fails_loudly() -> TestResult {
    let tmp = TempDir::new()?;
    write_project_dir(tmp.path(), "docs", "name = \"docs\"\npath = \"/tmp/ws\"\n", &[]);
    fs::create_dir_all(tmp.path().join("scratch"))?;

    let err = ConfigStore::new(tmp.path()).load().unwrap_err();
    assert!(matches!(err, AgentPlaneError::Config(_)), "{err:?}");
    assert!(err.to_string().contains("scratch"), "{err}");
    Ok(())
}

#[test]
fn duplicate_names_are_rejected() -> TestResult {
    let tmp = TempDir::new()?;
    write_project_dir(tmp.path(), "a", "name = \"docs\"\npath = \"/tmp/a\"\n", &[]);
    write_project_dir(tmp.path(), "b", "name = \"docs\"\npath = \"/tmp/b\"\n", &[]);

    let err = ConfigStore::new(tmp.path()).load().unwrap_err();
    match err {
        AgentPlaneError::DuplicateProject { name, first, second } => {
            assert_eq!(name, "docs");
            assert_eq!(first, tmp.path().join("a"));
            assert_eq!(second, tmp.path().join("b"));
        }
        other => panic!("expected duplicate error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn malformed_or_unknown_keys_name_the_file() -> TestResult {
    let tmp = TempDir::new()?;
    write_project_dir(
        tmp.path(),
        "docs",
        "name = \"docs\"\npath = \"/tmp/ws\"\ncolour = \"blue\"\n",
        &[],
    );

    let err = ConfigStore::new(tmp.path()).load_raw().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("project.toml"), "{msg}");
    assert!(msg.contains("colour"), "{msg}");
    Ok(())
}

#[test]
fn structural_errors_are_load_errors() -> TestResult {
    let tmp = TempDir::new()?;
    write_project_dir(
        tmp.path(),
        "docs",
        "name = \"docs\"\npath = \"/tmp/ws\"\nprovider = \"copilot\"\n",
        &[],
    );

    let err = ConfigStore::new(tmp.path()).load().unwrap_err();
    assert!(err.to_string().contains("invalid provider 'copilot'"), "{err}");

    // `load_raw` still returns it, so `validate` can report on it.
    assert_eq!(ConfigStore::new(tmp.path()).load_raw()?.len(), 1);
    Ok(())
}

#[test]
fn missing_root_is_a_config_error() {
    let err = ConfigStore::new("/definitely/not/here").load().unwrap_err();
    assert!(matches!(err, AgentPlaneError::Config(_)));
}

#[test]
fn empty_document_reports_missing_name_and_path() {
    let fs = MockFileSystem::new();
    fs.add_file("/projects/empty/SKILL.md", "skill");
    let raw = RawProjectConfigBuilder::empty()
        .source_dir("/projects/empty")
        .build();

    let errors: HashSet<String> = validate_project(&raw, &fs).into_iter().collect();

    let expected: HashSet<String> = ["missing name", "missing path"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(errors, expected);
}

#[test]
fn validation_accumulates_every_problem() {
    let fs = MockFileSystem::new();
    fs.add_dir("/projects/docs");
    let raw = RawProjectConfigBuilder::new("docs", "/tmp/missing")
        .provider("openai")
        .schedule(Some("61 * * * *"), Some(0))
        .source_dir("/projects/docs")
        .build();

    let errors = validate_project(&raw, &fs);

    assert_eq!(errors.len(), 5, "{errors:?}");
    assert_eq!(errors[0], "path not found: /tmp/missing");
    assert_eq!(
        errors[1],
        "invalid provider 'openai' (expected one of: claude, gemini)"
    );
    assert_eq!(errors[2], "no instruction files (*.md) found in /projects/docs");
    assert_eq!(errors[3], "schedule.times must be >= 1 (got 0)");
    assert!(errors[4].starts_with("invalid cron expression '61 * * * *'"));
}

#[test]
fn valid_project_on_disk_has_no_errors() -> TestResult {
    let tmp = TempDir::new()?;
    let ws = tmp.path().join("ws");
    fs::create_dir_all(&ws)?;
    let dir = write_project_dir(
        tmp.path(),
        "docs",
        &format!("name = \"docs\"\npath = {:?}\n", ws.display().to_string()),
        &[("AGENTS.md", "agents")],
    );

    let raws = ConfigStore::new(tmp.path()).load_raw()?;
    assert_eq!(raws[0].source_dir, dir);
    assert!(validate_project(&raws[0], &RealFileSystem).is_empty());
    Ok(())
}
