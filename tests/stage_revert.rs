// tests/stage_revert.rs

mod common;
use crate::common::init_tracing;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use proptest::prelude::*;
use tempfile::TempDir;

use agentplane::fs::{FileSystem, RealFileSystem};
use agentplane::stage::{discover_instruction_files, FileStager, StagingPlan};

/// Every regular file under `dir`, relative path -> bytes.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut out = BTreeMap::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(d) = stack.pop() {
        for entry in fs::read_dir(&d).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(dir).unwrap().to_path_buf();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    out
}

struct Fixture {
    _tmp: TempDir,
    source: PathBuf,
    workspace: PathBuf,
    backups: PathBuf,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("projects/docs");
    let workspace = tmp.path().join("ws");
    let backups = tmp.path().join("backups");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&workspace).unwrap();
    Fixture {
        _tmp: tmp,
        source,
        workspace,
        backups,
    }
}

fn stager(backups: &Path) -> FileStager {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    FileStager::new(fs, backups)
}

#[test]
fn stage_then_revert_on_disk() {
    init_tracing();
    let fx = fixture();

    fs::write(fx.source.join("AGENTS.md"), "agents").unwrap();
    fs::write(fx.source.join("SKILL.md"), "new skill").unwrap();
    fs::write(fx.workspace.join("SKILL.md"), "old skill").unwrap();
    fs::write(fx.workspace.join("main.rs"), "fn main() {}").unwrap();
    let before = snapshot(&fx.workspace);

    let files = discover_instruction_files(&RealFileSystem, &fx.source).unwrap();
    let plan = StagingPlan::build(&fx.workspace, &files);
    let staged = stager(&fx.backups).stage(&plan).unwrap();

    assert_eq!(
        fs::read_to_string(fx.workspace.join("SKILL.md")).unwrap(),
        "new skill"
    );
    assert_eq!(
        fs::read_to_string(fx.workspace.join("CLAUDE.md")).unwrap(),
        "agents"
    );
    assert_eq!(staged.backup_map().len(), 1);
    assert_eq!(staged.created_files().len(), 2);

    staged.revert().unwrap();

    assert_eq!(snapshot(&fx.workspace), before);
    assert!(snapshot(&fx.backups).is_empty());
}

#[test]
fn dropping_the_guard_reverts() {
    init_tracing();
    let fx = fixture();

    fs::write(fx.source.join("SKILL.md"), "skill").unwrap();
    let plan = StagingPlan::build(&fx.workspace, &[fx.source.join("SKILL.md")]);

    {
        let _staged = stager(&fx.backups).stage(&plan).unwrap();
        assert!(fx.workspace.join("SKILL.md").exists());
    }

    assert!(!fx.workspace.join("SKILL.md").exists());
}

#[test]
fn failing_entry_surfaces_after_partial_stage_is_undone() {
    init_tracing();
    let fx = fixture();

    fs::write(fx.source.join("A.md"), "a").unwrap();
    // A directory in the way of the second destination makes that copy fail.
    fs::create_dir_all(fx.workspace.join("B.md")).unwrap();
    fs::write(fx.source.join("B.md"), "b").unwrap();
    let before = snapshot(&fx.workspace);

    let plan = StagingPlan::build(
        &fx.workspace,
        &[fx.source.join("A.md"), fx.source.join("B.md")],
    );
    let err = stager(&fx.backups).stage(&plan).unwrap_err();

    assert!(err.to_string().contains("B.md"), "{err}");
    assert!(!fx.workspace.join("A.md").exists());
    assert_eq!(snapshot(&fx.workspace), before);
}

fn file_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["AGENTS.md", "CLAUDE.md", "SKILL.md", "notes.md", "README.md"])
        .prop_map(str::to_string)
}

fn contents() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Whatever the workspace held and whatever the plan stages, revert
    /// restores the workspace byte for byte.
    #[test]
    fn revert_restores_any_workspace(
        existing in prop::collection::btree_map(file_name(), contents(), 0..5),
        staged in prop::collection::btree_map(file_name(), contents(), 0..5),
    ) {
        let fx = fixture();
        for (name, bytes) in &existing {
            fs::write(fx.workspace.join(name), bytes).unwrap();
        }
        let mut files = Vec::new();
        for (name, bytes) in &staged {
            let path = fx.source.join(name);
            fs::write(&path, bytes).unwrap();
            files.push(path);
        }
        let before = snapshot(&fx.workspace);

        let plan = StagingPlan::build(&fx.workspace, &files);
        let guard = stager(&fx.backups).stage(&plan).unwrap();
        for entry in plan.entries() {
            prop_assert!(entry.destination.exists());
        }
        guard.revert().unwrap();

        prop_assert_eq!(snapshot(&fx.workspace), before);
    }
}
