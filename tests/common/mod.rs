#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use agentplane::fs::mock::MockFileSystem;
use agentplane::fs::FileSystem;
use agentplane::runner::JobRunner;
use agentplane::stage::FileStager;

pub use agentplane_test_utils::builders;
pub use agentplane_test_utils::fake_backend::RecordingBackend;
pub use agentplane_test_utils::fake_runner::{CountingListener, RunnerEvent, ScriptedRunner, Step};
pub use agentplane_test_utils::{init_tracing, with_timeout};

pub const BACKUP_ROOT: &str = "/backups";
pub const LOGS_DIR: &str = "/logs";

/// Job runner over an in-memory filesystem and a recording backend.
pub fn mock_runner(fs: &MockFileSystem, backend: Arc<RecordingBackend>) -> JobRunner {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let stager = FileStager::new(Arc::clone(&fs), BACKUP_ROOT);
    JobRunner::new(fs, backend, stager, LOGS_DIR)
}

/// Sorted file paths under `dir` (recursive) in the mock filesystem.
pub fn files_under(fs: &MockFileSystem, dir: impl AsRef<Path>) -> Vec<String> {
    fs.file_paths()
        .into_iter()
        .filter(|p| p.starts_with(dir.as_ref()))
        .map(|p| p.display().to_string())
        .collect()
}
