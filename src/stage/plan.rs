// src/stage/plan.rs

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Instruction file that is additionally staged under [`CLAUDE_ALIAS`].
pub const AGENTS_FILE: &str = "AGENTS.md";
pub const CLAUDE_ALIAS: &str = "CLAUDE.md";

/// One file copy: `source` (under the project directory) to `destination`
/// (inside the target workspace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEntry {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl fmt::Display for StageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source.display(), self.destination.display())
    }
}

/// Ordered list of copies into one target directory.
///
/// Destinations are unique within a plan. Building a plan touches no
/// filesystem state, which is what lets dry-run report it for free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingPlan {
    target_dir: PathBuf,
    entries: Vec<StageEntry>,
}

impl StagingPlan {
    /// Plan copies of `files` into `target_dir`, keyed by file name.
    ///
    /// An `AGENTS.md` is also planned as `CLAUDE.md`, unless the files
    /// already include a real `CLAUDE.md` (the real file wins). When two
    /// sources share a file name the first one is kept.
    pub fn build(target_dir: &Path, files: &[PathBuf]) -> Self {
        let has_claude_file = files
            .iter()
            .any(|f| f.file_name().is_some_and(|n| n == CLAUDE_ALIAS));

        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for source in files {
            let Some(name) = source.file_name() else {
                continue;
            };
            let destination = target_dir.join(name);
            if !seen.insert(destination.clone()) {
                continue;
            }
            entries.push(StageEntry {
                source: source.clone(),
                destination,
            });

            if name == AGENTS_FILE && !has_claude_file {
                let alias = target_dir.join(CLAUDE_ALIAS);
                if seen.insert(alias.clone()) {
                    entries.push(StageEntry {
                        source: source.clone(),
                        destination: alias,
                    });
                }
            }
        }

        Self {
            target_dir: target_dir.to_path_buf(),
            entries,
        }
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn entries(&self) -> &[StageEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
