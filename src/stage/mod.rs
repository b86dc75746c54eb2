// src/stage/mod.rs

//! Temporary injection of instruction files into a target workspace.
//!
//! - [`plan`] decides *what* to copy where (pure).
//! - [`stager`] performs the copies and owns the guard that reverts them.

pub mod plan;
pub mod stager;

use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;

pub use plan::{StageEntry, StagingPlan, AGENTS_FILE, CLAUDE_ALIAS};
pub use stager::{FileStager, StagedWorkspace};

/// File-name patterns that mark a file as a stageable instruction file.
pub const INSTRUCTION_PATTERNS: &[&str] = &["*.md"];

fn instruction_globs() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in INSTRUCTION_PATTERNS {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Instruction files directly inside `dir`, sorted by path.
///
/// Sub-directories are not searched.
pub fn discover_instruction_files(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    let globs = instruction_globs()?;

    let mut files: Vec<PathBuf> = fs
        .read_dir(dir)?
        .into_iter()
        .filter(|p| fs.is_file(p))
        .filter(|p| p.file_name().is_some_and(|n| globs.is_match(n)))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn discovers_only_top_level_markdown_files() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/SKILL.md", "skill");
        fs.add_file("/p/AGENTS.md", "agents");
        fs.add_file("/p/prompt.txt", "prompt");
        fs.add_file("/p/project.toml", "name = 'p'");
        fs.add_file("/p/nested/deep.md", "deep");

        let files = discover_instruction_files(&fs, Path::new("/p")).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("/p/AGENTS.md"), PathBuf::from("/p/SKILL.md")]
        );
    }
}
