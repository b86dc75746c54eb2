// src/config/loader.rs

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ProjectConfig, RawProjectConfig};
use crate::errors::{AgentPlaneError, Result};

/// File every project directory must contain.
pub const PROJECT_FILE: &str = "project.toml";

/// Discovers projects under a root directory.
///
/// Layout:
///
/// ```text
/// projects/
///   docs/
///     project.toml
///     SKILL.md
///     prompt.txt      (optional)
///   _shared/          (ignored: leading underscore)
/// ```
///
/// Every sub-directory that does not start with `_` or `.` is a project and
/// must contain [`PROJECT_FILE`]; a directory that breaks this convention is a
/// configuration error rather than being silently skipped.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Parse every project file without any conversion or semantic checks.
    ///
    /// Used by `validate`, which wants to report on projects that would not
    /// survive [`ConfigStore::load`].
    pub fn load_raw(&self) -> Result<Vec<RawProjectConfig>> {
        let mut projects = Vec::new();
        for dir in self.project_dirs()? {
            let file = dir.join(PROJECT_FILE);
            if !file.is_file() {
                return Err(AgentPlaneError::Config(format!(
                    "directory {:?} has no {PROJECT_FILE}; prefix its name with '_' to exclude it",
                    dir
                )));
            }
            let mut raw = load_project_file(&file)?;
            raw.source_dir = dir;
            projects.push(raw);
        }
        Ok(projects)
    }

    /// Load and structurally convert every project, sorted by name.
    ///
    /// Duplicate names are rejected. Path existence, instruction files and
    /// cron syntax are deliberately not checked here; see
    /// [`crate::config::validate_project`].
    pub fn load(&self) -> Result<Vec<ProjectConfig>> {
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut projects = Vec::new();

        for raw in self.load_raw()? {
            let project = ProjectConfig::try_from(raw)?;
            if let Some(first) = seen.get(&project.name) {
                return Err(AgentPlaneError::DuplicateProject {
                    name: project.name,
                    first: first.clone(),
                    second: project.source_dir,
                });
            }
            seen.insert(project.name.clone(), project.source_dir.clone());
            projects.push(project);
        }

        projects.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = projects.len(), root = ?self.root, "loaded projects");
        Ok(projects)
    }

    fn project_dirs(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(AgentPlaneError::Config(format!(
                "projects directory {:?} not found",
                self.root
            )));
        }

        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if name.starts_with('_') || name.starts_with('.') {
                debug!(dir = ?path, "skipping reserved directory");
                continue;
            }
            dirs.push(path);
        }
        dirs.sort();
        Ok(dirs)
    }
}

/// Read a single `project.toml`. Only performs TOML deserialization.
pub fn load_project_file(path: impl AsRef<Path>) -> Result<RawProjectConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    toml::from_str(&contents)
        .map_err(|e| AgentPlaneError::Config(format!("{}: {e}", path.display())))
}

/// Default projects root: `projects/` in the current working directory.
pub fn default_projects_dir() -> PathBuf {
    PathBuf::from("projects")
}
