#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use agentplane::config::{ProjectConfig, RawProjectConfig, RawScheduleConfig, ScheduleConfig};
use agentplane::types::Provider;

/// Builder for `ProjectConfig` to simplify test setup.
///
/// Defaults to an enabled `claude` project with no cron and `times = 1`.
pub struct ProjectConfigBuilder {
    project: ProjectConfig,
}

impl ProjectConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            project: ProjectConfig {
                name: name.to_string(),
                path: PathBuf::from("/tmp/ws"),
                enabled: true,
                provider: Provider::Claude,
                schedule: ScheduleConfig::default(),
                source_dir: PathBuf::from(format!("/projects/{name}")),
            },
        }
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.project.path = path.into();
        self
    }

    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project.source_dir = dir.into();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.project.enabled = enabled;
        self
    }

    pub fn provider(mut self, provider: Provider) -> Self {
        self.project.provider = provider;
        self
    }

    pub fn cron(mut self, cron: &str) -> Self {
        self.project.schedule.cron = Some(cron.to_string());
        self
    }

    pub fn times(mut self, times: u32) -> Self {
        self.project.schedule.times = times;
        self
    }

    pub fn build(self) -> ProjectConfig {
        self.project
    }
}

/// Builder for `RawProjectConfig`, i.e. a `project.toml` before conversion.
#[derive(Default)]
pub struct RawProjectConfigBuilder {
    raw: RawProjectConfig,
}

impl RawProjectConfigBuilder {
    /// An empty document: every key missing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(name: &str, path: &str) -> Self {
        Self::empty().name(name).path(path)
    }

    pub fn name(mut self, name: &str) -> Self {
        self.raw.name = Some(name.to_string());
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.raw.path = Some(path.to_string());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.raw.enabled = Some(enabled);
        self
    }

    pub fn provider(mut self, provider: &str) -> Self {
        self.raw.provider = Some(provider.to_string());
        self
    }

    pub fn schedule(mut self, cron: Option<&str>, times: Option<i64>) -> Self {
        self.raw.schedule = Some(RawScheduleConfig {
            cron: cron.map(str::to_string),
            times,
        });
        self
    }

    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw.source_dir = dir.into();
        self
    }

    pub fn build(self) -> RawProjectConfig {
        self.raw
    }
}

/// Create `<root>/<dir_name>/` with a `project.toml` and the given extra
/// files. Returns the project directory.
pub fn write_project_dir(
    root: &Path,
    dir_name: &str,
    project_toml: &str,
    files: &[(&str, &str)],
) -> PathBuf {
    let dir = root.join(dir_name);
    fs::create_dir_all(&dir).expect("create project dir");
    fs::write(dir.join("project.toml"), project_toml).expect("write project.toml");
    for (name, contents) in files {
        fs::write(dir.join(name), contents).expect("write project file");
    }
    dir
}
