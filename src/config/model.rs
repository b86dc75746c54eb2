// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::Provider;

/// Repetitions per fire event when `schedule.times` is omitted.
pub const DEFAULT_TIMES: u32 = 1;

/// One `project.toml` exactly as written on disk.
///
/// Every field is optional here so that the validator can report *all*
/// structural problems at once instead of failing on the first missing key:
///
/// ```toml
/// name = "docs"
/// path = "/srv/workspaces/docs"
/// enabled = true
/// provider = "claude"
///
/// [schedule]
/// cron = "0 * * * *"
/// times = 2
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawProjectConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Target workspace the provider runs in.
    #[serde(default)]
    pub path: Option<String>,

    /// Defaults to `false`: a project must opt in to being run.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Provider identifier; defaults to `claude`.
    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default)]
    pub schedule: Option<RawScheduleConfig>,

    /// Directory this file was loaded from. Computed by the loader, never
    /// read from the file.
    #[serde(skip)]
    pub source_dir: PathBuf,
}

/// `[schedule]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawScheduleConfig {
    #[serde(default)]
    pub cron: Option<String>,

    /// Signed so that `times = 0` or negatives reach the validator instead of
    /// failing deserialization.
    #[serde(default)]
    pub times: Option<i64>,
}

/// A structurally valid project, immutable for one load cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    pub path: PathBuf,
    pub enabled: bool,
    pub provider: Provider,
    pub schedule: ScheduleConfig,
    /// Directory holding the project's instruction files and prompt template.
    pub source_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Cron expression; projects without one can only be run on demand.
    pub cron: Option<String>,
    /// Sequential repetitions per fire event, always >= 1.
    pub times: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: None,
            times: DEFAULT_TIMES,
        }
    }
}

impl ProjectConfig {
    /// `cron (xN)` summary used in listings.
    pub fn schedule_summary(&self) -> String {
        let cron = self.schedule.cron.as_deref().unwrap_or("-");
        if self.schedule.times > 1 {
            format!("{cron} (x{})", self.schedule.times)
        } else {
            cron.to_string()
        }
    }
}

impl RawProjectConfig {
    /// Best-effort display name for validation reports.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .source_dir
                .file_name()
                .map(|n| format!("<{}>", n.to_string_lossy()))
                .unwrap_or_else(|| "<unnamed>".to_string()),
        }
    }
}
