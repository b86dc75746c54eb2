// src/config/validate.rs

use std::path::{Path, PathBuf};

use crate::config::model::{ProjectConfig, RawProjectConfig, ScheduleConfig, DEFAULT_TIMES};
use crate::engine::trigger::parse_cron;
use crate::errors::AgentPlaneError;
use crate::fs::FileSystem;
use crate::stage::discover_instruction_files;
use crate::types::Provider;

impl TryFrom<RawProjectConfig> for ProjectConfig {
    type Error = AgentPlaneError;

    /// Structural conversion only: required keys, provider whitelist and
    /// `times >= 1`. Filesystem state is not consulted.
    fn try_from(raw: RawProjectConfig) -> Result<Self, Self::Error> {
        let errors = structural_errors(&raw);
        if !errors.is_empty() {
            return Err(AgentPlaneError::Config(format!(
                "{}: {}",
                raw.source_dir.display(),
                errors.join(", ")
            )));
        }

        let provider = match raw.provider.as_deref() {
            Some(p) => p.parse::<Provider>().map_err(AgentPlaneError::Config)?,
            None => Provider::default(),
        };
        let (cron, times) = match raw.schedule {
            Some(s) => (s.cron, s.times.map_or(DEFAULT_TIMES, |t| t as u32)),
            None => (None, DEFAULT_TIMES),
        };

        Ok(ProjectConfig {
            name: raw.name.unwrap_or_default().trim().to_string(),
            path: PathBuf::from(raw.path.unwrap_or_default()),
            enabled: raw.enabled.unwrap_or(false),
            provider,
            schedule: ScheduleConfig {
                cron: cron.filter(|c| !c.trim().is_empty()),
                times,
            },
            source_dir: raw.source_dir,
        })
    }
}

/// Check one project, accumulating every applicable error.
///
/// Checks run in a fixed order and never short-circuit:
/// 1. required fields (`name`, `path`)
/// 2. target path exists
/// 3. provider is supported
/// 4. at least one instruction file under the project directory
/// 5. `schedule.times >= 1` and a parsable cron expression
///
/// Read-only: only queries `fs`. An empty result means the project is valid.
pub fn validate_project(raw: &RawProjectConfig, fs: &dyn FileSystem) -> Vec<String> {
    let mut errors = Vec::new();

    if is_blank(raw.name.as_deref()) {
        errors.push("missing name".to_string());
    }
    match raw.path.as_deref() {
        Some(path) if !path.trim().is_empty() => {
            if !fs.exists(Path::new(path)) {
                errors.push(format!("path not found: {path}"));
            }
        }
        _ => errors.push("missing path".to_string()),
    }

    if let Some(provider) = raw.provider.as_deref() {
        if let Err(e) = provider.parse::<Provider>() {
            errors.push(e);
        }
    }

    match discover_instruction_files(fs, &raw.source_dir) {
        Ok(files) if !files.is_empty() => {}
        _ => errors.push(format!(
            "no instruction files (*.md) found in {}",
            raw.source_dir.display()
        )),
    }

    if let Some(schedule) = &raw.schedule {
        if let Some(e) = times_error(schedule.times) {
            errors.push(e);
        }
        if let Some(cron) = schedule.cron.as_deref() {
            if let Err(e) = parse_cron(cron) {
                errors.push(format!("invalid cron expression '{cron}': {e}"));
            }
        }
    }

    errors
}

fn structural_errors(raw: &RawProjectConfig) -> Vec<String> {
    let mut errors = Vec::new();
    if is_blank(raw.name.as_deref()) {
        errors.push("missing name".to_string());
    }
    if is_blank(raw.path.as_deref()) {
        errors.push("missing path".to_string());
    }
    if let Some(Err(e)) = raw.provider.as_deref().map(str::parse::<Provider>) {
        errors.push(e);
    }
    if let Some(e) = raw.schedule.as_ref().and_then(|s| times_error(s.times)) {
        errors.push(e);
    }
    errors
}

fn times_error(times: Option<i64>) -> Option<String> {
    match times {
        Some(t) if t < 1 || t > u32::MAX as i64 => {
            Some(format!("schedule.times must be >= 1 (got {t})"))
        }
        _ => None,
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RawScheduleConfig;
    use crate::fs::mock::MockFileSystem;

    fn raw(name: &str, path: &str) -> RawProjectConfig {
        RawProjectConfig {
            name: Some(name.to_string()),
            path: Some(path.to_string()),
            source_dir: PathBuf::from("/projects/docs"),
            ..Default::default()
        }
    }

    #[test]
    fn conversion_applies_defaults() {
        let project = ProjectConfig::try_from(raw(" docs ", "/tmp/ws")).unwrap();

        assert_eq!(project.name, "docs");
        assert!(!project.enabled);
        assert_eq!(project.provider, Provider::Claude);
        assert_eq!(project.schedule, ScheduleConfig::default());
        assert_eq!(project.source_dir, PathBuf::from("/projects/docs"));
    }

    #[test]
    fn conversion_reports_all_structural_problems() {
        let mut r = RawProjectConfig {
            provider: Some("copilot".into()),
            schedule: Some(RawScheduleConfig {
                cron: None,
                times: Some(0),
            }),
            ..Default::default()
        };
        r.source_dir = PathBuf::from("/projects/broken");

        let err = ProjectConfig::try_from(r).unwrap_err().to_string();
        assert!(err.contains("missing name"), "{err}");
        assert!(err.contains("missing path"), "{err}");
        assert!(err.contains("invalid provider 'copilot'"), "{err}");
        assert!(err.contains("schedule.times must be >= 1"), "{err}");
    }

    #[test]
    fn validation_flags_bad_cron_and_missing_instructions() {
        let fs = MockFileSystem::new();
        fs.add_dir("/tmp/ws");
        fs.add_dir("/projects/docs");

        let mut r = raw("docs", "/tmp/ws");
        r.schedule = Some(RawScheduleConfig {
            cron: Some("every tuesday".into()),
            times: None,
        });

        let errors = validate_project(&r, &fs);
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors[0].starts_with("no instruction files"));
        assert!(errors[1].starts_with("invalid cron expression 'every tuesday'"));
    }
}
