// src/config/mod.rs

//! Project configuration.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Discover and load project directories from disk (`loader.rs`).
//! - Check projects for structural and environmental problems (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_projects_dir, load_project_file, ConfigStore, PROJECT_FILE};
pub use model::{ProjectConfig, RawProjectConfig, RawScheduleConfig, ScheduleConfig};
pub use validate::validate_project;
