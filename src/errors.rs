// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentPlaneError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("duplicate project name '{name}' in {first:?} and {second:?}")]
    DuplicateProject {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("staging {path:?} failed (workspace reverted): {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("revert left {} file(s) unrestored: {}", .failures.len(), .failures.join("; "))]
    Revert { failures: Vec<String> },

    #[error("prompt template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AgentPlaneError>;

/// Render an error and all of its sources as `outer: inner: root`.
pub fn display_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}
