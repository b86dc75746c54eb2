// src/runner/prompt.rs

//! Prompt rendering.
//!
//! A project may ship a `prompt.txt` next to its `project.toml`. It is a
//! minijinja template whose only variables describe the project itself:
//! `{{ project.name }}`, `{{ project.provider }}` and `{{ project.path }}`.

use minijinja::{context, Environment, UndefinedBehavior};

use crate::config::ProjectConfig;
use crate::errors::Result;
use crate::fs::FileSystem;

pub const PROMPT_TEMPLATE_FILE: &str = "prompt.txt";

/// Render the project's prompt, or an empty string when it has none.
pub fn render_prompt(fs: &dyn FileSystem, project: &ProjectConfig) -> Result<String> {
    let path = project.source_dir.join(PROMPT_TEMPLATE_FILE);
    if !fs.is_file(&path) {
        return Ok(String::new());
    }
    let template = fs.read_to_string(&path)?;
    render_template(&template, project)
}

pub fn render_template(template: &str, project: &ProjectConfig) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    let ctx = context! {
        project => context! {
            name => project.name.as_str(),
            provider => project.provider.as_str(),
            path => project.path.display().to_string(),
        },
    };
    Ok(env.render_str(template, ctx)?)
}
