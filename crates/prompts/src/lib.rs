// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt template loading and rendering: the "Prompt" half of the ID +
//! Prompt Facade (§4.7). Default templates ship embedded in the binary;
//! a workspace may override any of them under `.incrementum/templates/`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod template;

pub use template::{render, RenderError};

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template name must not be blank")]
    BlankName,
    #[error("no such template: {0}")]
    NotFound(String),
    #[error("reading template override at {path}: {source}")]
    ReadOverride { path: String, #[source] source: std::io::Error },
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// The fixed set of templates the orchestrator renders. Each maps to an
/// embedded default and an overridable filename under
/// `.incrementum/templates/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateName {
    Implement,
    Feedback,
    ReviewStep,
    ReviewProject,
    CommitMessage,
    ReviewQuestions,
}

impl TemplateName {
    pub fn file_name(self) -> &'static str {
        match self {
            TemplateName::Implement => "implement.tmpl",
            TemplateName::Feedback => "feedback.tmpl",
            TemplateName::ReviewStep => "review-step.tmpl",
            TemplateName::ReviewProject => "review-project.tmpl",
            TemplateName::CommitMessage => "commit-message.tmpl",
            TemplateName::ReviewQuestions => "review-questions.tmpl",
        }
    }
}

fn embedded_default(name: &str) -> Option<&'static str> {
    match name {
        "implement.tmpl" => Some(include_str!("templates/implement.tmpl")),
        "feedback.tmpl" => Some(include_str!("templates/feedback.tmpl")),
        "review-step.tmpl" => Some(include_str!("templates/review-step.tmpl")),
        "review-project.tmpl" => Some(include_str!("templates/review-project.tmpl")),
        "commit-message.tmpl" => Some(include_str!("templates/commit-message.tmpl")),
        "review-questions.tmpl" => Some(include_str!("templates/review-questions.tmpl")),
        _ => None,
    }
}

/// Resolves template text by name, override-first. The concrete source of
/// "workspace" (a path vs. a remote fetch) is left to the implementation;
/// [`FilesystemPromptSource`] covers the common on-disk case.
pub trait PromptSource: Send + Sync {
    fn load(&self, workspace: &Path, name: &str) -> Result<String, PromptError>;
}

/// Looks up `<workspace>/.incrementum/templates/<name>`, falling back to
/// the embedded default when absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemPromptSource;

impl PromptSource for FilesystemPromptSource {
    fn load(&self, workspace: &Path, name: &str) -> Result<String, PromptError> {
        if name.trim().is_empty() {
            return Err(PromptError::BlankName);
        }

        let override_path = workspace.join(".incrementum").join("templates").join(name);
        match std::fs::read_to_string(&override_path) {
            Ok(text) => return Ok(text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(PromptError::ReadOverride { path: override_path.display().to_string(), source })
            }
        }

        embedded_default(name).map(str::to_string).ok_or_else(|| PromptError::NotFound(name.to_string()))
    }
}

/// The variables a rendered prompt draws on (§4.7): the source item, prior
/// feedback/message/commits/transcripts, the workspace path, review
/// instructions, and pre-rendered blocks so templates can embed formatted
/// sections without re-rendering them.
#[derive(Debug, Clone, Default)]
pub struct PromptVars {
    pub source_item: String,
    pub feedback: String,
    pub prior_message: String,
    pub commit_log: String,
    pub prior_transcripts: String,
    pub workspace_path: String,
    pub review_instructions: String,
    pub todo_block: String,
    pub feedback_block: String,
    pub commit_message_block: String,
}

impl PromptVars {
    fn to_map(&self) -> HashMap<String, String> {
        HashMap::from([
            ("source_item".to_string(), self.source_item.clone()),
            ("feedback".to_string(), self.feedback.clone()),
            ("prior_message".to_string(), self.prior_message.clone()),
            ("commit_log".to_string(), self.commit_log.clone()),
            ("prior_transcripts".to_string(), self.prior_transcripts.clone()),
            ("workspace_path".to_string(), self.workspace_path.clone()),
            ("review_instructions".to_string(), self.review_instructions.clone()),
            ("todo_block".to_string(), self.todo_block.clone()),
            ("feedback_block".to_string(), self.feedback_block.clone()),
            ("commit_message_block".to_string(), self.commit_message_block.clone()),
        ])
    }
}

/// Load and render `name`, with the `review_questions` named block (§4.7)
/// always resolved and merged in so every template may reference it.
pub fn render_prompt(
    source: &dyn PromptSource,
    workspace: &Path,
    name: TemplateName,
    vars: &PromptVars,
) -> Result<String, PromptError> {
    let template_text = source.load(workspace, name.file_name())?;
    let review_questions = source.load(workspace, TemplateName::ReviewQuestions.file_name())?;

    let mut map = vars.to_map();
    map.insert("review_questions".to_string(), review_questions);

    Ok(template::render(&template_text, &map)?)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
