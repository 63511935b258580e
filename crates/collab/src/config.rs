// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository configuration: test commands, model selections, and
//! filesystem locations the orchestrator needs but does not itself own
//! the format of.

use incrementum_core::ModelSelections;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config at {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("parsing config at {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
    #[error("{0} requires at least one test command")]
    NoTestCommands(String),
}

/// Per-repo configuration resolved by the surrounding CLI (out of scope
/// per §1) and handed to the orchestrator as a plain value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub repo: String,
    pub workspace: PathBuf,
    /// Shell strings run sequentially by the test worker (§4.3.2). Empty
    /// is a fatal configuration error at the point of use, not at load.
    #[serde(default)]
    pub test_commands: Vec<String>,
    pub models: ModelSelections,
    /// Directory overriding embedded default prompt templates, relative to
    /// `workspace` (§4.7).
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from(".incrementum/templates")
}

impl Config {
    /// Fail fast with a contextual error if no test commands are configured
    /// (§4.3.2 step 1).
    pub fn require_test_commands(&self) -> Result<&[String], ConfigError> {
        if self.test_commands.is_empty() {
            return Err(ConfigError::NoTestCommands(self.repo.clone()));
        }
        Ok(&self.test_commands)
    }
}

/// Loads a [`Config`] for a repo. The concrete source (TOML file, daemon
/// RPC, in-memory fixture) is a collaborator concern, out of scope here.
pub trait ConfigLoader: Send + Sync {
    fn load(&self, repo: &str) -> Result<Config, ConfigError>;
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
