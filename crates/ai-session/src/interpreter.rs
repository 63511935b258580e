// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The streaming event interpreter (§4.5.1): turns the AI daemon's raw
//! event-bus lines into `prompt`/`thinking`/`response`/tool-start/tool-end
//! renderings, while the runner preserves the raw bytes untouched.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const SUMMARY_MAX_CHARS: usize = 160;

const TERMINAL_STATUSES: &[&str] =
    &["completed", "complete", "succeeded", "success", "failed", "error", "cancelled", "canceled"];

fn is_terminal(status: &str) -> bool {
    TERMINAL_STATUSES.iter().any(|s| s.eq_ignore_ascii_case(status))
}

/// A rendering the interpreter produced for one daemon event line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendering {
    Prompt(String),
    Thinking(String),
    Response(String),
    ToolStart(String),
    ToolEnd(String),
}

#[derive(Debug, Clone, Deserialize)]
struct RawMessage {
    id: String,
    role: String,
    #[serde(default)]
    completed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawPart {
    Text { text: String },
    Reasoning { text: String },
    Tool { id: String, tool: String, status: String, #[serde(default)] input: serde_json::Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum RawEvent {
    #[serde(rename = "message.updated")]
    MessageUpdated { message: RawMessage },
    #[serde(rename = "message.part.updated")]
    MessagePartUpdated { message_id: String, part: RawPart },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default)]
struct MessageState {
    role: String,
    text_parts: Vec<String>,
    reasoning_parts: Vec<String>,
    tool_status: HashMap<String, String>,
    emitted_prompt: bool,
    emitted_response: bool,
    emitted_thinking: bool,
}

/// Per-session interpreter state. One instance per AI session; `handle_line`
/// is called once per raw line the daemon emits.
#[derive(Debug, Default)]
pub struct Interpreter {
    messages: HashMap<String, MessageState>,
    repo_root: Option<std::path::PathBuf>,
}

impl Interpreter {
    pub fn new(repo_root: Option<std::path::PathBuf>) -> Self {
        Self { messages: HashMap::new(), repo_root }
    }

    /// Parse and interpret one raw daemon line. Lines that don't parse as a
    /// recognized event, or whose event type this interpreter's switch
    /// table suppresses, produce no renderings — the raw bytes are still
    /// preserved by the caller regardless (§4.5 step 5).
    pub fn handle_line(&mut self, line: &str) -> Vec<Rendering> {
        let Ok(event) = serde_json::from_str::<RawEvent>(line) else {
            return Vec::new();
        };
        match event {
            RawEvent::MessageUpdated { message } => self.handle_message_updated(message),
            RawEvent::MessagePartUpdated { message_id, part } => self.handle_part_updated(&message_id, part),
            RawEvent::Other => Vec::new(),
        }
    }

    fn handle_message_updated(&mut self, message: RawMessage) -> Vec<Rendering> {
        let state = self.messages.entry(message.id.clone()).or_default();
        state.role = message.role.clone();

        if message.role == "user" {
            if state.emitted_prompt {
                return Vec::new();
            }
            state.emitted_prompt = true;
            return vec![Rendering::Prompt(state.text_parts.join(""))];
        }

        if message.role == "assistant" && message.completed {
            let mut out = Vec::new();
            if !state.reasoning_parts.is_empty() && !state.emitted_thinking {
                state.emitted_thinking = true;
                out.push(Rendering::Thinking(state.reasoning_parts.join("")));
            }
            if !state.text_parts.is_empty() && !state.emitted_response {
                state.emitted_response = true;
                out.push(Rendering::Response(state.text_parts.join("")));
            }
            return out;
        }

        Vec::new()
    }

    fn handle_part_updated(&mut self, message_id: &str, part: RawPart) -> Vec<Rendering> {
        let state = self.messages.entry(message_id.to_string()).or_default();
        match part {
            RawPart::Text { text } => {
                state.text_parts.push(text);
                Vec::new()
            }
            RawPart::Reasoning { text } => {
                state.reasoning_parts.push(text);
                Vec::new()
            }
            RawPart::Tool { id, tool, status, input } => {
                let previous = state.tool_status.insert(id, status.clone());
                if previous.as_deref() == Some(status.as_str()) {
                    return Vec::new();
                }
                let summary =
                    summarize_tool(&tool, &input, self.repo_root.as_deref()).unwrap_or_else(|| tool.clone());
                if is_terminal(&status) {
                    vec![Rendering::ToolEnd(format!("Tool end: {summary}"))]
                } else {
                    vec![Rendering::ToolStart(format!("Tool start: {summary}"))]
                }
            }
            RawPart::Other => Vec::new(),
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

fn relative_path(repo_root: Option<&Path>, raw: &str) -> String {
    match repo_root {
        Some(root) => {
            Path::new(raw).strip_prefix(root).map(|p| p.display().to_string()).unwrap_or_else(|_| raw.to_string())
        }
        None => raw.to_string(),
    }
}

/// Canonicalize one tool call into the short human-readable summary shown
/// in `Tool start:`/`Tool end:` renderings (§4.5.1).
pub fn summarize_tool(tool: &str, input: &serde_json::Value, repo_root: Option<&Path>) -> Option<String> {
    let get_str = |key: &str| input.get(key).and_then(serde_json::Value::as_str);

    let summary = match tool {
        "read" | "write" | "edit" => {
            let path = get_str("file_path").or_else(|| get_str("path"))?;
            format!("{tool} file {}", quote(&relative_path(repo_root, path)))
        }
        "apply_patch" => {
            if let Some(patch) = get_str("patch") {
                let paths: Vec<String> = patch
                    .lines()
                    .filter_map(|l| l.strip_prefix("+++ "))
                    .map(|p| p.trim_start_matches("b/"))
                    .map(|p| quote(&relative_path(repo_root, p)))
                    .collect();
                if !paths.is_empty() {
                    format!("patch file {}", paths.join(", "))
                } else {
                    let path = get_str("file_path")?;
                    format!("patch file {}", quote(&relative_path(repo_root, path)))
                }
            } else {
                let path = get_str("file_path")?;
                format!("patch file {}", quote(&relative_path(repo_root, path)))
            }
        }
        "glob" | "grep" => {
            let verb = if tool == "glob" { "glob" } else { "search" };
            let pattern = get_str("pattern")?;
            match get_str("path") {
                Some(p) => format!("{verb} {} in {}", quote(pattern), relative_path(repo_root, p)),
                None => format!("{verb} {}", quote(pattern)),
            }
        }
        "bash" => {
            let command = get_str("command")?;
            if command.trim().is_empty() {
                return None;
            }
            format!("run {}", quote(command))
        }
        "webfetch" => format!("fetch {}", quote(get_str("url")?)),
        "question" => format!("ask {}", quote(get_str("text").or_else(|| get_str("question"))?)),
        _ => return None,
    };

    Some(truncate(&summary, SUMMARY_MAX_CHARS))
}

#[cfg(test)]
#[path = "interpreter_tests.rs"]
mod tests;
