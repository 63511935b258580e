// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parses the `.incrementum-feedback` file the AI writes at the end of a
//! review session, and owns its single-consumption (read-then-delete)
//! semantics.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use incrementum_core::ReviewOutcome;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("invalid feedback format: {0}")]
    InvalidFormat(String),
    #[error("reading feedback file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("deleting feedback file {path}: {source}")]
    Delete { path: String, #[source] source: std::io::Error },
    #[error("{path}: {parse_error}; additionally failed to delete the file: {delete_error}")]
    ParseAndDelete {
        path: String,
        #[source]
        parse_error: Box<FeedbackError>,
        delete_error: std::io::Error,
    },
}

/// A parsed review verdict: an outcome plus the free-form details the AI
/// gave for `abandon`/`request_changes` (always empty for `accept`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub outcome: ReviewOutcome,
    pub details: String,
}

impl Feedback {
    fn accept() -> Self {
        Self { outcome: ReviewOutcome::Accept, details: String::new() }
    }
}

/// Read, parse, and delete the feedback file at `path`. A missing file is
/// equivalent to `accept` (no parse error, nothing to delete). The file is
/// always deleted when present, even if parsing fails; a deletion error
/// encountered alongside a parse error is reported, with the parse error
/// taking precedence as the returned cause.
pub fn read_and_consume(path: &Path) -> Result<Feedback, FeedbackError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Feedback::accept()),
        Err(err) => return Err(FeedbackError::Read { path: path.display().to_string(), source: err }),
    };

    let parsed = parse(&text);

    if let Err(delete_err) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %delete_err, "failed to delete consumed feedback file");
        return Err(match parsed {
            Ok(_) => FeedbackError::Delete { path: path.display().to_string(), source: delete_err },
            Err(parse_err) => FeedbackError::ParseAndDelete {
                path: path.display().to_string(),
                parse_error: Box::new(parse_err),
                delete_error: delete_err,
            },
        });
    }

    parsed
}

/// Parse feedback text per the grammar: `<OUTCOME>\n\n<DETAILS>`. `ACCEPT`
/// alone (trailing content ignored) is always valid; `ABANDON`/
/// `REQUEST_CHANGES` require a blank-line separator followed by non-empty
/// details.
pub fn parse(text: &str) -> Result<Feedback, FeedbackError> {
    let mut lines = text.lines();
    let keyword = lines.next().unwrap_or("").trim();

    if keyword.eq_ignore_ascii_case("ACCEPT") {
        return Ok(Feedback::accept());
    }

    let outcome = if keyword.eq_ignore_ascii_case("ABANDON") {
        ReviewOutcome::Abandon
    } else if keyword.eq_ignore_ascii_case("REQUEST_CHANGES") {
        ReviewOutcome::RequestChanges
    } else {
        return Err(FeedbackError::InvalidFormat(format!("unrecognized outcome keyword {keyword:?}")));
    };

    let separator = lines.next().unwrap_or("not-blank");
    if !separator.trim().is_empty() {
        return Err(FeedbackError::InvalidFormat(
            "expected a blank line between the outcome and its details".into(),
        ));
    }

    let details: String = lines.collect::<Vec<_>>().join("\n");
    let details = details.trim_end_matches(['\n', '\r']).to_string();
    if details.trim().is_empty() {
        return Err(FeedbackError::InvalidFormat(format!(
            "{outcome} requires a non-empty details block"
        )));
    }

    Ok(Feedback { outcome, details })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
