// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commit-message file parsing (§6 "Commit message file") and final
//! commit-message formatting for todo and habit jobs (§6 "Final commit
//! message").

use incrementum_collab::SourceItem;

/// Default wrap width for the summary line of a formatted commit message
/// (§6).
pub const LINE_WIDTH: usize = 80;

fn non_empty_or_dash(s: &str) -> &str {
    if s.trim().is_empty() {
        "-"
    } else {
        s
    }
}

fn indent(text: &str, spaces: usize) -> String {
    textwrap::indent(non_empty_or_dash(text), &" ".repeat(spaces))
}

/// Split a commit-message file's raw text into its summary (first
/// non-blank line) and body (everything after the following blank
/// separator line, if any) per §6.
pub fn parse_commit_message_file(text: &str) -> (String, String) {
    let mut lines = text.lines().peekable();
    while lines.peek().is_some_and(|l| l.trim().is_empty()) {
        lines.next();
    }
    let summary = lines.next().unwrap_or("").trim_end().to_string();
    if lines.peek().is_some_and(|l| l.trim().is_empty()) {
        lines.next();
    }
    let body: String = lines.map(|l| l.trim_end()).collect::<Vec<_>>().join("\n");
    (summary, body.trim_end().to_string())
}

/// Format the final commit message for a todo or habit job (§6). `source`
/// distinguishes the two shapes; `review_comments` is only ever used for
/// habit jobs, and only when non-empty.
pub fn format_final_commit_message(summary: &str, body: &str, source: &SourceItem, review_comments: &str) -> String {
    let wrapped_summary = textwrap::fill(summary, LINE_WIDTH);

    let mut sections = vec![wrapped_summary, format!("Here is a generated commit message:\n{}", indent(body, 4))];

    match source {
        SourceItem::Todo { id, title, kind, priority, description } => {
            sections.push(format!(
                "This commit is a step towards implementing this todo:\n    ID: {id}\n    Title: {title}\n    Type: {kind}\n    Priority: {priority}\n    Description:\n{}",
                indent(description, 8)
            ));
        }
        SourceItem::Habit { name, instructions } => {
            sections.push(format!(
                "This commit was created as part of the '{name}' habit:\n{}",
                indent(instructions, 4)
            ));
            if !review_comments.trim().is_empty() {
                sections.push(format!("Review comments:\n{}", indent(review_comments, 4)));
            }
        }
    }

    sections.join("\n\n")
}

#[cfg(test)]
#[path = "commit_message_tests.rs"]
mod tests;
