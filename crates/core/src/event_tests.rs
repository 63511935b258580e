// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job::Stage;
use serde_json::json;

#[test]
fn stage_event_name_and_roundtrip() {
    let event = Event::Stage { stage: Stage::Testing };
    assert_eq!(event.name(), "job.stage");
    let line = event.clone().into_log_line(None).unwrap();
    assert_eq!(line.name, "job.stage");
    assert_eq!(line.id, None);

    let data: serde_json::Value = serde_json::from_str(&line.data).unwrap();
    assert_eq!(data, json!({ "stage": "testing" }));
}

#[test]
fn prompt_event_carries_correlation_id() {
    let event = Event::Prompt {
        purpose: Purpose::Implement,
        template: "implement.md".into(),
        prompt: "do the thing".into(),
    };
    let line = event.into_log_line(Some("sess-1".into())).unwrap();
    assert_eq!(line.id.as_deref(), Some("sess-1"));
    let data: serde_json::Value = serde_json::from_str(&line.data).unwrap();
    assert_eq!(data["purpose"], json!("implement"));
    assert_eq!(data["prompt"], json!("do the thing"));
}

#[test]
fn commit_message_event_roundtrips_label() {
    let event = Event::CommitMessage {
        label: CommitMessageLabel::Final,
        message: "fix: widget".into(),
        preformatted: Some(true),
    };
    let line = event.into_log_line(None).unwrap();
    let data: serde_json::Value = serde_json::from_str(&line.data).unwrap();
    assert_eq!(data["label"], json!("final"));
    assert_eq!(data["preformatted"], json!(true));
}

#[test]
fn review_event_omits_details_field_is_preserved_as_null() {
    let event = Event::Review { purpose: Purpose::Review, outcome: ReviewOutcome::Accept, details: None };
    let line = event.into_log_line(None).unwrap();
    let data: serde_json::Value = serde_json::from_str(&line.data).unwrap();
    assert_eq!(data["outcome"], json!("accept"));
    assert_eq!(data["details"], serde_json::Value::Null);
}

#[test]
fn tests_event_carries_per_command_results() {
    let event = Event::Tests {
        results: vec![
            TestCommandResult { command: "cargo test".into(), exit_code: 0 },
            TestCommandResult { command: "cargo clippy".into(), exit_code: 1 },
        ],
    };
    let line = event.into_log_line(None).unwrap();
    let data: serde_json::Value = serde_json::from_str(&line.data).unwrap();
    assert_eq!(data["results"][1]["exit_code"], json!(1));
}

#[test]
fn opencode_end_event_carries_session_and_exit_code() {
    let event = Event::OpencodeEnd {
        purpose: Purpose::Implement,
        session_id: "sess-123".into(),
        exit_code: 0,
    };
    let line = event.into_log_line(None).unwrap();
    assert_eq!(line.name, "job.opencode.end");
    let data: serde_json::Value = serde_json::from_str(&line.data).unwrap();
    assert_eq!(data["session_id"], json!("sess-123"));
}

#[test]
fn passthrough_event_uses_original_name_on_the_wire() {
    let event = Event::Passthrough {
        original_name: "tool.call.start".into(),
        raw: json!({ "tool": "edit" }),
    };
    let line = event.into_log_line(None).unwrap();
    assert_eq!(line.name, "tool.call.start");
    let data: serde_json::Value = serde_json::from_str(&line.data).unwrap();
    assert_eq!(data, json!({ "tool": "edit" }));
}

#[test]
fn from_log_line_round_trips_known_events() {
    let event = Event::Tests {
        results: vec![TestCommandResult { command: "cargo test".into(), exit_code: 0 }],
    };
    let line = event.clone().into_log_line(None).unwrap();
    let back = Event::from_log_line(&line).unwrap();
    assert_eq!(back, event);
}

#[test]
fn from_log_line_defaults_unknown_names_to_passthrough() {
    let line = LogLine { id: None, name: "tool.call.start".into(), data: json!({"tool": "edit"}).to_string() };
    let back = Event::from_log_line(&line).unwrap();
    assert_eq!(
        back,
        Event::Passthrough { original_name: "tool.call.start".into(), raw: json!({"tool": "edit"}) }
    );
}

#[test]
fn log_line_skips_id_field_when_none() {
    let event = Event::Stage { stage: Stage::Implementing };
    let line = event.into_log_line(None).unwrap();
    let json = serde_json::to_string(&line).unwrap();
    assert!(!json.contains("\"id\""));
}
