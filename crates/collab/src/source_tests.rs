// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn todo_source_id_is_its_own_id() {
    let item = SourceItem::Todo {
        id: "todo-1".into(),
        title: "Fix the thing".into(),
        kind: "bug".into(),
        priority: "high".into(),
        description: "it's broken".into(),
    };
    assert_eq!(item.source_id(), "todo-1");
    assert!(!item.is_habit());
}

#[test]
fn habit_source_id_is_prefixed() {
    let item = SourceItem::Habit { name: "lint".into(), instructions: "run clippy".into() };
    assert_eq!(item.source_id(), "habit:lint");
    assert!(item.is_habit());
}
