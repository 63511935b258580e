// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId;
}

crate::define_opaque_id! {
    /// Test opaque ID type for macro verification.
    pub struct TestOpaqueId;
}

#[test]
fn generate_is_deterministic() {
    let a = generate(&["todo-123", "2024-03-02T09:12:00.000000000Z"]);
    let b = generate(&["todo-123", "2024-03-02T09:12:00.000000000Z"]);
    assert_eq!(a.as_str(), b.as_str());
}

#[test]
fn generate_is_exactly_ten_chars_over_alphabet() {
    let id = generate(&["todo-123", "2024-03-02T09:12:00.000000000Z"]);
    assert_eq!(id.as_str().len(), ID_LEN);
    assert!(id.as_str().bytes().all(|b| ALPHABET.contains(&b)));
}

#[test]
fn generate_changes_with_differing_seed_timestamp() {
    let a = generate(&["todo-123", "2024-03-02T09:12:00.000000000Z"]);
    let b = generate(&["todo-123", "2024-03-02T09:12:00.000000001Z"]);
    assert_ne!(a.as_str(), b.as_str());
}

#[test]
fn generate_changes_with_differing_source_id() {
    let a = generate(&["todo-123", "2024-03-02T09:12:00.000000000Z"]);
    let b = generate(&["todo-124", "2024-03-02T09:12:00.000000000Z"]);
    assert_ne!(a.as_str(), b.as_str());
}

#[test]
fn define_id_hash_map_lookup() {
    use std::collections::HashMap;
    let mut map = HashMap::new();
    let id = TestId::generate(&["a", "b"]);
    map.insert(id, 42);
    assert_eq!(map.get(&id), Some(&42));
}

#[test]
fn define_id_display_matches_inner() {
    let id = TestId::generate(&["a", "b"]);
    assert_eq!(format!("{id}"), id.as_str());
}

#[test]
fn define_id_round_trips_through_json() {
    let id = TestId::generate(&["a", "b"]);
    let json = serde_json::to_string(&id).unwrap();
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}

#[test]
fn define_id_rejects_wrong_length_on_deserialize() {
    let err = serde_json::from_str::<TestId>("\"short\"");
    assert!(err.is_err());
}

#[test]
fn define_opaque_id_wraps_arbitrary_length_strings() {
    let short = TestOpaqueId::new("a1b2c3");
    let long = TestOpaqueId::new("0123456789abcdef0123456789abcdef01234567");
    assert_eq!(short.as_str(), "a1b2c3");
    assert_eq!(long.as_str().len(), 41);
}
