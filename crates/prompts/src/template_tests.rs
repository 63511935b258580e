// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn substitutes_known_variables() {
    let out = render("hello ${name}", &vars(&[("name", "world")])).unwrap();
    assert_eq!(out, "hello world");
}

#[test]
fn supports_dotted_namespaced_names() {
    let out = render("${todo.title}", &vars(&[("todo.title", "Fix bug")])).unwrap();
    assert_eq!(out, "Fix bug");
}

#[test]
fn unknown_variable_is_an_error_not_passthrough() {
    let err = render("hello ${missing}", &vars(&[])).unwrap_err();
    assert_eq!(err, RenderError::UnknownVariable("missing".into()));
}

#[test]
fn multiple_known_variables_all_substitute() {
    let out = render("${a}-${b}-${a}", &vars(&[("a", "1"), ("b", "2")])).unwrap();
    assert_eq!(out, "1-2-1");
}
