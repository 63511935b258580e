// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `${variable}` interpolation with strict missing-key behavior: unlike a
//! pass-through-unchanged renderer, referencing an unknown variable here is
//! an error (§4.7).

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("unknown template variable ${{{0}}}")]
    UnknownVariable(String),
}

fn var_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_-]*)*)\}")
            .expect("static regex is valid")
    })
}

/// Replace every `${name}` in `template` with `vars[name]`. Returns
/// [`RenderError::UnknownVariable`] for the first reference to a name
/// absent from `vars`.
pub fn render(template: &str, vars: &HashMap<String, String>) -> Result<String, RenderError> {
    let mut missing = None;
    let rendered = var_pattern()
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            match vars.get(name) {
                Some(value) => value.clone(),
                None => {
                    if missing.is_none() {
                        missing = Some(name.to_string());
                    }
                    String::new()
                }
            }
        })
        .into_owned();

    match missing {
        Some(name) => Err(RenderError::UnknownVariable(name)),
        None => Ok(rendered),
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
