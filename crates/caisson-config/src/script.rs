//! The common script schema shared by aliases and hooks.

use serde_yaml::Value;

use crate::error::{Error, Result};

/// Normalize a script-type node into an ordered list of command lines.
///
/// Accepted shapes:
/// - a plain string: the one-line script itself;
/// - a mapping with a `script` key whose value is a string or a non-empty
///   list of strings. A list entry may itself be a list (as produced by
///   `!from_yaml` inclusion); nesting is flattened here, so callers always
///   see a flat, non-empty sequence of lines.
///
/// `name` scopes error messages (an alias name, `hooks.root`, ...).
pub fn normalize_script(node: &Value, name: &str) -> Result<Vec<String>> {
    match node {
        Value::String(line) => Ok(vec![line.clone()]),
        Value::Mapping(map) => {
            // An empty string, empty list, or null script is as useless as a
            // missing one and gets the same error.
            let script = match map.get("script") {
                None | Some(Value::Null) => None,
                Some(Value::String(line)) if line.is_empty() => None,
                Some(Value::Sequence(seq)) if seq.is_empty() => None,
                other => other,
            };
            let Some(script) = script else {
                return Err(Error::ScriptMissing {
                    name: name.to_string(),
                });
            };
            match script {
                Value::String(line) => Ok(vec![line.clone()]),
                Value::Sequence(seq) => {
                    let mut lines = Vec::with_capacity(seq.len());
                    push_lines(seq, name, &mut lines)?;
                    Ok(lines)
                }
                _ => Err(Error::ScriptValue {
                    name: name.to_string(),
                }),
            }
        }
        _ => Err(Error::ScriptShape {
            name: name.to_string(),
        }),
    }
}

fn push_lines(seq: &[Value], name: &str, out: &mut Vec<String>) -> Result<()> {
    for entry in seq {
        match entry {
            Value::String(line) => out.push(line.clone()),
            Value::Sequence(nested) => push_lines(nested, name, out)?,
            _ => {
                return Err(Error::ScriptValue {
                    name: name.to_string(),
                });
            }
        }
    }
    Ok(())
}
