//! Validation of attacker-influenced input before it reaches the filesystem
//! or a process argument vector.

use serde_json::{Map, Value};

use crate::scripts::ScriptError;

/// Characters removed from parameter values. `;`, `|` and `&` chain
/// commands; the rest substitute or redirect in shells.
pub const STRIPPED_CHARS: &[char] = &[';', '|', '&', '`', '$', '<', '>', '\n', '\r'];

/// Reject names that could escape the scripts directory.
///
/// Runs on the raw string, before any path is built.
pub fn validate_name(name: &str) -> Result<(), ScriptError> {
    let invalid = name.is_empty()
        || name.contains("..")
        || name.starts_with('/')
        || name.starts_with('\\')
        || name.contains('/')
        || name.contains('\\')
        || name.contains(':') // drive letters, alternate data streams
        || name.contains('\0');

    if invalid {
        tracing::error!(script = %name, "Path traversal attempt");
        return Err(ScriptError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Strip command chaining characters from a value.
pub fn sanitize_value(value: &str) -> String {
    value.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect()
}

/// Keys must not smuggle extra flags or `=` into the argument.
fn valid_key(key: &str) -> bool {
    key.starts_with(|c: char| c.is_ascii_alphanumeric())
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Text form of a parameter value. `None` for `null`.
fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Build `--key=value` arguments in the mapping's iteration order.
pub fn build_args(parameters: &Map<String, Value>) -> Result<Vec<String>, ScriptError> {
    let mut args = Vec::with_capacity(parameters.len());
    for (key, value) in parameters {
        if !valid_key(key) {
            return Err(ScriptError::InvalidParameter(key.clone()));
        }
        if let Some(raw) = render(value) {
            args.push(format!("--{}={}", key, sanitize_value(&raw)));
        }
    }
    Ok(args)
}
