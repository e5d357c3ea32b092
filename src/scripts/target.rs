//! Request-scoped values produced by the registry and dispatcher.

use serde::Serialize;
use serde_json::{Map, Value};

/// An executable file in the scripts directory.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScriptTarget {
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    /// Seconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<f64>,
}

/// Outcome of one dispatch. Serialized as the `/run-script` response body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DispatchResult {
    pub script_name: String,
    /// Parameters exactly as received.
    pub parameters: Map<String, Value>,
    pub return_code: i32,
    pub success: bool,
    /// Decoded JSON when stdout parses, the raw text otherwise.
    pub output: Value,
    /// Captured stderr, if any.
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn new(
        script_name: String,
        parameters: Map<String, Value>,
        return_code: i32,
        stdout: String,
        stderr: String,
    ) -> Self {
        Self {
            script_name,
            parameters,
            return_code,
            success: return_code == 0,
            output: decode_output(stdout),
            error: (!stderr.is_empty()).then_some(stderr),
        }
    }
}

/// Structured value if `stdout` is JSON, otherwise the text unchanged.
pub fn decode_output(stdout: String) -> Value {
    match serde_json::from_str::<Value>(&stdout) {
        Ok(value) => value,
        Err(e) => {
            if !stdout.is_empty() {
                tracing::warn!(error = %e, preview = %preview(&stdout), "Could not parse output as JSON");
            }
            Value::String(stdout)
        }
    }
}

/// First 200 characters, for logs.
pub(crate) fn preview(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_tracks_exit_code() {
        let ok = DispatchResult::new("a.py".into(), Map::new(), 0, "{}".into(), String::new());
        assert!(ok.success);
        assert_eq!(ok.error, None);

        let failed = DispatchResult::new("a.py".into(), Map::new(), 2, String::new(), "boom\n".into());
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("boom\n"));
        assert_eq!(failed.output, json!(""));
    }

    #[test]
    fn test_decode_output() {
        assert_eq!(decode_output("{\"a\": 1}\n".into()), json!({"a": 1}));
        assert_eq!(decode_output("plain text".into()), json!("plain text"));
        assert_eq!(decode_output("{\"a\": 1}\n{\"b\": 2}".into()), json!("{\"a\": 1}\n{\"b\": 2}"));
    }

    #[test]
    fn test_serialized_shape() {
        let mut params = Map::new();
        params.insert("category".into(), json!("Sales"));
        let result = DispatchResult::new("r.py".into(), params, 0, "[1,2]".into(), String::new());

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "script_name": "r.py",
                "parameters": {"category": "Sales"},
                "return_code": 0,
                "success": true,
                "output": [1, 2],
                "error": null
            })
        );
    }

    #[test]
    fn test_target_omits_missing_help() {
        let target = ScriptTarget {
            name: "x.py".into(),
            path: "/s/x.py".into(),
            size: 10,
            help_text: None,
            modified_time: None,
        };
        assert_eq!(
            serde_json::to_value(&target).unwrap(),
            json!({"name": "x.py", "path": "/s/x.py", "size": 10})
        );
    }

    #[test]
    fn test_preview_is_char_bounded() {
        let long = "é".repeat(300);
        assert_eq!(preview(&long).chars().count(), 200);
        assert_eq!(preview("short"), "short");
    }
}
