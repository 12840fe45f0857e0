//! Typed access to loosely-typed tool arguments.

use codeflow_core::{ToolArgs, ToolError};
use serde_json::Value;

fn invalid(tool: &str, reason: String) -> ToolError {
    ToolError::InvalidArguments {
        tool_name: tool.to_string(),
        reason,
    }
}

/// A required string argument.
pub fn required_str<'a>(args: &'a ToolArgs, tool: &str, key: &str) -> Result<&'a str, ToolError> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(invalid(
            tool,
            format!("'{key}' must be a string, got {}", type_name(other)),
        )),
        None => Err(invalid(tool, format!("missing '{key}' argument"))),
    }
}

/// An optional string argument; `null` counts as absent.
pub fn optional_str<'a>(
    args: &'a ToolArgs,
    tool: &str,
    key: &str,
) -> Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(invalid(
            tool,
            format!("'{key}' must be a string, got {}", type_name(other)),
        )),
    }
}

/// A required list of strings. A single string is split on whitespace.
pub fn string_list(args: &ToolArgs, tool: &str, key: &str) -> Result<Vec<String>, ToolError> {
    match args.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(invalid(
                    tool,
                    format!("'{key}' must hold strings, got {}", type_name(other)),
                )),
            })
            .collect(),
        Some(Value::String(s)) => Ok(s.split_whitespace().map(String::from).collect()),
        Some(other) => Err(invalid(
            tool,
            format!("'{key}' must be a list of strings, got {}", type_name(other)),
        )),
        None => Err(invalid(tool, format!("missing '{key}' argument"))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn required_string() {
        let a = args(json!({"path": "a.txt", "n": 3}));
        assert_eq!(required_str(&a, "fs.read", "path").unwrap(), "a.txt");

        let err = required_str(&a, "fs.read", "n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid tool arguments for fs.read: 'n' must be a string, got number"
        );
        assert!(required_str(&a, "fs.read", "missing").is_err());
    }

    #[test]
    fn optional_string() {
        let a = args(json!({"cwd": null, "other": "x"}));
        assert_eq!(optional_str(&a, "cmd.run", "cwd").unwrap(), None);
        assert_eq!(optional_str(&a, "cmd.run", "other").unwrap(), Some("x"));
        assert_eq!(optional_str(&a, "cmd.run", "absent").unwrap(), None);
    }

    #[test]
    fn list_from_array_or_string() {
        let a = args(json!({"pkgs": ["vitest", "tsx"]}));
        assert_eq!(string_list(&a, "pkg.install", "pkgs").unwrap(), vec!["vitest", "tsx"]);

        let a = args(json!({"pkgs": "vitest  tsx"}));
        assert_eq!(string_list(&a, "pkg.install", "pkgs").unwrap(), vec!["vitest", "tsx"]);

        let a = args(json!({"pkgs": ["vitest", 1]}));
        assert!(string_list(&a, "pkg.install", "pkgs").is_err());
    }
}
