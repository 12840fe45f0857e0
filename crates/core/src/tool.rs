//! Tool shapes and tool-call plans.
//!
//! A [`ToolShape`] is what the model is told a tool looks like. A
//! [`ToolCallPlan`] is what the model asked for, decided once at the model
//! boundary: either a well-formed `{name, args}` pair or `Unparsed`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arguments of a tool call, as sent by the model.
pub type ToolArgs = serde_json::Map<String, Value>;

/// The declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    StringList,
}

impl ParamKind {
    fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::StringList => "string[]",
        }
    }
}

/// One parameter of a tool shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamShape {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default)]
    pub optional: bool,
}

impl ParamShape {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: true,
        }
    }
}

/// The advisory shape of a tool, used only to prompt the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolShape {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamShape>,
}

impl ToolShape {
    /// Compact signature, e.g. `cmd.run { cmd: string, cwd?: string }`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                format!(
                    "{}{}: {}",
                    p.name,
                    if p.optional { "?" } else { "" },
                    p.kind.as_str()
                )
            })
            .collect();
        format!("{} {{ {} }}", self.name, params.join(", "))
    }

    /// Render a catalog of shapes as prompt text for the model.
    pub fn catalog(shapes: &[ToolShape]) -> String {
        let mut out = String::from(
            "Available tools. Reply with exactly one JSON object {\"tool\": <name>, \"args\": {...}}.\n",
        );
        for shape in shapes {
            out.push_str(&format!("- {}: {}\n", shape.signature(), shape.description));
        }
        out
    }
}

/// Placeholder name reported for a model reply that held no usable tool name.
pub const UNPARSED_TOOL_NAME: &str = "(unparsed)";

/// The model's choice of the next tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallPlan {
    /// A tool name plus arguments. The name may still be unknown to the registry.
    Parsed { name: String, args: ToolArgs },
    /// The reply could not be read as a tool call.
    Unparsed { raw: String },
}

impl ToolCallPlan {
    pub fn parsed(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => ToolArgs::new(),
        };
        Self::Parsed {
            name: name.into(),
            args,
        }
    }

    /// Name to report in events and history.
    pub fn name(&self) -> &str {
        match self {
            Self::Parsed { name, .. } => name,
            Self::Unparsed { .. } => UNPARSED_TOOL_NAME,
        }
    }

    /// Arguments; empty for an unparsed reply.
    pub fn args(&self) -> ToolArgs {
        match self {
            Self::Parsed { args, .. } => args.clone(),
            Self::Unparsed { .. } => ToolArgs::new(),
        }
    }

    /// Decode a model reply.
    ///
    /// Accepts `tool` or `name` for the tool name and `args` or `arguments`
    /// for the arguments. The JSON object may be bare, fenced, or embedded
    /// in prose. Never fails: anything unreadable becomes `Unparsed`.
    pub fn from_model_output(text: &str) -> Self {
        match extract_json_object(text) {
            Some(value) => Self::from_value(value, text),
            None => Self::Unparsed {
                raw: text.to_string(),
            },
        }
    }

    fn from_value(value: Value, raw: &str) -> Self {
        let Value::Object(mut obj) = value else {
            return Self::Unparsed { raw: raw.to_string() };
        };

        let name = match first_present(&mut obj, &["tool", "name"]) {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            _ => return Self::Unparsed { raw: raw.to_string() },
        };

        let args = match first_present(&mut obj, &["args", "arguments"]) {
            Some(Value::Object(map)) => map,
            // OpenAI function-calling style: arguments as a JSON string
            Some(Value::String(s)) => match serde_json::from_str::<Value>(&s) {
                Ok(Value::Object(map)) => map,
                _ => ToolArgs::new(),
            },
            _ => ToolArgs::new(),
        };

        Self::Parsed { name, args }
    }
}

/// Take the first key that is present and not null.
fn first_present(obj: &mut ToolArgs, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .filter_map(|k| obj.remove(*k))
        .find(|v| !v.is_null())
}

fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.trim_end().strip_suffix("```"));
    if let Some(inner) = unfenced
        && let Ok(value) = serde_json::from_str::<Value>(inner.trim())
    {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run_shape() -> ToolShape {
        ToolShape {
            name: "cmd.run".into(),
            description: "Run a shell command".into(),
            params: vec![
                ParamShape::required("cmd", ParamKind::String),
                ParamShape::optional("cwd", ParamKind::String),
            ],
        }
    }

    #[test]
    fn signature_marks_optional_params() {
        assert_eq!(run_shape().signature(), "cmd.run { cmd: string, cwd?: string }");
    }

    #[test]
    fn catalog_lists_every_shape() {
        let catalog = ToolShape::catalog(&[run_shape()]);
        assert!(catalog.contains("- cmd.run { cmd: string, cwd?: string }: Run a shell command"));
        assert!(catalog.contains("\"tool\""));
    }

    #[test]
    fn parses_tool_and_args_keys() {
        let plan = ToolCallPlan::from_model_output(r#"{"tool":"cmd.run","args":{"cmd":"ls -la"}}"#);
        assert_eq!(plan.name(), "cmd.run");
        assert_eq!(plan.args()["cmd"], "ls -la");
    }

    #[test]
    fn parses_name_and_arguments_keys() {
        let plan =
            ToolCallPlan::from_model_output(r#"{"name":"fs.read","arguments":{"path":"a.txt"}}"#);
        assert_eq!(
            plan,
            ToolCallPlan::parsed("fs.read", json!({"path": "a.txt"}))
        );
    }

    #[test]
    fn arguments_may_be_an_encoded_string() {
        let plan = ToolCallPlan::from_model_output(
            r#"{"name":"fs.read","arguments":"{\"path\":\"b.txt\"}"}"#,
        );
        assert_eq!(plan.args()["path"], "b.txt");
    }

    #[test]
    fn fenced_json_is_accepted() {
        let plan = ToolCallPlan::from_model_output(
            "```json\n{\"tool\":\"fs.read\",\"args\":{\"path\":\"x\"}}\n```",
        );
        assert_eq!(plan.name(), "fs.read");
    }

    #[test]
    fn json_embedded_in_prose_is_accepted() {
        let plan = ToolCallPlan::from_model_output(
            "Sure, next I will read it: {\"tool\":\"fs.read\",\"args\":{\"path\":\"x\"}} ok?",
        );
        assert_eq!(plan.name(), "fs.read");
    }

    #[test]
    fn missing_args_become_empty_map() {
        let plan = ToolCallPlan::from_model_output(r#"{"tool":"cmd.run"}"#);
        assert_eq!(plan.name(), "cmd.run");
        assert!(plan.args().is_empty());
    }

    #[test]
    fn garbage_is_unparsed() {
        let plan = ToolCallPlan::from_model_output("I think we should run the tests");
        assert!(matches!(plan, ToolCallPlan::Unparsed { .. }));
        assert_eq!(plan.name(), UNPARSED_TOOL_NAME);
        assert!(plan.args().is_empty());
    }

    #[test]
    fn non_string_tool_name_is_unparsed() {
        let plan = ToolCallPlan::from_model_output(r#"{"tool":42,"args":{}}"#);
        assert!(matches!(plan, ToolCallPlan::Unparsed { .. }));
    }

    #[test]
    fn null_tool_falls_back_to_name() {
        let plan = ToolCallPlan::from_model_output(r#"{"tool":null,"name":"fs.write","args":{}}"#);
        assert_eq!(plan.name(), "fs.write");
    }
}
