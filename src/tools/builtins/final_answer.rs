//! Built-in `final_answer` tool: the terminal action of a turn.
//!
//! The agent loop intercepts this call and ends the turn with the
//! given answer; it is registered so the model sees it advertised.

use serde_json::Value;

use crate::tools::{handler, single_string_schema, str_arg, ToolMeta, ToolRegistry};
use crate::trace::FINAL_ANSWER_ACTION;

/// Extract the answer text from `final_answer` arguments.  A missing
/// `answer` field falls back to the raw argument JSON.
pub fn answer_from_args(args: &Value) -> String {
    match args.get("answer") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => args.to_string(),
    }
}

pub fn register(registry: &mut ToolRegistry) {
    registry.register(
        ToolMeta {
            name: FINAL_ANSWER_ACTION.into(),
            description: "Provides the final answer to the user's request and ends the turn. \
                          To return a generated image, pass its file path as the answer."
                .into(),
            args_schema: single_string_schema("answer", "The final answer to the problem."),
        },
        handler(|args| async move {
            Ok::<_, anyhow::Error>(str_arg(&args, "answer")?.to_string())
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn answer_extraction() {
        assert_eq!(answer_from_args(&json!({"answer": "42"})), "42");
        assert_eq!(answer_from_args(&json!({"answer": 42})), "42");
        assert_eq!(answer_from_args(&json!({"x": 1})), r#"{"x":1}"#);
    }
}
