//! Tool-usage detection over an agent's execution trace.
//!
//! A turn counts against the quota when the agent invoked a real tool,
//! i.e. any action other than the terminal `final_answer`.  The trace
//! is scanned newest-first and the scan stops at the first real action.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Action label of the terminal "produce the answer" step.
pub const FINAL_ANSWER_ACTION: &str = "final_answer";

/// One step the agent took during a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Tool name, or [`FINAL_ANSWER_ACTION`].  `None` for steps that
    /// only produced model text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TraceStep {
    pub fn action(name: impl Into<String>, observation: impl Into<String>) -> Self {
        Self {
            action: Some(name.into()),
            observation: Some(observation.into()),
            error: None,
        }
    }

    pub fn final_answer(answer: impl Into<String>) -> Self {
        Self::action(FINAL_ANSWER_ACTION, answer)
    }
}

fn is_tool_action(action: &str) -> bool {
    let action = action.trim();
    !action.is_empty() && action != FINAL_ANSWER_ACTION
}

/// Whether any step of `trace` invoked a tool other than `final_answer`.
pub fn was_tool_used(trace: &[TraceStep]) -> bool {
    trace
        .iter()
        .rev()
        .any(|step| step.action.as_deref().is_some_and(is_tool_action))
}

/// [`was_tool_used`] over a trace that may have failed to materialise.
/// Inspection errors count as "no tool used".
pub fn was_tool_used_in(trace: anyhow::Result<Vec<TraceStep>>) -> bool {
    match trace {
        Ok(steps) => was_tool_used(&steps),
        Err(e) => {
            debug!(error = %e, "trace unavailable, treating turn as tool-free");
            false
        }
    }
}

/// Classify an opaque JSON trace (an array of step objects).  Steps
/// without a string `action` are skipped; any other shape yields
/// `false`.
pub fn was_tool_used_json(trace: &Value) -> bool {
    let Some(steps) = trace.as_array() else {
        debug!("trace is not an array, treating turn as tool-free");
        return false;
    };
    steps
        .iter()
        .rev()
        .any(|step| step.get("action").and_then(Value::as_str).is_some_and(is_tool_action))
}
