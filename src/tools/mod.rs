//! Tool registry.
//!
//! A [`ToolRegistry`] maps tool names to their [`ToolMeta`] (name,
//! description, JSON-Schema for arguments) and an async handler.  The
//! agent advertises [`ToolRegistry::function_defs`] to the model and
//! dispatches the model's calls through [`ToolRegistry::call`].
//!
//! Built-in tools live in [`builtins`]; call
//! [`builtins::register_all`] once when assembling an agent.

pub mod builtins;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

/// Metadata describing a tool available to the agent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolMeta {
    /// Short machine-friendly name (e.g. `"weather_info"`).
    pub name: String,
    /// Human-readable one-liner describing what the tool does.
    pub description: String,
    /// JSON Schema object describing the expected `args` value.
    pub args_schema: Value,
}

/// Async handler a tool registers for dispatch.  Receives the decoded
/// arguments object and returns the observation text.
pub type ToolHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>> + Send + Sync>;

/// Wrap an async closure as a [`ToolHandler`].
pub fn handler<F, Fut>(f: F) -> ToolHandler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

#[derive(Clone)]
struct ToolEntry {
    meta: ToolMeta,
    handler: ToolHandler,
}

/// Ordered collection of callable tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.  Duplicate names are ignored (first
    /// registration wins).
    pub fn register(&mut self, meta: ToolMeta, handler: ToolHandler) {
        if self.entries.iter().any(|e| e.meta.name == meta.name) {
            debug!(tool = %meta.name, "duplicate tool registration ignored");
            return;
        }
        self.entries.push(ToolEntry { meta, handler });
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.meta.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.meta.name == name)
    }

    /// Function definitions in the shape chat-completion APIs expect.
    pub fn function_defs(&self) -> Vec<Value> {
        self.entries
            .iter()
            .map(|e| {
                json!({
                    "name": e.meta.name,
                    "description": e.meta.description,
                    "parameters": e.meta.args_schema,
                })
            })
            .collect()
    }

    /// Invoke the tool called `name`.
    pub async fn call(&self, name: &str, args: Value) -> anyhow::Result<String> {
        let handler = self
            .entries
            .iter()
            .find(|e| e.meta.name == name)
            .map(|e| Arc::clone(&e.handler))
            .ok_or_else(|| anyhow::anyhow!("unknown tool: {name}"))?;
        debug!(tool = name, "invoking tool");
        handler(args).await
    }
}

/// Required string argument `key` of a tool call.
pub fn str_arg<'a>(args: &'a Value, key: &str) -> anyhow::Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("missing `{key}` argument"))
}

/// JSON Schema for a tool taking a single required string argument.
pub fn single_string_schema(key: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            key: { "type": "string", "description": description }
        },
        "required": [key],
        "additionalProperties": false
    })
}
