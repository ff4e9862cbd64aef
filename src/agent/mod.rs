//! Delegated agent runtime.
//!
//! The conversation layer treats the agent as a black box behind
//! [`AgentRuntime`]: hand it a prompt, await a textual answer, then
//! inspect the execution trace of that run.  [`ToolAgent`] is the
//! production implementation: a tool-calling loop over any
//! [`ModelProvider`] with tools dispatched through a [`ToolRegistry`].

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::models::{ChatMessage, FunctionCallItem, ModelProvider, ProviderResponse};
use crate::tools::builtins::final_answer::answer_from_args;
use crate::tools::ToolRegistry;
use crate::trace::{TraceStep, FINAL_ANSWER_ACTION};
use crate::utils::truncate_str;

/// Steps a run may take before giving up.
pub const DEFAULT_MAX_STEPS: usize = 10;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful party-planning concierge. \
Use the available tools whenever they help: weather, time zones, Hugging Face model \
statistics, web search, menus, catering, themes and image generation. When you are done, \
call `final_answer` with your reply. If you generated an image, pass the image file path \
to `final_answer` unchanged.";

/// An agent the conversation can delegate a turn to.
#[async_trait]
pub trait AgentRuntime: Send {
    /// Run one turn to completion and return the answer text (which may
    /// be the path of a generated file).
    async fn run(&mut self, prompt: &str) -> anyhow::Result<String>;

    /// Steps of the most recent run, oldest first.
    fn trace(&self) -> anyhow::Result<Vec<TraceStep>>;

    /// Forget the most recent run.
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// ToolAgent
// ---------------------------------------------------------------------------

/// Tool-calling agent over a chat-completions model.
pub struct ToolAgent {
    provider: Box<dyn ModelProvider>,
    registry: ToolRegistry,
    system_prompt: String,
    max_steps: usize,
    steps: Vec<TraceStep>,
}

impl ToolAgent {
    pub fn new(provider: Box<dyn ModelProvider>, registry: ToolRegistry) -> Self {
        Self {
            provider,
            registry,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_steps: DEFAULT_MAX_STEPS,
            steps: Vec::new(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one requested call, recording it in the trace.  Returns
    /// the observation fed back to the model.
    async fn invoke(&mut self, call: &FunctionCallItem, args: Value) -> String {
        debug!(
            tool = %call.name,
            args = %truncate_str(&call.arguments, 200),
            "invoking tool"
        );
        match self.registry.call(&call.name, args).await {
            Ok(observation) => {
                self.steps.push(TraceStep::action(&call.name, &observation));
                observation
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool execution failed, feeding error back");
                let observation = format!("Error: {e:#}");
                self.steps.push(TraceStep {
                    action: Some(call.name.clone()),
                    observation: Some(observation.clone()),
                    error: Some(e.to_string()),
                });
                observation
            }
        }
    }

    fn finish(&mut self, answer: String) -> anyhow::Result<String> {
        self.steps.push(TraceStep::final_answer(&answer));
        info!(
            steps = self.steps.len(),
            reply_len = answer.len(),
            "agent run completed"
        );
        Ok(answer)
    }
}

#[async_trait]
impl AgentRuntime for ToolAgent {
    async fn run(&mut self, prompt: &str) -> anyhow::Result<String> {
        self.steps.clear();
        let functions = self.registry.function_defs();
        let mut messages = vec![
            ChatMessage::new("system", &self.system_prompt),
            ChatMessage::new("user", prompt),
        ];

        for step in 0..self.max_steps {
            let response = self
                .provider
                .send_chat_with_functions(&messages, &functions)
                .await?;

            let calls = match response {
                ProviderResponse::Final(text) => return self.finish(text),
                ProviderResponse::ToolCalls(calls) => calls,
            };
            debug!(step, calls = calls.len(), "model requested tools");
            messages.push(ChatMessage::tool_request(calls.clone()));

            for call in &calls {
                let args: Value =
                    serde_json::from_str(&call.arguments).unwrap_or_else(|_| json!({}));
                if call.name == FINAL_ANSWER_ACTION {
                    return self.finish(answer_from_args(&args));
                }
                let observation = self.invoke(call, args).await;
                messages.push(ChatMessage::tool_result(&call.id, observation));
            }
        }

        anyhow::bail!(
            "agent stopped after {} steps without a final answer",
            self.max_steps
        )
    }

    fn trace(&self) -> anyhow::Result<Vec<TraceStep>> {
        Ok(self.steps.clone())
    }

    fn reset(&mut self) {
        self.steps.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
