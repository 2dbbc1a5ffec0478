//! Agent orchestration loop
//!
//! Handles the model ↔ tool execution cycle. Frontends provide a callback
//! for status updates; the agent loop handles the rest. The loop owns the
//! conversation history and usage counters for the session.

use std::sync::Arc;

use serde_json::Value;

use crate::cancel::CancelToken;
use crate::tool::ToolRegistry;
use crate::transport::{ChatMessage, ContentBlock, ModelClient, TransportError};

/// Maximum tool call rounds before we force a text response
const MAX_TOOL_ROUNDS: usize = 32;

/// Events emitted during agent execution for UI updates
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Agent is waiting on the model
    Thinking,
    /// Assistant commentary that accompanied tool calls
    Text(String),
    /// A tool is being executed
    ToolCall { name: String, preview: String },
    /// Tool execution completed
    ToolResult { name: String, preview: String },
    /// Final text response for this request
    Response(String),
    /// Transport-level error; the current request is abandoned
    Error(String),
}

/// Session-wide token totals, reset only by `clear`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The agent: one conversation, one registry, one transport.
pub struct Agent {
    client: Arc<dyn ModelClient>,
    registry: ToolRegistry,
    schemas: Vec<Value>,
    history: Vec<ChatMessage>,
    usage: UsageTotals,
}

impl Agent {
    pub fn new(client: Arc<dyn ModelClient>, registry: ToolRegistry) -> Self {
        let schemas = registry.schemas();
        Self {
            client,
            registry,
            schemas,
            history: Vec::new(),
            usage: UsageTotals::default(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn usage(&self) -> UsageTotals {
        self.usage
    }

    /// Reset the conversation and the usage counters. The next request
    /// starts with no prior turns visible to the transport.
    pub fn clear(&mut self) {
        self.history.clear();
        self.usage = UsageTotals::default();
    }

    /// Run the agent loop for a single user message.
    ///
    /// Returns events via the callback as they happen, and the final response
    /// as the return value. On a transport fault the request is abandoned but
    /// already-appended turns are kept.
    pub async fn run_turn<F>(
        &mut self,
        input: &str,
        cancel: &CancelToken,
        mut on_event: F,
    ) -> Result<String, TransportError>
    where
        F: FnMut(AgentEvent),
    {
        let input = input.trim();
        if input.is_empty() {
            return Ok(String::new());
        }

        cancel.reset();
        self.history.push(ChatMessage::user_text(input));

        for _round in 0..MAX_TOOL_ROUNDS {
            on_event(AgentEvent::Thinking);

            let response = match self.client.send(&self.history, &self.schemas).await {
                Ok(response) => response,
                Err(e) => {
                    on_event(AgentEvent::Error(e.to_string()));
                    return Err(e);
                }
            };

            // Counters accumulate on every successful call, even if a later
            // step of this request fails.
            self.usage.input_tokens += response.usage.input_tokens;
            self.usage.output_tokens += response.usage.output_tokens;

            self.history.push(ChatMessage::assistant(response.content.clone()));

            let mut text = String::new();
            let mut invocations = Vec::new();
            for block in response.content {
                match block {
                    ContentBlock::Text { text: t } => {
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(&t);
                    }
                    ContentBlock::ToolUse { id, name, input } => {
                        invocations.push((id, name, input));
                    }
                    // The model never sends results; ignore if it does.
                    ContentBlock::ToolResult { .. } => {}
                }
            }

            if invocations.is_empty() {
                on_event(AgentEvent::Response(text.clone()));
                return Ok(text);
            }

            if !text.is_empty() {
                on_event(AgentEvent::Text(text));
            }

            // Strictly sequential: a later invocation in the same batch may
            // assume an earlier one has completed.
            let mut results = Vec::with_capacity(invocations.len());
            for (id, name, args) in invocations {
                on_event(AgentEvent::ToolCall {
                    name: name.clone(),
                    preview: call_preview(&name, &args),
                });
                tracing::debug!(tool = %name, "dispatching");

                let output = self.registry.dispatch(&name, &args).await;

                on_event(AgentEvent::ToolResult {
                    name: name.clone(),
                    preview: truncate(&output, 100),
                });
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id,
                    content: output,
                });
            }

            // Results always land in history, so every tool_use block keeps
            // exactly one paired result even when we stop here.
            self.history.push(ChatMessage::tool_results(results));

            if cancel.is_cancelled() {
                tracing::info!("turn cancelled after tool round");
                let note = "(interrupted)".to_string();
                on_event(AgentEvent::Response(note.clone()));
                return Ok(note);
            }
        }

        // Exhausted max rounds: stop asking for tools and report as much.
        let content =
            "Reached the maximum number of tool rounds. See the results above.".to_string();
        on_event(AgentEvent::Response(content.clone()));
        Ok(content)
    }
}

/// Short argument preview for UI display.
fn call_preview(name: &str, args: &Value) -> String {
    let raw = match name {
        "shell" => args["command"].as_str().unwrap_or(""),
        "read_file" | "write_file" | "edit_file" | "delete_path" | "list_directory" => {
            args["path"].as_str().unwrap_or("")
        }
        "search_files" => args["pattern"].as_str().unwrap_or(""),
        "copy_path" | "move_path" => args["source"].as_str().unwrap_or(""),
        _ => "",
    };
    if raw.is_empty() {
        truncate(&args.to_string(), 60)
    } else {
        truncate(raw, 60)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
