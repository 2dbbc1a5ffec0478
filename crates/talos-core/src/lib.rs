//! Talos Core - Agent orchestration, tool registry, and shell execution
//!
//! This crate contains the shared logic between all talos frontends.
//! The REPL (and any future frontend) provides a callback for status
//! updates; the agent loop handles the rest.

pub mod agent;
pub mod cancel;
pub mod config;
pub mod shell;
pub mod tool;
pub mod tools;
pub mod transport;

pub use agent::{Agent, AgentEvent, UsageTotals};
pub use cancel::CancelToken;
pub use config::Config;
pub use tool::{ParamSpec, Tool, ToolRegistry};
pub use transport::{AnthropicClient, ChatMessage, ContentBlock, ModelClient, Role, TransportError};
