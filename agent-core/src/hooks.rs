//! The seam through which a caller observes and rewrites a turn's outgoing
//! context and tool calls. Mirrors the `ApiKeyResolver` seam in `credentials.rs`: this crate only
//! depends on the trait, never on `kestrel-extensions`, which implements it by dispatching to the
//! loaded extension modules.

use async_trait::async_trait;
use kestrel_protocol::{Message, ToolResultBlock};

/// What `before_tool_call` decided for one pending call.
#[derive(Debug, Clone, Default)]
pub struct ToolCallDecision {
    pub block: bool,
    pub reason: Option<String>,
}

/// The tool result as it will be surfaced to the model, after any rewrite.
#[derive(Debug, Clone)]
pub struct ToolResultRewrite {
    pub content: Vec<ToolResultBlock>,
    pub is_error: bool,
    pub details: Option<serde_json::Value>,
}

#[async_trait]
pub trait TurnHooks: Send + Sync {
    /// Called once per turn with a deep copy of the outgoing messages.
    /// Returning a different `Vec` rewrites what the provider sees; the
    /// transcript `AgentCore` keeps is never touched by this.
    async fn before_context(&self, messages: Vec<Message>) -> Vec<Message> {
        messages
    }

    /// Called before each tool call executes. `block: true` short-circuits
    /// the call with `reason` as the tool's error result.
    async fn before_tool_call(&self, _tool_name: &str, _tool_call_id: &str, _input: &serde_json::Value) -> ToolCallDecision {
        ToolCallDecision::default()
    }

    /// Called after each tool call (including one blocked by
    /// `before_tool_call`) with the result about to be surfaced to the
    /// model. Returning a different value rewrites it.
    async fn after_tool_result(&self, _tool_name: &str, _tool_call_id: &str, result: ToolResultRewrite) -> ToolResultRewrite {
        result
    }
}

/// The default: every hook is a no-op passthrough.
pub struct NoopHooks;

#[async_trait]
impl TurnHooks for NoopHooks {}
