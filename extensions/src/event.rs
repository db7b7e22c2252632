//! Event payloads and per-handler outcomes. Each row of that table becomes one pair of types here
//! plus one method on [`crate::extension::ExtensionModule`].

use kestrel_protocol::session_entry::EntryId;
use kestrel_protocol::{ContentBlock, Message, ToolResultBlock};
use tokio_util::sync::CancellationToken;

/// `session_start`, `session_switch`, `session_branch`, `session_compact`,
/// `session_shutdown`, `session_tree` — observational, no return value.
pub struct SessionLifecycleEvent {
    pub session_id: String,
    pub detail: serde_json::Value,
}

/// `session_before_switch`, `session_before_branch`. `target` is a session
/// path for `session_before_switch` and an `EntryId` (rendered as a string)
/// for `session_before_branch` — the two operations don't share a target
/// type, so this carries whichever description applies.
pub struct BeforeTargetEvent {
    pub target: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelOutcome {
    pub cancel: bool,
}

/// `session_before_compact`.
pub struct BeforeCompactEvent {
    pub preparation: String,
    pub branch_entries: Vec<EntryId>,
    pub custom_instructions: Option<String>,
    pub signal: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct BeforeCompactOutcome {
    pub cancel: bool,
    /// A handler-supplied summary skips the provider call for compaction.
    pub compaction: Option<String>,
}

/// `session_before_tree`.
pub struct BeforeTreeEvent {
    pub preparation: String,
    pub signal: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct BeforeTreeOutcome {
    pub cancel: bool,
    pub summary: Option<String>,
}

/// `before_agent_start`.
pub struct BeforeAgentStartEvent {
    pub prompt: String,
    pub images: Vec<ContentBlock>,
}

/// A single handler's contribution; the runtime accumulates these across
/// every registered handler into a [`crate::dispatch::BeforeAgentStartAggregate`].
#[derive(Debug, Clone, Default)]
pub struct BeforeAgentStartOutcome {
    pub message: Option<String>,
    pub system_prompt_append: Option<String>,
}

/// `agent_start`, `agent_end`, `turn_start`, `turn_end` — observational.
pub struct AgentPhaseEvent {
    pub phase: &'static str,
    pub detail: serde_json::Value,
}

/// `context`: a deep copy of the outgoing provider messages.
pub struct ContextEvent {
    pub messages: Vec<Message>,
}

/// `tool_call`.
pub struct ToolCallEvent {
    pub tool_name: String,
    pub tool_call_id: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct ToolCallOutcome {
    pub block: bool,
    pub reason: Option<String>,
}

/// `tool_result`.
pub struct ToolResultEvent {
    pub tool_name: String,
    pub tool_call_id: String,
    pub content: Vec<ToolResultBlock>,
    pub is_error: bool,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ToolResultOutcome {
    pub content: Option<Vec<ToolResultBlock>>,
    pub details: Option<serde_json::Value>,
    pub is_error: Option<bool>,
}
