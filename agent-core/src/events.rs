//! The subscriber-facing event stream. One `AgentEvent` per transcript-visible change; nothing here
//! is a terminal-rendering concern, that's `kestrel-tui`'s job.

use kestrel_protocol::{tool::ToolOutcome, Message};

#[derive(Debug, Clone)]
pub enum AgentEvent {
    AgentStart,
    /// A message has fully entered the transcript. For `User`/`Custom`
    /// messages this and `MessageEnd` fire back to back, since those never
    /// stream; `Assistant` messages fire this once, before the first delta.
    MessageStart { message: Message },
    /// An in-flight assistant message changed shape (a new delta arrived, or
    /// a tool call finished parsing). `message` is the message-so-far.
    MessageUpdate { message: Message },
    /// `message` is final and will not change again.
    MessageEnd { message: Message },
    ToolExecutionStart { id: String, name: String, args: serde_json::Value },
    ToolExecutionUpdate { id: String, partial_result: serde_json::Value },
    ToolExecutionEnd { id: String, result: ToolOutcome, is_error: bool },
    AgentEnd { messages: Vec<Message> },
}
