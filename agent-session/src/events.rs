//! The subscriber-facing event stream the facade publishes: every
//! [`kestrel_agent_core::AgentEvent`] passed through unchanged, plus the auto-compaction and
//! auto-retry pairs the facade itself emits.

use kestrel_agent_core::AgentEvent;

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Agent(AgentEvent),
    AutoCompactionStart { reason: CompactionReason },
    AutoCompactionEnd { outcome: CompactionOutcome },
    AutoRetryStart { attempt: u32, max_attempts: u32, delay_ms: u64 },
    AutoRetryEnd { success: bool, final_error: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionReason {
    /// Assistant usage crossed the configured context-window fraction.
    Proactive,
    /// The next provider call failed with a context-overflow-shaped error.
    Reactive,
}

#[derive(Debug, Clone)]
pub enum CompactionOutcome {
    Result,
    Aborted,
    WillRetry,
}
