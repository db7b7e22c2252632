//! The facade the UI holds: composes `kestrel-agent-core`, `kestrel-session`,
//! `kestrel-credentials`, and `kestrel-extensions` into one object that owns a conversation end to
//! end — submission queues, auto-compaction, auto-retry, and session-tree navigation included.

pub mod compaction;
pub mod error;
pub mod events;
pub mod extension_hooks;
pub mod facade;
pub mod facade_actions;
pub mod system_prompt;
pub mod turn_policy;

pub use error::{AgentSessionError, Result};
pub use events::{CompactionOutcome, CompactionReason, SessionEvent};
pub use extension_hooks::ExtensionHooks;
pub use facade::{AgentSession, AgentSessionBuilder, SessionStats};
pub use facade_actions::FacadeHandle;
pub use system_prompt::{rebuild_system_prompt, SystemPromptInputs};
