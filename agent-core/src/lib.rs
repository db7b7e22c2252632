//! The per-turn agent loop: stream an assistant message, dispatch any tool calls it contains,
//! append results, repeat. Knows nothing about the session log, auto-compaction, or extensions —
//! those live one layer up in `kestrel-agent-session`, which composes an `AgentCore` with the
//! session tree, the credential store, and the extension dispatch table.

pub mod control;
pub mod core;
pub mod credentials;
pub mod error;
pub mod events;
pub mod hooks;

pub use control::AgentControl;
pub use core::{AgentCore, AgentCoreBuilder};
pub use credentials::{ApiKeyResolver, StaticApiKey};
pub use error::AgentError;
pub use events::AgentEvent;
pub use hooks::{NoopHooks, ToolCallDecision, ToolResultRewrite, TurnHooks};
