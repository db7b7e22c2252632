//! Shared wire and data-model types, consumed by every other `kestrel-*`
//! crate: conversation messages, the session log entry shape, the model
//! catalog, the renderer's frame type, and wire-level tool types.
//!
//! `Extension` is deliberately not here: its fields are function maps (handlers,
//! tool/command/shortcut registries), not serializable data, so it lives in `kestrel-extensions`
//! alongside the trait it's built around — mirroring how `Tool`'s executable half lives in
//! `kestrel-tools-api` while its wire half (`ToolSpec`) lives here.

pub mod frame;
pub mod message;
pub mod model;
pub mod session_entry;
pub mod tool;

pub use frame::Frame;
pub use message::{ContentBlock, Message, StopReason, ToolResultBlock, Usage};
pub use model::{Model, Pricing};
pub use session_entry::{EntryId, SessionEntry, SessionEntryKind};
pub use tool::{ParameterSchema, SteeringMode, ToolOutcome, ToolSpec};
