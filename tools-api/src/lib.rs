//! The `Tool` execution contract. No concrete tool bodies: this crate defines what a tool looks
//! like so the agent core can dispatch it and extensions can register one, not what any particular
//! tool does.

pub mod context;
pub mod error;
pub mod registry;
pub mod tool;

pub use context::ToolContext;
pub use error::ToolError;
pub use registry::ToolRegistry;
pub use tool::{RenderHint, Tool};
