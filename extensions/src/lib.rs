//! Sandboxed extension runtime: typed event dispatch plus registration of tools, commands,
//! shortcuts, flags, and message renderers.

pub mod dispatch;
pub mod error_listener;
pub mod event;
pub mod extension;
pub mod facade;
pub mod registration;

pub use dispatch::{BeforeAgentStartAggregate, ExtensionRuntime};
pub use error_listener::{ErrorListener, TracingErrorListener};
pub use event::{
    AgentPhaseEvent, BeforeAgentStartEvent, BeforeAgentStartOutcome, BeforeCompactEvent, BeforeCompactOutcome,
    BeforeTargetEvent, BeforeTreeEvent, BeforeTreeOutcome, CancelOutcome, ContextEvent, SessionLifecycleEvent,
    ToolCallEvent, ToolCallOutcome, ToolResultEvent, ToolResultOutcome,
};
pub use extension::ExtensionModule;
pub use facade::FacadeActions;
pub use registration::{Command, FlagDef, MessageRenderer, Registrar, Shortcut};
