//! [`ExtensionModule`]: the vtable a compiled extension implements. Every method has a no-op
//! default, so an extension only overrides the events it cares about. Handlers "throw" by returning
//! `Err`, the Rust-native equivalent of the dynamic-language exception isolation rule describes —
//! no `catch_unwind` is needed for the typed events. Observational events have no meaningful return
//! value, so those are still guarded with `catch_unwind` in [`crate::dispatch`] to give the same
//! "does not crash the turn" guarantee for a panicking handler.

use async_trait::async_trait;

use crate::event::*;
use crate::registration::Registrar;

#[async_trait]
pub trait ExtensionModule: Send + Sync {
    /// The path this extension was loaded from, used in conflict/error logs.
    fn path(&self) -> &str;

    /// Called once at load time to register tools, commands, shortcuts,
    /// flags, and message renderers.
    fn register(&self, _registrar: &mut Registrar) {}

    async fn on_session_start(&self, _event: &SessionLifecycleEvent) {}
    async fn on_session_switch(&self, _event: &SessionLifecycleEvent) {}
    async fn on_session_branch(&self, _event: &SessionLifecycleEvent) {}
    async fn on_session_compact(&self, _event: &SessionLifecycleEvent) {}
    async fn on_session_shutdown(&self, _event: &SessionLifecycleEvent) {}
    async fn on_session_tree(&self, _event: &SessionLifecycleEvent) {}

    async fn on_session_before_switch(&self, _event: &BeforeTargetEvent) -> Result<CancelOutcome, String> {
        Ok(CancelOutcome::default())
    }

    async fn on_session_before_branch(&self, _event: &BeforeTargetEvent) -> Result<CancelOutcome, String> {
        Ok(CancelOutcome::default())
    }

    async fn on_session_before_compact(&self, _event: &BeforeCompactEvent) -> Result<BeforeCompactOutcome, String> {
        Ok(BeforeCompactOutcome::default())
    }

    async fn on_session_before_tree(&self, _event: &BeforeTreeEvent) -> Result<BeforeTreeOutcome, String> {
        Ok(BeforeTreeOutcome::default())
    }

    async fn on_before_agent_start(&self, _event: &BeforeAgentStartEvent) -> Result<BeforeAgentStartOutcome, String> {
        Ok(BeforeAgentStartOutcome::default())
    }

    async fn on_agent_start(&self, _event: &AgentPhaseEvent) {}
    async fn on_agent_end(&self, _event: &AgentPhaseEvent) {}
    async fn on_turn_start(&self, _event: &AgentPhaseEvent) {}
    async fn on_turn_end(&self, _event: &AgentPhaseEvent) {}

    /// Return `Ok(Some(rewritten))` to replace the outgoing provider
    /// messages for this call only; `Ok(None)` to leave them unchanged.
    async fn on_context(&self, _event: &ContextEvent) -> Result<Option<Vec<kestrel_protocol::Message>>, String> {
        Ok(None)
    }

    async fn on_tool_call(&self, _event: &ToolCallEvent) -> Result<ToolCallOutcome, String> {
        Ok(ToolCallOutcome::default())
    }

    async fn on_tool_result(&self, _event: &ToolResultEvent) -> Result<ToolResultOutcome, String> {
        Ok(ToolResultOutcome::default())
    }
}
