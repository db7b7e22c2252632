//! The context passed to every tool invocation.
//!
//! The original interface threaded `onUpdate`, `onAuth`, `onPrompt`, and a
//! bare cancellation `signal` as separate parameters through every call
//! site. Collapsed here into one struct: a progress channel, a
//! cancellation token shared with the turn that spawned this call, and the
//! identifiers a tool needs to scope its side effects.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Everything a [`crate::Tool`] needs beyond its own arguments.
pub struct ToolContext {
    pub tool_call_id: String,
    pub session_id: String,
    pub working_dir: PathBuf,
    cancel: CancellationToken,
    updates: mpsc::UnboundedSender<serde_json::Value>,
}

impl ToolContext {
    pub fn new(
        tool_call_id: impl Into<String>,
        session_id: impl Into<String>,
        working_dir: PathBuf,
        cancel: CancellationToken,
        updates: mpsc::UnboundedSender<serde_json::Value>,
    ) -> Self {
        Self { tool_call_id: tool_call_id.into(), session_id: session_id.into(), working_dir, cancel, updates }
    }

    /// The signal triggered by either `abort()` or the steering-abort path
    /// . Tools should poll this between expensive steps and stop promptly once it fires.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Replaces `onUpdate(partial)`: the agent core turns each call into a
    /// `tool_execution_update` event carrying `partial`.
    pub fn send_update(&self, partial: serde_json::Value) {
        // A closed receiver just means nothing is listening for progress
        // anymore (e.g. the UI dropped the subscription); the tool's own
        // result still completes normally.
        let _ = self.updates.send(partial);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_update_after_receiver_dropped_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let ctx = ToolContext::new("call-1", "sess-1", PathBuf::from("."), CancellationToken::new(), tx);
        ctx.send_update(serde_json::json!({"progress": 0.5}));
    }

    #[tokio::test]
    async fn cancel_token_reflects_parent_cancellation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let ctx = ToolContext::new("call-1", "sess-1", PathBuf::from("."), token.clone(), tx);
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
