//! The [`Tool`] trait: the execution contract every tool implements. No
//! concrete tool bodies live here — only the shape extensions and the
//! agent core dispatch against.

use async_trait::async_trait;
use kestrel_protocol::tool::{ParameterSchema, ToolOutcome};

use crate::context::ToolContext;
use crate::error::ToolError;

/// How a tool call and its result should be rendered, if the tool wants
/// anything other than the component library's default text rendering.
/// Returned as a small render hint rather than a `Component` directly so
/// `kestrel-tools-api` doesn't need to depend on `kestrel-render`.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderHint {
    PlainText(String),
    Markdown(String),
    Diff { before: String, after: String },
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Short human-facing label shown in the UI (e.g. "Read File"), distinct
    /// from `name` (the wire identifier the provider sees).
    fn label(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> ParameterSchema;

    /// Runs the tool. `id` is the provider-assigned (or synthesized, per
    /// tool-call id policy) call id, already unique within the turn. Cancellation and progress
    /// reporting both go through `ctx`.
    async fn execute(
        &self,
        id: &str,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError>;

    /// Custom rendering for the in-flight call (e.g. "Reading foo.rs...").
    /// `None` falls back to the component library's default.
    fn render_call(&self, _args: &serde_json::Value) -> Option<RenderHint> {
        None
    }

    /// Custom rendering for a completed result. `None` falls back to the
    /// component library's default.
    fn render_result(&self, _outcome: &ToolOutcome) -> Option<RenderHint> {
        None
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn label(&self) -> &str {
            "Echo"
        }

        fn description(&self) -> &str {
            "Echoes its input back"
        }

        fn parameter_schema(&self) -> ParameterSchema {
            serde_json::json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"],
            })
        }

        async fn execute(
            &self,
            _id: &str,
            args: serde_json::Value,
            ctx: &ToolContext,
        ) -> Result<ToolOutcome, ToolError> {
            let text = args
                .get("text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ToolError::invalid_input("text must be a string"))?;
            ctx.send_update(serde_json::json!({ "stage": "echoing" }));
            Ok(ToolOutcome::text(text))
        }
    }

    #[tokio::test]
    async fn echo_tool_returns_its_input() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let ctx = ToolContext::new("call-1", "sess-1", std::path::PathBuf::from("."), CancellationToken::new(), tx);
        let tool = EchoTool;
        let outcome = tool
            .execute("call-1", serde_json::json!({"text": "hi"}), &ctx)
            .await
            .expect("execute");
        assert!(!outcome.is_error);
    }

    #[tokio::test]
    async fn echo_tool_rejects_missing_field() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let ctx = ToolContext::new("call-1", "sess-1", std::path::PathBuf::from("."), CancellationToken::new(), tx);
        let tool = EchoTool;
        let err = tool.execute("call-1", serde_json::json!({}), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
