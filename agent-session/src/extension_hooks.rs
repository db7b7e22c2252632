//! Bridges `kestrel_agent_core::TurnHooks` to `kestrel_extensions`'s
//! dispatch table. `AgentCore` only ever sees this trait; it has no idea
//! the caller on the other end is an extension runtime at all.

use std::sync::Arc;

use async_trait::async_trait;
use kestrel_agent_core::hooks::{ToolCallDecision, ToolResultRewrite, TurnHooks};
use kestrel_extensions::{ExtensionRuntime, ToolCallEvent, ToolResultEvent};
use kestrel_protocol::Message;

pub struct ExtensionHooks {
    pub extensions: Arc<ExtensionRuntime>,
}

#[async_trait]
impl TurnHooks for ExtensionHooks {
    async fn before_context(&self, messages: Vec<Message>) -> Vec<Message> {
        self.extensions.dispatch_context(messages).await
    }

    async fn before_tool_call(&self, tool_name: &str, tool_call_id: &str, input: &serde_json::Value) -> ToolCallDecision {
        let event = ToolCallEvent { tool_name: tool_name.to_string(), tool_call_id: tool_call_id.to_string(), input: input.clone() };
        let outcome = self.extensions.dispatch_tool_call(&event).await;
        ToolCallDecision { block: outcome.block, reason: outcome.reason }
    }

    async fn after_tool_result(&self, tool_name: &str, tool_call_id: &str, result: ToolResultRewrite) -> ToolResultRewrite {
        let event = ToolResultEvent {
            tool_name: tool_name.to_string(),
            tool_call_id: tool_call_id.to_string(),
            content: result.content.clone(),
            is_error: result.is_error,
            details: result.details.clone(),
        };
        let outcome = self.extensions.dispatch_tool_result(&event).await;
        ToolResultRewrite {
            content: outcome.content.unwrap_or(result.content),
            is_error: outcome.is_error.unwrap_or(result.is_error),
            details: outcome.details.or(result.details),
        }
    }
}
