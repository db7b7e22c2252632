//! The conversation data model: [`ContentBlock`], [`Message`], token [`Usage`].
//!
//! Mirrors "Message" exactly. Kept provider-neutral: nothing here knows how Anthropic/OpenAI/etc.
//! shape their wire format — that's `kestrel-provider`'s job.

use serde::{Deserialize, Serialize};

/// A single block of content inside a `User` or `Assistant` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        mime: String,
        /// Base64-encoded bytes. Raw bytes are never stored inline in the
        /// session log; callers wanting raw bytes decode this themselves.
        base64: String,
    },
    Thinking {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opaque_signature: Option<String>,
    },
    ToolCall {
        id: String,
        name: String,
        arguments_json: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought_signature: Option<String>,
    },
}

/// Content returned by a tool (always text/image, never thinking/tool-call).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResultBlock {
    Text { text: String },
    Image { mime: String, base64: String },
}

/// Why an assistant turn stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Stop,
    ToolUse,
    Length,
    Aborted,
    Error,
}

/// Token accounting for one assistant turn, as reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input: u32,
    pub output: u32,
    pub cache_read: u32,
    pub cache_write: u32,
    pub total_tokens: u32,
    /// Cost in hundredths of a cent (USD), to avoid floating point drift
    /// across a long-running session's running total.
    pub cost_centicents: u64,
}

impl Usage {
    pub fn cost_usd(&self) -> f64 {
        self.cost_centicents as f64 / 10_000.0
    }

    pub fn accumulate(&mut self, other: &Usage) {
        self.input += other.input;
        self.output += other.output;
        self.cache_read += other.cache_read;
        self.cache_write += other.cache_write;
        self.total_tokens += other.total_tokens;
        self.cost_centicents += other.cost_centicents;
    }
}

/// One message in a conversation. Mirrors `Message` exactly: a tagged union over the four roles
/// plus the three UI/structural markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User {
        content: Vec<ContentBlock>,
    },
    Assistant {
        content: Vec<ContentBlock>,
        usage: Usage,
        stop_reason: StopReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
        provider: String,
        model_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        content: Vec<ToolResultBlock>,
        is_error: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
    Custom {
        custom_type: String,
        content: serde_json::Value,
        display: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
    BashExecution {
        command: String,
        output: String,
        exit_code: i32,
        /// Preserved even when compaction later drops it from the LLM view.
        excluded_from_context: bool,
    },
    CompactionSummary {
        summary: String,
    },
    BranchSummary {
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Message::User {
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Every `ToolCall` block contained in this message, in source order.
    /// Empty for any non-`Assistant` variant.
    pub fn tool_calls(&self) -> Vec<&ContentBlock> {
        match self {
            Message::Assistant { content, .. } => content
                .iter()
                .filter(|b| matches!(b, ContentBlock::ToolCall { .. }))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The `toolCallId` this message resolves, if it is a `ToolResult`.
    pub fn tool_result_call_id(&self) -> Option<&str> {
        match self {
            Message::ToolResult { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, Message::Assistant { .. })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_through_json() {
        let msg = Message::user_text("hello");
        let json = serde_json::to_string(&msg).expect("serialize");
        let back: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(msg, back);
    }

    #[test]
    fn tool_calls_empty_for_user_message() {
        let msg = Message::user_text("hi");
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn tool_calls_extracted_in_source_order() {
        let msg = Message::Assistant {
            content: vec![
                ContentBlock::Text { text: "ok, I'll do two things".into() },
                ContentBlock::ToolCall {
                    id: "a".into(),
                    name: "read".into(),
                    arguments_json: serde_json::json!({}),
                    thought_signature: None,
                },
                ContentBlock::ToolCall {
                    id: "b".into(),
                    name: "write".into(),
                    arguments_json: serde_json::json!({}),
                    thought_signature: None,
                },
            ],
            usage: Usage::default(),
            stop_reason: StopReason::ToolUse,
            error_message: None,
            provider: "anthropic".into(),
            model_id: "claude".into(),
            timestamp: chrono::Utc::now(),
        };
        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], ContentBlock::ToolCall { id, .. } if id == "a"));
    }

    #[test]
    fn usage_accumulates() {
        let mut total = Usage::default();
        total.accumulate(&Usage { input: 10, output: 5, ..Usage::default() });
        total.accumulate(&Usage { input: 3, output: 1, ..Usage::default() });
        assert_eq!(total.input, 13);
        assert_eq!(total.output, 6);
    }
}
