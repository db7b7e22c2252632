//! Wire-level tool types. The execution contract itself (the `execute` trait method) lives in
//! `kestrel-tools-api`; this module holds only the serializable pieces every crate needs: the
//! schema sent to the provider and the outcome a tool call produces.

use serde::{Deserialize, Serialize};

use crate::message::ToolResultBlock;

/// A JSON-schema-like description of a tool's parameters.
///
/// String enums are intentionally encoded as `{"type": "string", "enum":
/// [...]}` rather than a sum-of-literals shape: some providers reject the
/// latter.
pub type ParameterSchema = serde_json::Value;

/// The provider-facing description of a tool: everything needed to offer it
/// to the LLM, minus the Rust closure that runs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub label: String,
    pub description: String,
    pub parameter_schema: ParameterSchema,
}

/// What a tool call produced, independent of how it was invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub content: Vec<ToolResultBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultBlock::Text { text: text.into() }],
            details: None,
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultBlock::Text { text: text.into() }],
            details: None,
            is_error: true,
        }
    }
}

/// How a message submitted while a turn is in flight should be delivered.
/// See `prompt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteeringMode {
    /// Abort the in-flight assistant stream at the next tool-call boundary,
    /// then synthesize a user message and start the next turn.
    Steer,
    /// Deliver only once the current run reaches a natural end.
    FollowUp,
    /// Queued strictly for the next explicit `prompt()` call.
    NextTurn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_outcome_is_not_an_error() {
        let outcome = ToolOutcome::text("done");
        assert!(!outcome.is_error);
        assert_eq!(outcome.content.len(), 1);
    }

    #[test]
    fn error_outcome_is_marked() {
        let outcome = ToolOutcome::error("boom");
        assert!(outcome.is_error);
    }
}
