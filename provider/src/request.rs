//! Request construction: turns the provider-neutral transcript into the shape an HTTP call actually
//! sends.

use kestrel_protocol::{ContentBlock, Message, Model, ToolSpec};
use serde::Serialize;

const ORPHAN_REPAIR_TRUNCATE_CHARS: usize = 16_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct WireMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThinkingConfig {
    /// Model families that expose thinking as a discrete enum level.
    Level(u8),
    /// Model families that expose thinking as a token budget.
    BudgetTokens(u32),
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tool_choice: Option<String>,
    pub thinking_level: Option<u8>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    #[serde(skip)]
    pub system_prompt: String,
    #[serde(skip)]
    pub wire_messages: Vec<WireMessage>,
    #[serde(skip)]
    pub tools: Vec<ToolSpec>,
    #[serde(skip)]
    pub thinking: Option<ThinkingConfig>,
    pub stream: bool,
    /// Server-side conversation storage, always disabled step 5.
    pub store: bool,
}

/// Builds the provider-shaped request from the neutral transcript. Mutates
/// nothing: the persisted transcript passed in is untouched; orphan repair
/// and item-reference filtering only affect the copy sent over the wire.
pub fn build_request(model: &Model, messages: &[Message], system_prompt: &str, tools: &[ToolSpec], options: &RequestOptions) -> ProviderRequest {
    let repaired = repair_orphans(messages);
    let filtered: Vec<&Message> = repaired.iter().filter(|m| !is_item_reference(m)).collect();
    let wire_messages = to_wire_messages(&filtered);

    let thinking = if model.reasoning {
        Some(thinking_config_for(model, options))
    } else {
        None
    };

    ProviderRequest {
        system_prompt: system_prompt.to_string(),
        wire_messages,
        tools: tools.to_vec(),
        thinking,
        stream: true,
        store: false,
    }
}

fn is_item_reference(message: &Message) -> bool {
    matches!(message, Message::Custom { custom_type, .. } if custom_type == "item_reference")
}

/// Rewrites `ToolResult`s whose `toolCallId` has no matching preceding
/// `ToolCall` on this branch.
fn repair_orphans(messages: &[Message]) -> Vec<Message> {
    let mut seen_call_ids: std::collections::HashSet<&str> = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(messages.len());

    for message in messages {
        if let Message::Assistant { content, .. } = message {
            for block in content {
                if let ContentBlock::ToolCall { id, .. } = block {
                    seen_call_ids.insert(id.as_str());
                }
            }
        }

        match message {
            Message::ToolResult { tool_call_id, tool_name, content, .. } if !seen_call_ids.contains(tool_call_id.as_str()) => {
                let text = tool_result_text(content);
                let truncated: String = text.chars().take(ORPHAN_REPAIR_TRUNCATE_CHARS).collect();
                out.push(Message::user_text(format!("[Previous {tool_name} result; call_id={tool_call_id}]: {truncated}")));
            }
            other => out.push(other.clone()),
        }
    }
    out
}

fn tool_result_text(content: &[kestrel_protocol::ToolResultBlock]) -> String {
    content
        .iter()
        .filter_map(|block| match block {
            kestrel_protocol::ToolResultBlock::Text { text } => Some(text.as_str()),
            kestrel_protocol::ToolResultBlock::Image { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn thinking_config_for(model: &Model, options: &RequestOptions) -> ThinkingConfig {
    // Model families that report `supports_x_high` use a discrete level
    // knob; everything else advertising `reasoning` uses a token budget.
    if model.supports_x_high {
        ThinkingConfig::Level(options.thinking_level.unwrap_or(1))
    } else {
        ThinkingConfig::BudgetTokens(options.max_tokens.unwrap_or(4096) / 2)
    }
}

fn to_wire_messages(messages: &[&Message]) -> Vec<WireMessage> {
    let mut out: Vec<WireMessage> = Vec::new();
    for message in messages {
        let Some((role, content)) = role_and_content(message) else { continue };
        if let Some(last) = out.last_mut() {
            if last.role == role {
                last.content.extend(content);
                continue;
            }
        }
        out.push(WireMessage { role, content });
    }
    out
}

fn role_and_content(message: &Message) -> Option<(Role, Vec<ContentBlock>)> {
    match message {
        Message::User { content } => Some((Role::User, content.clone())),
        Message::Assistant { content, .. } => Some((Role::Assistant, content.clone())),
        Message::ToolResult { tool_call_id, content, is_error, .. } => {
            let text = tool_result_text(content);
            let prefix = if *is_error { "error" } else { "result" };
            Some((Role::User, vec![ContentBlock::Text { text: format!("[tool {prefix} {tool_call_id}]: {text}") }]))
        }
        Message::BashExecution { command, output, .. } => Some((Role::User, vec![ContentBlock::Text { text: format!("$ {command}\n{output}") }])),
        Message::CompactionSummary { summary } | Message::BranchSummary { summary, .. } => Some((Role::User, vec![ContentBlock::Text { text: summary.clone() }])),
        Message::Custom { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_protocol::{Pricing, StopReason, ToolResultBlock, Usage};

    fn model() -> Model {
        Model { provider: "anthropic".into(), id: "claude".into(), name: "Claude".into(), context_window: 200_000, reasoning: true, supports_x_high: false, pricing: Pricing::default() }
    }

    #[test]
    fn orphan_tool_result_is_rewritten_to_assistant_text() {
        let messages = vec![
            Message::user_text("hi"),
            Message::Assistant {
                content: vec![ContentBlock::Text { text: "ok".into() }],
                usage: Usage::default(),
                stop_reason: StopReason::Stop,
                error_message: None,
                provider: "anthropic".into(),
                model_id: "claude".into(),
                timestamp: chrono::Utc::now(),
            },
            Message::ToolResult { tool_call_id: "x".into(), tool_name: "bash".into(), content: vec![ToolResultBlock::Text { text: "done".into() }], is_error: false, details: None },
        ];
        let repaired = repair_orphans(&messages);
        match &repaired[2] {
            Message::User { content } => match &content[0] {
                ContentBlock::Text { text } => assert_eq!(text, "[Previous bash result; call_id=x]: done"),
                other => panic!("expected text block, got {other:?}"),
            },
            other => panic!("expected user message, got {other:?}"),
        }
    }

    #[test]
    fn tool_result_with_matching_call_is_not_rewritten() {
        let messages = vec![
            Message::Assistant {
                content: vec![ContentBlock::ToolCall { id: "x".into(), name: "bash".into(), arguments_json: serde_json::json!({}), thought_signature: None }],
                usage: Usage::default(),
                stop_reason: StopReason::ToolUse,
                error_message: None,
                provider: "anthropic".into(),
                model_id: "claude".into(),
                timestamp: chrono::Utc::now(),
            },
            Message::ToolResult { tool_call_id: "x".into(), tool_name: "bash".into(), content: vec![ToolResultBlock::Text { text: "done".into() }], is_error: false, details: None },
        ];
        let repaired = repair_orphans(&messages);
        assert!(matches!(repaired[1], Message::ToolResult { .. }));
    }

    #[test]
    fn item_reference_messages_are_filtered_out() {
        let messages = vec![Message::user_text("hi"), Message::Custom { custom_type: "item_reference".into(), content: serde_json::json!({}), display: String::new(), details: None }];
        let request = build_request(&model(), &messages, "sys", &[], &RequestOptions::default());
        assert_eq!(request.wire_messages.len(), 1);
    }

    #[test]
    fn consecutive_same_role_content_is_concatenated() {
        let messages = vec![Message::user_text("a"), Message::user_text("b")];
        let request = build_request(&model(), &messages, "sys", &[], &RequestOptions::default());
        assert_eq!(request.wire_messages.len(), 1);
        assert_eq!(request.wire_messages[0].content.len(), 2);
    }

    #[test]
    fn thinking_omitted_when_model_does_not_advertise_reasoning() {
        let mut m = model();
        m.reasoning = false;
        let request = build_request(&m, &[], "sys", &[], &RequestOptions::default());
        assert!(request.thinking.is_none());
    }

    #[test]
    fn thinking_is_a_level_knob_for_x_high_capable_models() {
        let mut m = model();
        m.supports_x_high = true;
        let request = build_request(&m, &[], "sys", &[], &RequestOptions::default());
        assert!(matches!(request.thinking, Some(ThinkingConfig::Level(_))));
    }

    #[test]
    fn store_is_always_disabled() {
        let request = build_request(&model(), &[], "sys", &[], &RequestOptions::default());
        assert!(!request.store);
        assert!(request.stream);
    }
}
