//! Building blocks for `AgentSession::compact`: the preparation text handed to extensions/the
//! summarizing call, and the proactive-threshold check run after every turn.

use kestrel_protocol::session_entry::SessionEntry;
use kestrel_protocol::Message;

/// Renders the entries on the current path into a transcript extensions and
/// the summarizing prompt can read, newest material last. Non-message
/// entries (model changes, labels, prior compactions) are described by a
/// short line rather than skipped outright, so a summarizer sees that a
/// compaction already happened upstream.
pub fn build_preparation_text(path: &[&SessionEntry], custom_instructions: Option<&str>) -> String {
    let mut lines = Vec::with_capacity(path.len() + 1);
    for entry in path {
        lines.push(describe_entry(entry));
    }
    let mut text = lines.join("\n");
    if let Some(custom) = custom_instructions {
        text.push_str("\n\nAdditional instructions for this summary: ");
        text.push_str(custom);
    }
    text
}

fn describe_entry(entry: &SessionEntry) -> String {
    match entry.as_message() {
        Some(Message::User { content }) => format!("User: {}", text_of(content.iter().filter_map(text_block))),
        Some(Message::Assistant { content, .. }) => format!("Assistant: {}", text_of(content.iter().filter_map(text_block))),
        Some(Message::ToolResult { tool_name, is_error, .. }) => format!("Tool result ({tool_name}){}", if *is_error { " [error]" } else { "" }),
        Some(Message::Custom { display, .. }) => format!("Custom: {display}"),
        Some(Message::BashExecution { command, .. }) => format!("Bash: {command}"),
        Some(Message::CompactionSummary { summary }) => format!("(earlier summary) {summary}"),
        Some(Message::BranchSummary { summary, .. }) => format!("(branch) {summary}"),
        None => "(non-message entry)".to_string(),
    }
}

fn text_block(block: &kestrel_protocol::ContentBlock) -> Option<&str> {
    match block {
        kestrel_protocol::ContentBlock::Text { text } => Some(text.as_str()),
        _ => None,
    }
}

fn text_of<'a>(blocks: impl Iterator<Item = &'a str>) -> String {
    blocks.collect::<Vec<_>>().join(" ")
}

/// Whether the just-observed assistant usage is over `threshold` of the model's context window, and
/// compaction should run before the next turn starts.
pub fn should_compact_proactively(total_tokens: u32, context_window: u32, threshold: f32) -> bool {
    context_window > 0 && (total_tokens as f32) >= (context_window as f32) * threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_threshold_does_not_trigger() {
        assert!(!should_compact_proactively(1000, 200_000, 0.8));
    }

    #[test]
    fn at_or_over_threshold_triggers() {
        assert!(should_compact_proactively(160_000, 200_000, 0.8));
    }
}
