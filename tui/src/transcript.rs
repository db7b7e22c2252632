//! Renders the message transcript to plain display lines. Markdown rendering is reserved for
//! assistant prose; every other variant gets a fixed, role-prefixed rendering so the transcript
//! stays legible even mid-stream.

use kestrel_components::{Markdown, Theme};
use kestrel_protocol::{ContentBlock, Message, StopReason, ToolResultBlock};
use kestrel_render::Component;

pub fn render_messages(messages: &[Message], theme: &Theme, width: u16) -> Vec<String> {
    let mut lines = Vec::new();
    for message in messages {
        lines.extend(render_message(message, theme, width));
        lines.push(String::new());
    }
    lines
}

fn render_message(message: &Message, theme: &Theme, width: u16) -> Vec<String> {
    match message {
        Message::User { content } => prefixed(theme.paint(&[theme.bold, theme.accent], "you"), text_of_blocks(content), theme, width),
        Message::Assistant { content, stop_reason, error_message, .. } => {
            let mut lines = prefixed(theme.paint(&[theme.bold, theme.primary], "assistant"), text_of_blocks(content), theme, width);
            for block in content {
                if let ContentBlock::ToolCall { name, id, .. } = block {
                    lines.push(theme.paint(&[theme.text_dim], &format!("  → {name} ({id})")));
                }
            }
            if *stop_reason == StopReason::Error {
                let message = error_message.as_deref().unwrap_or("unknown error");
                lines.push(theme.paint(&[theme.error], &format!("  turn failed: {message}")));
            }
            lines
        }
        Message::ToolResult { tool_name, content, is_error, .. } => {
            let label = if *is_error { theme.paint(&[theme.error], &format!("✗ {tool_name}")) } else { theme.paint(&[theme.success], &format!("✓ {tool_name}")) };
            prefixed(label, tool_result_text(content), theme, width)
        }
        Message::Custom { display, .. } => prefixed(theme.paint(&[theme.text_dim], "custom"), display.clone(), theme, width),
        Message::BashExecution { command, output, exit_code, excluded_from_context } => {
            let mut lines = vec![theme.paint(&[theme.bold], &format!("$ {command}"))];
            lines.extend(output.lines().map(|line| line.to_string()));
            if *exit_code != 0 {
                lines.push(theme.paint(&[theme.error], &format!("exit {exit_code}")));
            }
            if *excluded_from_context {
                lines.push(theme.paint(&[theme.text_dim], "(not added to context)"));
            }
            lines
        }
        Message::CompactionSummary { summary } => prefixed(theme.paint(&[theme.text_dim, theme.italic], "compaction summary"), summary.clone(), theme, width),
        Message::BranchSummary { summary, .. } => prefixed(theme.paint(&[theme.text_dim, theme.italic], "branch summary"), summary.clone(), theme, width),
    }
}

fn prefixed(label: String, body: String, theme: &Theme, width: u16) -> Vec<String> {
    let mut lines = vec![label];
    lines.extend(Markdown::new(body, theme.clone()).render(width));
    lines
}

fn text_of_blocks(content: &[ContentBlock]) -> String {
    content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.clone()),
            ContentBlock::Thinking { text, .. } => Some(format!("_{text}_")),
            ContentBlock::Image { .. } => Some("[image]".to_string()),
            ContentBlock::ToolCall { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn tool_result_text(content: &[ToolResultBlock]) -> String {
    content
        .iter()
        .map(|block| match block {
            ToolResultBlock::Text { text } => text.clone(),
            ToolResultBlock::Image { .. } => "[image]".to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_gets_you_prefix() {
        let lines = render_messages(&[Message::user_text("hi")], &Theme::default(), 80);
        assert!(lines[0].contains("you"));
    }

    #[test]
    fn failed_turn_shows_the_error_message() {
        let message = Message::Assistant {
            content: vec![],
            usage: Default::default(),
            stop_reason: StopReason::Error,
            error_message: Some("rate limited".into()),
            provider: "anthropic".into(),
            model_id: "claude".into(),
            timestamp: chrono::Utc::now(),
        };
        let lines = render_messages(&[message], &Theme::default(), 80);
        assert!(lines.iter().any(|line| line.contains("rate limited")));
    }

    #[test]
    fn bash_execution_shows_exit_code_on_failure() {
        let message = Message::BashExecution { command: "false".into(), output: String::new(), exit_code: 1, excluded_from_context: false };
        let lines = render_messages(&[message], &Theme::default(), 80);
        assert!(lines.iter().any(|line| line.contains("exit 1")));
    }
}
