//! `buildSessionContext`: a pure function of the leaf and the log — never mutates anything, always
//! reproducible from entries alone.

use kestrel_protocol::session_entry::{SessionEntry, SessionEntryKind};
use kestrel_protocol::Message;

/// Turns one entry into the message it contributes to the LLM-visible
/// transcript, if any. `ModelChange`/`ThinkingLevelChange`/`Label` are
/// session metadata only and never reach the model; `Compaction` is handled
/// specially by the caller (it picks the cut point, not a message itself).
fn entry_to_message(kind: &SessionEntryKind) -> Option<Message> {
    match kind {
        SessionEntryKind::Message { message: Message::BashExecution { excluded_from_context: true, .. } } => None,
        SessionEntryKind::Message { message } => Some(message.clone()),
        SessionEntryKind::BranchSummary { summary, details } => Some(Message::BranchSummary { summary: summary.clone(), details: details.clone() }),
        SessionEntryKind::CustomEntry { custom_type, data } => {
            Some(Message::Custom { custom_type: custom_type.clone(), content: data.clone(), display: String::new(), details: None })
        }
        SessionEntryKind::ModelChange { .. } | SessionEntryKind::ThinkingLevelChange { .. } | SessionEntryKind::Label { .. } | SessionEntryKind::Compaction { .. } => None,
    }
}

/// Builds the LLM-visible transcript for `path` (root-to-leaf, oldest
/// first): finds the most recent `Compaction` entry on the path and starts
/// from its `first_kept_entry_id`, prefixed with the compaction's summary.
/// Entries before that point are still on disk and in the tree — they're
/// just not part of this context.
pub fn build_session_context(path: &[&SessionEntry]) -> Vec<Message> {
    let mut start_idx = 0;
    let mut summary: Option<&str> = None;

    for entry in path {
        if let SessionEntryKind::Compaction { summary: entry_summary, first_kept_entry_id, .. } = &entry.kind {
            if let Some(kept_idx) = path.iter().position(|e| e.entry_id == *first_kept_entry_id) {
                start_idx = kept_idx;
                summary = Some(entry_summary.as_str());
            }
        }
    }

    let mut messages = Vec::new();
    if let Some(summary) = summary {
        messages.push(Message::CompactionSummary { summary: summary.to_string() });
    }
    messages.extend(path[start_idx..].iter().filter_map(|entry| entry_to_message(&entry.kind)));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_protocol::session_entry::EntryId;
    use uuid::Uuid;

    fn entry(id: EntryId, parent: Option<EntryId>, kind: SessionEntryKind) -> SessionEntry {
        SessionEntry { entry_id: id, parent_id: parent, timestamp: chrono::Utc::now(), kind }
    }

    #[test]
    fn context_is_every_message_when_no_compaction_occurred() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let entries = vec![
            entry(a, None, SessionEntryKind::Message { message: Message::user_text("hi") }),
            entry(b, Some(a), SessionEntryKind::Message { message: Message::user_text("there") }),
        ];
        let refs: Vec<&SessionEntry> = entries.iter().collect();
        let messages = build_session_context(&refs);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn compaction_truncates_to_first_kept_entry_and_prepends_summary() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();
        let entries = vec![
            entry(a, None, SessionEntryKind::Message { message: Message::user_text("old 1") }),
            entry(b, Some(a), SessionEntryKind::Message { message: Message::user_text("old 2") }),
            entry(c, Some(b), SessionEntryKind::Compaction { summary: "summary of old 1/2".into(), first_kept_entry_id: b, tokens_before: 5000 }),
            entry(d, Some(c), SessionEntryKind::Message { message: Message::user_text("new") }),
        ];
        let refs: Vec<&SessionEntry> = entries.iter().collect();
        let messages = build_session_context(&refs);
        assert_eq!(messages.len(), 3);
        assert!(matches!(&messages[0], Message::CompactionSummary { summary } if summary == "summary of old 1/2"));
        assert!(matches!(&messages[1], Message::User { .. }));
    }

    #[test]
    fn bash_execution_excluded_from_context_is_dropped() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let entries = vec![
            entry(
                a,
                None,
                SessionEntryKind::Message {
                    message: Message::BashExecution { command: "cat secrets.env".into(), output: "TOKEN=...".into(), exit_code: 0, excluded_from_context: true },
                },
            ),
            entry(b, Some(a), SessionEntryKind::Message { message: Message::user_text("ok, continue") }),
        ];
        let refs: Vec<&SessionEntry> = entries.iter().collect();
        let messages = build_session_context(&refs);
        assert_eq!(messages.len(), 1);
        assert!(matches!(&messages[0], Message::User { .. }));
    }

    #[test]
    fn only_the_most_recent_compaction_applies() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();
        let entries = vec![
            entry(a, None, SessionEntryKind::Message { message: Message::user_text("old") }),
            entry(b, Some(a), SessionEntryKind::Compaction { summary: "first compaction".into(), first_kept_entry_id: a, tokens_before: 1000 }),
            entry(c, Some(b), SessionEntryKind::Message { message: Message::user_text("mid") }),
            entry(d, Some(c), SessionEntryKind::Compaction { summary: "second compaction".into(), first_kept_entry_id: c, tokens_before: 2000 }),
        ];
        let refs: Vec<&SessionEntry> = entries.iter().collect();
        let messages = build_session_context(&refs);
        assert!(matches!(&messages[0], Message::CompactionSummary { summary } if summary == "second compaction"));
    }
}
