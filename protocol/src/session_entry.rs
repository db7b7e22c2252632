//! [`SessionEntry`] — one record in the append-only session log.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

/// Unique id for a `SessionEntry`, assigned at append time.
pub type EntryId = Uuid;

/// One line of the append-only session log. Entries form a tree via
/// `parent_id`; see `kestrel-session` for the tree/leaf bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub entry_id: EntryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntryId>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub kind: SessionEntryKind,
}

/// The payload carried by a [`SessionEntry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEntryKind {
    Message {
        message: Message,
    },
    ModelChange {
        provider: String,
        model_id: String,
    },
    ThinkingLevelChange {
        level: String,
    },
    Label {
        /// The entry this label annotates.
        entry_id: EntryId,
        text: String,
    },
    Compaction {
        summary: String,
        first_kept_entry_id: EntryId,
        tokens_before: u32,
    },
    BranchSummary {
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
    /// Extension-owned state. Never sent to the LLM; round-trips through
    /// the log so an extension can rebuild its own state on session load.
    CustomEntry {
        custom_type: String,
        data: serde_json::Value,
    },
}

impl SessionEntry {
    pub fn new(parent_id: Option<EntryId>, kind: SessionEntryKind) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            parent_id,
            timestamp: chrono::Utc::now(),
            kind,
        }
    }

    /// The `Message` carried by this entry, if any.
    pub fn as_message(&self) -> Option<&Message> {
        match &self.kind {
            SessionEntryKind::Message { message } => Some(message),
            _ => None,
        }
    }
}
