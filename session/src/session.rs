//! [`Session`]: the top-level facade over the log and the tree. Owns the on-disk file and the
//! in-memory leaf pointer together so the two never drift apart.

use std::path::{Path, PathBuf};

use kestrel_protocol::session_entry::{EntryId, SessionEntry, SessionEntryKind};
use kestrel_protocol::Message;

use crate::context::build_session_context;
use crate::error::SessionError;
use crate::log::SessionLog;
use crate::tree::SessionTree;

pub struct Session {
    log: SessionLog,
    tree: SessionTree,
}

impl Session {
    /// Opens (or creates) the session log at `path` and replays it into a
    /// fresh tree.
    pub fn load(path: PathBuf) -> Result<Self, SessionError> {
        let entries = SessionLog::read_all(&path)?;
        let tree = SessionTree::from_entries(entries);
        let log = SessionLog::open(path)?;
        Ok(Session { log, tree })
    }

    /// Creates a brand new, empty session at `path`. Equivalent to `load`
    /// when the file doesn't exist yet; kept as a distinct name because
    /// callers reason about the two differently.
    pub fn create(path: PathBuf) -> Result<Self, SessionError> {
        Self::load(path)
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }

    pub fn leaf(&self) -> Option<EntryId> {
        self.tree.leaf()
    }

    pub fn get(&self, id: EntryId) -> Option<&SessionEntry> {
        self.tree.get(id)
    }

    /// The LLM-visible transcript for the current leaf.
    pub fn session_context(&self) -> Vec<Message> {
        match self.tree.leaf() {
            Some(leaf) => build_session_context(&self.tree.path_to_root(leaf)),
            None => Vec::new(),
        }
    }

    /// Every entry on the current leaf's path, oldest first. Used by
    /// compaction to pick `firstKeptEntryId` and report `branchEntries`.
    pub fn entries_on_current_path(&self) -> Vec<&SessionEntry> {
        match self.tree.leaf() {
            Some(leaf) => self.tree.path_to_root(leaf),
            None => Vec::new(),
        }
    }

    fn append(&mut self, kind: SessionEntryKind) -> Result<EntryId, SessionError> {
        let entry = SessionEntry::new(self.tree.leaf(), kind);
        self.log.append(&entry)?;
        let id = entry.entry_id;
        self.tree.insert(entry);
        Ok(id)
    }

    pub fn append_message(&mut self, message: Message) -> Result<EntryId, SessionError> {
        self.append(SessionEntryKind::Message { message })
    }

    pub fn append_model_change(&mut self, provider: String, model_id: String) -> Result<EntryId, SessionError> {
        self.append(SessionEntryKind::ModelChange { provider, model_id })
    }

    pub fn append_thinking_level_change(&mut self, level: String) -> Result<EntryId, SessionError> {
        self.append(SessionEntryKind::ThinkingLevelChange { level })
    }

    pub fn append_label(&mut self, entry_id: EntryId, text: String) -> Result<EntryId, SessionError> {
        self.append(SessionEntryKind::Label { entry_id, text })
    }

    pub fn append_custom(&mut self, custom_type: String, data: serde_json::Value) -> Result<EntryId, SessionError> {
        self.append(SessionEntryKind::CustomEntry { custom_type, data })
    }

    /// Records that the context was compacted: everything strictly before
    /// `first_kept_entry_id` drops out of `session_context()` from now on,
    /// replaced by `summary`. The dropped entries stay on disk and in the
    /// tree untouched.
    pub fn record_compaction(&mut self, summary: String, first_kept_entry_id: EntryId, tokens_before: u32) -> Result<EntryId, SessionError> {
        if !self.tree.contains(first_kept_entry_id) {
            return Err(SessionError::EntryNotFound(first_kept_entry_id));
        }
        self.append(SessionEntryKind::Compaction { summary, first_kept_entry_id, tokens_before })
    }

    /// Moves the leaf to `entry_id` without appending anything. Used to
    /// resume an earlier point in the tree without narrating the jump.
    pub fn branch(&mut self, entry_id: EntryId) -> Result<(), SessionError> {
        self.tree.set_leaf(entry_id).map_err(SessionError::EntryNotFound)
    }

    /// Moves the leaf to `entry_id`, optionally narrating the jump with a
    /// `BranchSummary` entry appended under the branch being left behind
    /// before the leaf moves. `summary` is `None` for a silent branch (see
    /// `branch`, which is the same operation without the narration).
    pub fn navigate_tree(&mut self, entry_id: EntryId, summary: Option<(String, Option<serde_json::Value>)>) -> Result<(), SessionError> {
        if !self.tree.contains(entry_id) {
            return Err(SessionError::EntryNotFound(entry_id));
        }
        if let Some((summary, details)) = summary {
            self.append(SessionEntryKind::BranchSummary { summary, details })?;
        }
        self.tree.set_leaf(entry_id).map_err(SessionError::EntryNotFound)
    }

    /// Every user-authored message on the current leaf's path, oldest
    /// first — the candidate set for `getUserMessagesForBranching`.
    pub fn user_message_entries_for_branching(&self) -> Vec<&SessionEntry> {
        let Some(leaf) = self.tree.leaf() else { return Vec::new() };
        self.tree
            .path_to_root(leaf)
            .into_iter()
            .filter(|entry| matches!(entry.as_message(), Some(Message::User { .. })))
            .collect()
    }
}
