//! The in-memory entry tree: entries never move or vanish, only the current leaf pointer does.

use std::collections::HashMap;

use kestrel_protocol::session_entry::{EntryId, SessionEntry};

#[derive(Default)]
pub struct SessionTree {
    entries: HashMap<EntryId, SessionEntry>,
    children: HashMap<EntryId, Vec<EntryId>>,
    leaf: Option<EntryId>,
}

impl SessionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replays a log read from disk, in append order. The last entry
    /// becomes the leaf.
    pub fn from_entries(entries: Vec<SessionEntry>) -> Self {
        let mut tree = Self::new();
        for entry in entries {
            tree.insert(entry);
        }
        tree
    }

    pub fn insert(&mut self, entry: SessionEntry) {
        if let Some(parent) = entry.parent_id {
            self.children.entry(parent).or_default().push(entry.entry_id);
        }
        self.leaf = Some(entry.entry_id);
        self.entries.insert(entry.entry_id, entry);
    }

    pub fn leaf(&self) -> Option<EntryId> {
        self.leaf
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: EntryId) -> Option<&SessionEntry> {
        self.entries.get(&id)
    }

    pub fn children_of(&self, id: EntryId) -> &[EntryId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Moves the leaf pointer to `id` without appending anything. Errors if
    /// `id` isn't in the tree yet.
    pub fn set_leaf(&mut self, id: EntryId) -> Result<(), EntryId> {
        if !self.entries.contains_key(&id) {
            return Err(id);
        }
        self.leaf = Some(id);
        Ok(())
    }

    /// The chain from the tree root down to `leaf`, oldest first.
    pub fn path_to_root(&self, leaf: EntryId) -> Vec<&SessionEntry> {
        let mut reversed = Vec::new();
        let mut current = Some(leaf);
        while let Some(id) = current {
            let Some(entry) = self.entries.get(&id) else { break };
            reversed.push(entry);
            current = entry.parent_id;
        }
        reversed.reverse();
        reversed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_protocol::session_entry::SessionEntryKind;
    use kestrel_protocol::Message;

    fn msg_entry(parent: Option<EntryId>, text: &str) -> SessionEntry {
        SessionEntry::new(parent, SessionEntryKind::Message { message: Message::user_text(text) })
    }

    #[test]
    fn path_to_root_is_oldest_first() {
        let mut tree = SessionTree::new();
        let a = msg_entry(None, "a");
        let a_id = a.entry_id;
        tree.insert(a);
        let b = msg_entry(Some(a_id), "b");
        let b_id = b.entry_id;
        tree.insert(b);

        let path = tree.path_to_root(b_id);
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].entry_id, a_id);
        assert_eq!(path[1].entry_id, b_id);
    }

    #[test]
    fn set_leaf_rejects_unknown_entry() {
        let mut tree = SessionTree::new();
        assert!(tree.set_leaf(uuid::Uuid::new_v4()).is_err());
    }

    #[test]
    fn inserting_two_children_of_the_same_parent_branches() {
        let mut tree = SessionTree::new();
        let root = msg_entry(None, "root");
        let root_id = root.entry_id;
        tree.insert(root);
        let left = msg_entry(Some(root_id), "left");
        let right = msg_entry(Some(root_id), "right");
        tree.insert(left);
        tree.insert(right);
        assert_eq!(tree.children_of(root_id).len(), 2);
    }
}
