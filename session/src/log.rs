//! The on-disk append-only log: one JSON object per line, never rewritten or truncated.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use kestrel_protocol::SessionEntry;

use crate::error::SessionError;

pub struct SessionLog {
    path: PathBuf,
    file: File,
}

impl SessionLog {
    /// Opens `path` for appending, creating the file (and its entries, none
    /// yet) if it doesn't exist.
    pub fn open(path: PathBuf) -> Result<Self, SessionError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SessionError::Io { path: path.display().to_string(), source })?;
        Ok(SessionLog { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `entry` and flushes immediately — a session log that's lost
    /// an in-flight write on crash is worse than one write call slower.
    pub fn append(&mut self, entry: &SessionEntry) -> Result<(), SessionError> {
        let line = serde_json::to_string(entry).map_err(|source| SessionError::InvalidEntry {
            path: self.path.display().to_string(),
            line: 0,
            source,
        })?;
        writeln!(self.file, "{line}").map_err(|source| SessionError::Io { path: self.path.display().to_string(), source })?;
        self.file.flush().map_err(|source| SessionError::Io { path: self.path.display().to_string(), source })
    }

    /// Reads every entry currently on disk, in append order.
    pub fn read_all(path: &Path) -> Result<Vec<SessionEntry>, SessionError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(SessionError::Io { path: path.display().to_string(), source }),
        };
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| SessionError::Io { path: path.display().to_string(), source })?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: SessionEntry = serde_json::from_str(&line)
                .map_err(|source| SessionError::InvalidEntry { path: path.display().to_string(), line: line_no + 1, source })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use kestrel_protocol::session_entry::SessionEntryKind;
    use kestrel_protocol::Message;

    #[test]
    fn appended_entries_round_trip_through_read_all() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.jsonl");
        let mut log = SessionLog::open(path.clone()).expect("open");

        let entry = SessionEntry::new(None, SessionEntryKind::Message { message: Message::user_text("hi") });
        log.append(&entry).expect("append");

        let loaded = SessionLog::read_all(&path).expect("read_all");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].entry_id, entry.entry_id);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.jsonl");
        assert!(SessionLog::read_all(&path).expect("read_all").is_empty());
    }

    #[test]
    fn reopening_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.jsonl");
        {
            let mut log = SessionLog::open(path.clone()).expect("open");
            log.append(&SessionEntry::new(None, SessionEntryKind::Message { message: Message::user_text("one") })).expect("append");
        }
        {
            let mut log = SessionLog::open(path.clone()).expect("open");
            log.append(&SessionEntry::new(None, SessionEntryKind::Message { message: Message::user_text("two") })).expect("append");
        }
        assert_eq!(SessionLog::read_all(&path).expect("read_all").len(), 2);
    }
}
