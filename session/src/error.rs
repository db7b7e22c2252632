use kestrel_protocol::EntryId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("corrupt session log at {path}, line {line}: {source}")]
    InvalidEntry { path: String, line: usize, source: serde_json::Error },

    #[error("no entry with id {0}")]
    EntryNotFound(EntryId),
}
