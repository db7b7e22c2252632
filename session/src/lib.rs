//! The append-only session log and entry tree. `kestrel-session` owns persistence and history
//! navigation only — it never calls a provider or decides *when* to compact; it just records the
//! decisions other crates (`kestrel-agent-session`) make and answers "what's the transcript right
//! now" from what's on disk.

pub mod context;
pub mod error;
pub mod log;
pub mod session;
pub mod tree;

pub use context::build_session_context;
pub use error::SessionError;
pub use log::SessionLog;
pub use session::Session;
pub use tree::SessionTree;
