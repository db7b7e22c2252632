use thiserror::Error;

use kestrel_agent_core::AgentError;
use kestrel_session::SessionError;

#[derive(Debug, Error)]
pub enum AgentSessionError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("exportToHtml is out of scope for this build")]
    ExportToHtmlUnsupported,

    #[error("failed to spawn subprocess: {0}")]
    SubprocessSpawn(String),
}

pub type Result<T> = std::result::Result<T, AgentSessionError>;
