use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error(transparent)]
    Terminal(#[from] kestrel_terminal::TerminalError),

    #[error(transparent)]
    Render(#[from] kestrel_render::WidthViolation),

    #[error(transparent)]
    Session(#[from] kestrel_agent_session::AgentSessionError),

    #[error(transparent)]
    Editor(#[from] kestrel_components::EditorError),

    #[error("terminal size unavailable: {0}")]
    Size(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TuiError>;
