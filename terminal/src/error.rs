use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
