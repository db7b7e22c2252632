use thiserror::Error;

use kestrel_provider::ProviderError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("could not resolve an API key for provider {0}: {1}")]
    CredentialResolution(String, String),

    #[error("prompt() called while a turn is already running")]
    AlreadyRunning,
}
