use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("io error on {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson { path: String, source: serde_json::Error },

    #[error("no API key available for provider {0}")]
    NoKeyForProvider(String),

    #[error("could not acquire credentials file lock after {attempts} attempts")]
    LockTimeout { attempts: u32 },

    #[error("OAuth refresh failed for provider {provider}: {message}")]
    RefreshFailed { provider: String, message: String },
}

pub type Result<T> = std::result::Result<T, CredentialError>;
