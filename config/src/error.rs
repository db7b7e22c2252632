//! Error type for configuration management.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("home directory not found")]
    HomeDirNotFound,

    #[error("invalid TOML in {file}: {source}")]
    InvalidToml {
        file: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize {file} as TOML: {source}")]
    SerializeToml {
        file: String,
        #[source]
        source: toml::ser::Error,
    },

    #[error("invalid JSON in {file}: {source}")]
    InvalidJson {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
