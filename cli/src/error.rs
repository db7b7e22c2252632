use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown model {0:?}; run with --list-models to see the catalog")]
    UnknownModel(String),
}
