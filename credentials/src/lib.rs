//! The credential store: a JSON file under 0700/0600 permissions, cross-process locked for OAuth
//! refresh via `fs2`.

pub mod credential;
pub mod error;
pub mod lock;
pub mod store;

pub use credential::{Credential, CredentialMap};
pub use error::CredentialError;
pub use store::{CredentialStore, CredentialStoreBuilder, OAuthRefresher, RefreshedOAuth};
