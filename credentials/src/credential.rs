//! The stored shape of a credential: either a bare API key or an OAuth token pair. Kept separate
//! from `CredentialStore` so the wire format can be tested without touching the filesystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    ApiKey {
        key: String,
    },
    OAuth {
        access: String,
        refresh: String,
        expires: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_id: Option<String>,
    },
}

impl Credential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self, Credential::OAuth { expires, .. } if now >= *expires)
    }
}

pub type CredentialMap = std::collections::HashMap<String, Credential>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn api_key_credential_is_never_expired() {
        let cred = Credential::ApiKey { key: "sk-test".into() };
        assert!(!cred.is_expired(Utc::now()));
    }

    #[test]
    fn oauth_credential_expires_at_its_timestamp() {
        let cred = Credential::OAuth {
            access: "access".into(),
            refresh: "refresh".into(),
            expires: Utc::now() - chrono::Duration::seconds(1),
            project_id: None,
        };
        assert!(cred.is_expired(Utc::now()));
    }

    #[test]
    fn round_trips_through_json() {
        let cred = Credential::OAuth {
            access: "access".into(),
            refresh: "refresh".into(),
            expires: Utc::now(),
            project_id: Some("proj-1".into()),
        };
        let json = serde_json::to_string(&cred).expect("serialize");
        let back: Credential = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(cred, back);
    }
}
