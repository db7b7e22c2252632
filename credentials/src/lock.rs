//! Cross-process locking for the credentials file, so two processes racing an OAuth refresh don't
//! both perform the HTTP exchange.

use std::fs::File;
use std::time::Duration;

use fs2::FileExt;
use rand::Rng;

use crate::error::{CredentialError, Result};

const MAX_ATTEMPTS: u32 = 10;
const BASE_DELAY_MS: u64 = 100;
const MAX_DELAY_MS: u64 = 10_000;
const STALE_AFTER: Duration = Duration::from_secs(30);

/// Retries `try_lock_exclusive` with jittered exponential backoff: 10
/// attempts, factor 2, 100ms→10s, giving up once 30s has elapsed even if
/// attempts remain (a lock held that long is treated as stale rather than
/// waited out further).
pub(crate) async fn acquire_exclusive(file: &File) -> Result<()> {
    let started = tokio::time::Instant::now();
    let mut delay_ms = BASE_DELAY_MS;
    for attempt in 1..=MAX_ATTEMPTS {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(_) if attempt < MAX_ATTEMPTS && started.elapsed() < STALE_AFTER => {
                let jitter = rand::rng().random_range(0..=delay_ms / 2);
                tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
            Err(_) => return Err(CredentialError::LockTimeout { attempts: attempt }),
        }
    }
    Err(CredentialError::LockTimeout { attempts: MAX_ATTEMPTS })
}

pub(crate) fn release_exclusive(file: &File) {
    if let Err(source) = file.unlock() {
        tracing::warn!(%source, "failed to release credentials file lock");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::fs::OpenOptions;

    #[tokio::test]
    async fn uncontended_lock_acquires_on_first_attempt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("auth.lock");
        let file = OpenOptions::new().create(true).write(true).open(&path).expect("open");
        acquire_exclusive(&file).await.expect("acquire");
        release_exclusive(&file);
    }
}
