//! Bounded local retry for transient storage failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::Result;

const MAX_RETRIES: u32 = 2;
const BASE_BACKOFF_MS: u64 = 25;

/// Runs `op`, retrying only `StorageError::Unavailable`. Every other error,
/// and the last storage error, is returned unchanged.
pub async fn with_storage_retry<T, F, Fut>(operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match op().await {
            Err(e) if e.is_retryable() && retries < MAX_RETRIES => {
                retries += 1;
                let jitter = rand::thread_rng().gen_range(0..BASE_BACKOFF_MS);
                let backoff = BASE_BACKOFF_MS * 2u64.pow(retries - 1) + jitter;
                warn!("{} failed ({}), retry {}/{} in {}ms", operation, e, retries, MAX_RETRIES, backoff);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            result => return result,
        }
    }
}
