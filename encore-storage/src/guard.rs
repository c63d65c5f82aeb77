//! Timeout guard for store operations.

use std::future::Future;
use std::time::Duration;

use encore_core::{EncoreResult, StorageError};

/// Await `future`, failing with [`StorageError::Timeout`] if it has not
/// settled within `after`. The abandoned future is dropped.
pub async fn with_timeout<T, F>(operation: &str, after: Duration, future: F) -> EncoreResult<T>
where
    F: Future<Output = EncoreResult<T>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout {
            operation: operation.to_string(),
            after,
        }
        .into()),
    }
}
