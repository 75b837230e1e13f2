//! Unit-of-work helpers.
//!
//! Operations are written as
//!
//! ```ignore
//! with_deadline(timeout, async {
//!     let mut tx = store.begin().await?;
//!     let outcome = body(&mut tx).await;
//!     settle(&store, tx, outcome).await
//! })
//! ```
//!
//! If the deadline fires, the whole future is dropped together with the
//! transaction it owns, which rolls it back.

use std::future::Future;
use std::time::Duration;

use store::Transactional;

use crate::error::{Result, ShopError};

/// Runs `work`, failing with `Timeout` once `timeout` has elapsed.
pub(crate) async fn with_deadline<T, F>(timeout: Duration, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, work).await {
        Ok(result) => result,
        Err(_) => {
            metrics::counter!("transaction_timeouts_total").increment(1);
            tracing::warn!(?timeout, "transaction deadline exceeded, rolled back");
            Err(ShopError::Timeout(timeout))
        }
    }
}

/// Commits on success and rolls back on failure.
///
/// A failed rollback is logged; the caller still gets the original error.
pub(crate) async fn settle<S, T>(store: &S, tx: S::Tx, outcome: Result<T>) -> Result<T>
where
    S: Transactional,
{
    match outcome {
        Ok(value) => {
            store.commit(tx).await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = store.rollback(tx).await {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
