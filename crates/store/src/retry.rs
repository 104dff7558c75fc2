// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnect-and-retry wrapper for store-touching operations.

use std::future::Future;
use std::time::Duration;

use crate::store::{Store, StoreError};

/// Pause between a reconnect and the re-run of the failed operation.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Errors that may carry a lost store connection inside them.
pub trait Disconnect {
    fn is_disconnect(&self) -> bool;
}

impl Disconnect for StoreError {
    fn is_disconnect(&self) -> bool {
        matches!(self, StoreError::ConnectionLost)
    }
}

/// Run `op`, re-running it after a reconnect when the connection was lost.
///
/// Two retry layers: a disconnect triggers `store.reconnect()` plus `delay`
/// and one re-run, twice over, so the operation is attempted at most three
/// times. Any other error, and a third disconnect, propagate to the caller.
pub async fn with_reconnect<S, T, E, F, Fut>(
    store: &S,
    delay: Duration,
    op: F,
) -> Result<T, E>
where
    S: Store,
    E: Disconnect + From<StoreError>,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts_left = 2;
    loop {
        match op().await {
            Err(e) if e.is_disconnect() && attempts_left > 0 => {
                attempts_left -= 1;
                tracing::warn!(attempts_left, "store connection lost, reconnecting");
                store.reconnect().await?;
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
