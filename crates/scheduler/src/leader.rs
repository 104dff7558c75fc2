// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The leader's assignment endpoint.

use dcc_core::{BucketId, BucketState, Clock, WorkerUri};
use dcc_store::{with_reconnect, Store};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SchedulerError;
use crate::queue::BucketQueue;

/// Answers `next_bucket` requests while this peer leads its group.
///
/// Shares the [`BucketQueue`] mutex with the scanner so an assignment can
/// never observe a half-enqueued build.
pub struct LeaderService<S: Store, C: Clock> {
    store: S,
    clock: C,
    queue: Arc<Mutex<BucketQueue>>,
    /// Sleep window handed to followers when nothing is pending.
    back_off: Duration,
    /// Upper bound of the random pre-pop sleep smearing concurrent callers.
    jitter: Duration,
    reconnect_delay: Duration,
}

impl<S: Store, C: Clock> LeaderService<S, C> {
    pub fn new(
        store: S,
        clock: C,
        queue: Arc<Mutex<BucketQueue>>,
        back_off: Duration,
        jitter: Duration,
        reconnect_delay: Duration,
    ) -> Self {
        Self { store, clock, queue, back_off, jitter, reconnect_delay }
    }

    /// Pop a bucket for `requestor` and claim it in the store.
    ///
    /// Returns `(None, back_off)` when nothing is pending; the follower is
    /// expected to sleep that many seconds before asking again.
    pub async fn next_bucket(
        &self,
        requestor: &WorkerUri,
        hostname: &str,
    ) -> Result<(Option<BucketId>, u64), SchedulerError> {
        if !self.jitter.is_zero() {
            let ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        let popped = self.queue.lock().next_bucket(requestor);
        let Some(bucket_id) = popped else {
            return Ok((None, self.back_off.as_secs()));
        };

        with_reconnect(&self.store, self.reconnect_delay, || {
            self.claim(&bucket_id, requestor, hostname)
        })
        .await?;

        tracing::info!(bucket = %bucket_id, worker = %requestor, "assigned bucket");
        Ok((Some(bucket_id), 0))
    }

    async fn claim(
        &self,
        bucket_id: &BucketId,
        requestor: &WorkerUri,
        hostname: &str,
    ) -> Result<(), SchedulerError> {
        let mut bucket = self.store.bucket(bucket_id).await?;
        bucket.worker_uri = Some(requestor.clone());
        bucket.worker_hostname = Some(hostname.to_string());
        bucket.state = BucketState::Claimed;
        bucket.started_at = Some(self.clock.epoch_ms());
        self.store.update_bucket(&bucket).await?;

        let mut build = self.store.build(&bucket.build_id).await?;
        if build.started_at.is_none() {
            build.started_at = bucket.started_at;
            self.store.update_build(&build).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "leader_tests.rs"]
mod tests;
