// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The failure choke point.
//!
//! Every externally-invoked block runs through [`Envelope::guard`]: lost
//! store connections are healed by the reconnect layers, and whatever
//! still fails is classified into exactly one record, either a
//! `ProcessingFailed` bucket or an operator mail. Nothing is swallowed
//! silently. (Project-scan failures are recorded by the scanner itself.)

use dcc_adapters::MailAdapter;
use dcc_core::{BucketId, Clock, WorkerUri};
use dcc_store::{close_build_if_done, with_reconnect, Store};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{error_chain, ExecError};

/// What the failing block was working on.
#[derive(Debug, Clone)]
pub enum ErrorContext {
    /// Failure lands on the bucket record.
    Bucket(BucketId),
    /// Failure is mailed to the operator address.
    Operator(String),
}

/// Reconnect-retries an operation and classifies terminal failures.
pub struct Envelope<S: Store, M: MailAdapter, C: Clock> {
    store: S,
    mail: M,
    clock: C,
    self_uri: WorkerUri,
    /// Last observed leader, maintained by the election loop.
    leader_uri: Arc<Mutex<Option<WorkerUri>>>,
    reconnect_delay: Duration,
}

impl<S: Store, M: MailAdapter, C: Clock> Envelope<S, M, C> {
    pub fn new(
        store: S,
        mail: M,
        clock: C,
        self_uri: WorkerUri,
        leader_uri: Arc<Mutex<Option<WorkerUri>>>,
        reconnect_delay: Duration,
    ) -> Self {
        Self { store, mail, clock, self_uri, leader_uri, reconnect_delay }
    }

    /// Run `op` with reconnect retry; on terminal failure, produce the
    /// context's failure record and return `None`.
    pub async fn guard<T, F, Fut>(&self, context: ErrorContext, op: F) -> Option<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ExecError>>,
    {
        match with_reconnect(&self.store, self.reconnect_delay, op).await {
            Ok(value) => Some(value),
            Err(error) => {
                self.report(&context, &error).await;
                None
            }
        }
    }

    /// Produce the failure record for an already-terminal error.
    pub async fn report(&self, context: &ErrorContext, error: &ExecError) {
        tracing::error!(?context, error = %error, "operation failed");
        match context {
            ErrorContext::Bucket(bucket_id) => self.fail_bucket(bucket_id, error).await,
            ErrorContext::Operator(address) => self.mail_operator(address, error).await,
        }
    }

    async fn fail_bucket(&self, bucket_id: &BucketId, error: &ExecError) {
        let result = with_reconnect(&self.store, self.reconnect_delay, || async {
            let mut bucket = self.store.bucket(bucket_id).await?;
            if bucket.state.is_terminal() {
                return Ok(());
            }
            bucket.record_processing_failure(&error.to_string(), &error_chain(error));
            bucket.finished_at = Some(self.clock.epoch_ms());
            self.store.update_bucket(&bucket).await?;
            close_build_if_done(&self.store, &bucket.build_id, self.clock.epoch_ms()).await?;
            Ok::<(), ExecError>(())
        })
        .await;
        if let Err(e) = result {
            tracing::error!(bucket = %bucket_id, error = %e, "failure record could not be written");
        }
    }

    async fn mail_operator(&self, address: &str, error: &ExecError) {
        let leader = self
            .leader_uri
            .lock()
            .clone()
            .map_or_else(|| "unknown".to_string(), |uri| uri.to_string());
        let message = crate::notify::dcc_message(
            address,
            &format!("worker error on {}", self.self_uri),
            &format!(
                "worker: {}\nleader: {}\n\n{}",
                self.self_uri,
                leader,
                error_chain(error)
            ),
        );
        if let Err(e) = self.mail.deliver(&message).await {
            tracing::error!(error = %e, "operator mail could not be delivered");
        }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
