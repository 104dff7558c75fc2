// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client seam for peer-to-peer RPC.

use async_trait::async_trait;
use dcc_core::{BucketId, WorkerUri};
use thiserror::Error;

/// Errors from calling another peer
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    #[error("peer refused: {0}")]
    Refused(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Outbound RPC surface between peers.
///
/// Every peer may call every other: followers ask the leader for work,
/// the leader probes workers for bucket liveness.
#[async_trait]
pub trait PeerRpc: Clone + Send + Sync + 'static {
    /// Ask `leader` for the next bucket. Returns the bucket to run (if any)
    /// and the back-off hint in seconds.
    async fn next_bucket(
        &self,
        leader: &WorkerUri,
        requestor: &WorkerUri,
        hostname: &str,
    ) -> Result<(Option<BucketId>, u64), PeerError>;

    /// Ask `peer` whether it is still processing `bucket_id`.
    async fn processing(&self, peer: &WorkerUri, bucket_id: &BucketId) -> Result<bool, PeerError>;

    async fn ping(&self, peer: &WorkerUri) -> Result<(), PeerError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{PeerError, PeerRpc};
    use async_trait::async_trait;
    use dcc_core::{BucketId, WorkerUri};
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    /// Scripted answer for a liveness probe.
    #[derive(Debug, Clone)]
    pub enum ProcessingAnswer {
        Active,
        Idle,
        Unreachable,
    }

    #[derive(Default)]
    struct FakePeersState {
        processing: HashMap<String, ProcessingAnswer>,
        assignments: VecDeque<(Option<BucketId>, u64)>,
        probes: Vec<(WorkerUri, BucketId)>,
    }

    /// Fake peer RPC with scripted answers and recorded probes
    #[derive(Clone, Default)]
    pub struct FakePeers {
        inner: Arc<Mutex<FakePeersState>>,
    }

    impl FakePeers {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the liveness answer for a peer (default: unreachable).
        pub fn set_processing(&self, peer: &WorkerUri, answer: ProcessingAnswer) {
            self.inner.lock().processing.insert(peer.as_str().to_string(), answer);
        }

        /// Queue an assignment answer for `next_bucket`.
        pub fn push_assignment(&self, bucket_id: Option<BucketId>, back_off_secs: u64) {
            self.inner.lock().assignments.push_back((bucket_id, back_off_secs));
        }

        /// Probes observed so far, in call order.
        pub fn probes(&self) -> Vec<(WorkerUri, BucketId)> {
            self.inner.lock().probes.clone()
        }
    }

    #[async_trait]
    impl PeerRpc for FakePeers {
        async fn next_bucket(
            &self,
            _leader: &WorkerUri,
            _requestor: &WorkerUri,
            _hostname: &str,
        ) -> Result<(Option<BucketId>, u64), PeerError> {
            Ok(self.inner.lock().assignments.pop_front().unwrap_or((None, 1)))
        }

        async fn processing(
            &self,
            peer: &WorkerUri,
            bucket_id: &BucketId,
        ) -> Result<bool, PeerError> {
            let mut inner = self.inner.lock();
            inner.probes.push((peer.clone(), bucket_id.clone()));
            match inner.processing.get(peer.as_str()) {
                Some(ProcessingAnswer::Active) => Ok(true),
                Some(ProcessingAnswer::Idle) => Ok(false),
                Some(ProcessingAnswer::Unreachable) | None => {
                    Err(PeerError::Unreachable(peer.to_string()))
                }
            }
        }

        async fn ping(&self, peer: &WorkerUri) -> Result<(), PeerError> {
            match self.inner.lock().processing.get(peer.as_str()) {
                Some(_) => Ok(()),
                None => Err(PeerError::Unreachable(peer.to_string())),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePeers, ProcessingAnswer};
