// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leader-side project scanning: liveness confirmation and build creation.

use dcc_adapters::PeerRpc;
use dcc_core::{BucketState, Clock, WorkerUri};
use dcc_store::{close_build_if_done, with_reconnect, Build, Bucket, Project, Store};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::SchedulerError;
use crate::queue::BucketQueue;

/// Outcome of confirming one non-terminal bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketHealth {
    /// A live worker vouched for the bucket (or it is pending re-enqueue).
    Alive,
    /// Nobody owns the bucket any more; the reason lands in its log.
    Dead(String),
}

/// Walks all projects on each leader tick.
///
/// For every project: confirm any in-flight build, mark orphaned buckets
/// `ProcessingFailed`, and create the next build when the project wants
/// one. Failures of a single project are recorded on the project and never
/// abort the scan.
pub struct ProjectScanner<S: Store, P: PeerRpc, C: Clock> {
    store: S,
    peers: P,
    clock: C,
    queue: Arc<Mutex<BucketQueue>>,
    self_uri: WorkerUri,
    reconnect_delay: Duration,
    /// Set when leadership was just gained; the next scan re-enqueues
    /// queued buckets from the store instead of declaring them orphaned.
    rebuild_queue: AtomicBool,
}

impl<S: Store, P: PeerRpc, C: Clock> ProjectScanner<S, P, C> {
    pub fn new(
        store: S,
        peers: P,
        clock: C,
        queue: Arc<Mutex<BucketQueue>>,
        self_uri: WorkerUri,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            store,
            peers,
            clock,
            queue,
            self_uri,
            reconnect_delay,
            rebuild_queue: AtomicBool::new(true),
        }
    }

    /// Called on gaining leadership: the queue is stale and must be
    /// reconstructed from the store on the next scan.
    pub fn reset(&self) {
        self.queue.lock().clear();
        self.rebuild_queue.store(true, Ordering::SeqCst);
    }

    /// One full scan over all projects.
    pub async fn scan(&self) {
        let rebuilding = self.rebuild_queue.swap(false, Ordering::SeqCst);
        let projects = match with_reconnect(&self.store, self.reconnect_delay, || {
            self.store.projects()
        })
        .await
        {
            Ok(projects) => projects,
            Err(e) => {
                tracing::error!(error = %e, "project listing failed, skipping scan");
                return;
            }
        };

        for project in projects {
            if let Err(e) = self.scan_project(&project, rebuilding).await {
                tracing::error!(project = %project.name, error = %e, "project scan failed");
                self.record_project_error(&project, &e).await;
            }
        }
    }

    async fn scan_project(
        &self,
        project: &Project,
        rebuilding: bool,
    ) -> Result<(), SchedulerError> {
        if self.project_in_build(project, rebuilding).await? {
            return Ok(());
        }
        if !project.wants_build() {
            return Ok(());
        }
        self.create_build(project).await
    }

    /// True while the project still has work in flight.
    ///
    /// Confirmation walks each non-terminal bucket of the latest build and
    /// marks dead ones `ProcessingFailed`; errors on one bucket do not stop
    /// the walk.
    async fn project_in_build(
        &self,
        project: &Project,
        rebuilding: bool,
    ) -> Result<bool, SchedulerError> {
        if !self.queue.lock().is_empty(&project.name) {
            return Ok(true);
        }
        let last = with_reconnect(&self.store, self.reconnect_delay, || {
            self.store.last_build(&project.name, None)
        })
        .await?;
        let Some(build) = last else {
            return Ok(false);
        };
        let buckets = with_reconnect(&self.store, self.reconnect_delay, || {
            self.store.buckets_of_build(&build.id)
        })
        .await?;

        let mut alive = false;
        let mut requeue = Vec::new();
        for bucket in buckets.iter().filter(|b| !b.state.is_terminal()) {
            match self.confirm(bucket, rebuilding).await {
                BucketHealth::Alive => {
                    if bucket.state == BucketState::Queued {
                        requeue.push(bucket.id.clone());
                    }
                    alive = true;
                }
                BucketHealth::Dead(reason) => {
                    tracing::warn!(
                        bucket = %bucket.id,
                        project = %project.name,
                        %reason,
                        "bucket lost its worker"
                    );
                    if let Err(e) = self.mark_dead(bucket, &reason).await {
                        tracing::error!(bucket = %bucket.id, error = %e, "marking bucket failed");
                    }
                }
            }
        }
        if !requeue.is_empty() {
            self.queue.lock().set_buckets(&project.name, requeue);
        }
        Ok(alive)
    }

    async fn confirm(&self, bucket: &Bucket, rebuilding: bool) -> BucketHealth {
        match bucket.state {
            // A fresh leader adopts queued buckets; an established one
            // cannot have queued buckets it does not know about.
            BucketState::Queued if rebuilding => BucketHealth::Alive,
            BucketState::Queued => {
                BucketHealth::Dead("queued bucket unknown to the current leader".to_string())
            }
            BucketState::Claimed => match &bucket.worker_uri {
                None => BucketHealth::Dead("claimed without a worker".to_string()),
                Some(worker) => match self.peers.processing(worker, &bucket.id).await {
                    Ok(true) => BucketHealth::Alive,
                    Ok(false) => {
                        BucketHealth::Dead(format!("worker {worker} denies processing it"))
                    }
                    Err(e) => BucketHealth::Dead(format!("worker {worker} unreachable: {e}")),
                },
            },
            // Terminal buckets are filtered out before confirmation.
            _ => BucketHealth::Alive,
        }
    }

    async fn mark_dead(&self, bucket: &Bucket, reason: &str) -> Result<(), SchedulerError> {
        with_reconnect(&self.store, self.reconnect_delay, || async {
            let mut fresh = self.store.bucket(&bucket.id).await?;
            if fresh.state.is_terminal() {
                return Ok(());
            }
            fresh.record_processing_failure("bucket lost its worker", reason);
            fresh.finished_at = Some(self.clock.epoch_ms());
            self.store.update_bucket(&fresh).await?;
            close_build_if_done(&self.store, &fresh.build_id, self.clock.epoch_ms()).await?;
            Ok::<(), SchedulerError>(())
        })
        .await
    }

    async fn create_build(&self, project: &Project) -> Result<(), SchedulerError> {
        let commit = project
            .current_commit
            .clone()
            .ok_or_else(|| SchedulerError::NoCommit(project.name.clone()))?;
        let number = with_reconnect(&self.store, self.reconnect_delay, || {
            self.store.next_build_number(&project.name)
        })
        .await?;

        let build = Build::new(&project.name, number, commit, self.self_uri.clone());
        with_reconnect(&self.store, self.reconnect_delay, || {
            self.store.insert_build(&build)
        })
        .await?;

        let mut ids = Vec::new();
        for name in project.bucket_names() {
            let bucket = Bucket::new(build.id.clone(), name);
            with_reconnect(&self.store, self.reconnect_delay, || {
                self.store.insert_bucket(&bucket)
            })
            .await?;
            ids.push(bucket.id.clone());
        }

        tracing::info!(
            project = %project.name,
            build = build.number,
            commit = %build.commit,
            buckets = ids.len(),
            "created build"
        );
        self.queue.lock().set_buckets(&project.name, ids);

        let mut consumed = project.clone();
        consumed.update_state();
        with_reconnect(&self.store, self.reconnect_delay, || {
            self.store.update_project(&consumed)
        })
        .await?;
        Ok(())
    }

    /// A failed scan surfaces on the project record for the operator.
    async fn record_project_error(&self, project: &Project, error: &SchedulerError) {
        let result = with_reconnect(&self.store, self.reconnect_delay, || async {
            let mut fresh = self.store.project(&project.name).await?;
            fresh.last_system_error = Some(error.to_string());
            self.store.update_project(&fresh).await
        })
        .await;
        if let Err(e) = result {
            tracing::error!(project = %project.name, error = %e, "recording scan error failed");
        }
    }
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
