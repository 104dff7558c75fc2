// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The repository trait the scheduler and executor consume.

use async_trait::async_trait;
use dcc_core::{BucketId, BuildId};
use thiserror::Error;

use crate::records::{Build, Bucket, LogFragment, Project};

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend connection died mid-call. Callers reconnect and retry
    /// through [`crate::with_reconnect`]; this never reaches a user.
    #[error("server has gone away")]
    ConnectionLost,
    #[error("project not found: {0}")]
    NoSuchProject(String),
    #[error("build not found: {0}")]
    NoSuchBuild(BuildId),
    #[error("bucket not found: {0}")]
    NoSuchBucket(BucketId),
}

/// Repository abstraction over the relational schema.
///
/// The persistent schema itself is external; a backend implements CRUD plus
/// the handful of queries the scheduler and executor need. Every method may
/// fail with [`StoreError::ConnectionLost`].
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// Re-establish the backend connection after a disconnect.
    async fn reconnect(&self) -> Result<(), StoreError>;

    async fn projects(&self) -> Result<Vec<Project>, StoreError>;
    async fn project(&self, name: &str) -> Result<Project, StoreError>;
    async fn update_project(&self, project: &Project) -> Result<(), StoreError>;

    /// Number the next build of a project will carry (monotonic per project).
    async fn next_build_number(&self, project: &str) -> Result<u32, StoreError>;
    async fn insert_build(&self, build: &Build) -> Result<(), StoreError>;
    async fn build(&self, id: &BuildId) -> Result<Build, StoreError>;
    async fn update_build(&self, build: &Build) -> Result<(), StoreError>;
    /// Most recent build of a project, optionally restricted to numbers
    /// strictly below `before`.
    async fn last_build(&self, project: &str, before: Option<u32>)
        -> Result<Option<Build>, StoreError>;

    async fn insert_bucket(&self, bucket: &Bucket) -> Result<(), StoreError>;
    async fn bucket(&self, id: &BucketId) -> Result<Bucket, StoreError>;
    async fn update_bucket(&self, bucket: &Bucket) -> Result<(), StoreError>;
    async fn buckets_of_build(&self, build: &BuildId) -> Result<Vec<Bucket>, StoreError>;

    /// Append a log fragment; `seq` is assigned by the store in creation order.
    async fn append_fragment(&self, bucket: &BucketId, content: &str)
        -> Result<LogFragment, StoreError>;
    async fn fragments_of_bucket(&self, bucket: &BucketId)
        -> Result<Vec<LogFragment>, StoreError>;
    async fn delete_fragments(&self, bucket: &BucketId) -> Result<(), StoreError>;
}

/// Stamp `finished_at` on a build once every one of its buckets is terminal.
///
/// Called from every site that moves a bucket into a terminal state, so the
/// invariant holds no matter whether the executor, the scanner, or the
/// failure path settled the last bucket. Returns true when this call closed
/// the build.
pub async fn close_build_if_done<S: Store>(
    store: &S,
    build_id: &BuildId,
    now_ms: u64,
) -> Result<bool, StoreError> {
    let buckets = store.buckets_of_build(build_id).await?;
    if buckets.is_empty() || !buckets.iter().all(|b| b.state.is_terminal()) {
        return Ok(false);
    }
    let mut build = store.build(build_id).await?;
    if build.finished_at.is_some() {
        return Ok(false);
    }
    build.finished_at = Some(now_ms);
    store.update_build(&build).await?;
    tracing::info!(project = %build.project_name, build = build.number, "build finished");
    Ok(true)
}
