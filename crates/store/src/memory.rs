// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store: the single-host backend and the test double.

use async_trait::async_trait;
use dcc_core::{BucketId, BuildId, FragmentId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::records::{Build, Bucket, LogFragment, Project};
use crate::store::{Store, StoreError};

#[derive(Default)]
struct Inner {
    projects: HashMap<String, Project>,
    builds: HashMap<BuildId, Build>,
    buckets: HashMap<BucketId, Bucket>,
    fragments: HashMap<BucketId, Vec<LogFragment>>,
    /// Global creation-order counter for fragment sequencing.
    fragment_seq: u64,
    /// Remaining calls forced to fail with `ConnectionLost`.
    fail_budget: u32,
}

/// In-memory [`Store`].
///
/// Bundled backend for single-host pools and the double for every test that
/// needs a store. `fail_next` injects "server has gone away" failures to
/// exercise the reconnect envelope.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` store calls fail with [`StoreError::ConnectionLost`].
    pub fn fail_next(&self, n: u32) {
        self.inner.lock().fail_budget = n;
    }

    /// Register a project (normally done by the external front-end).
    pub fn add_project(&self, project: Project) {
        self.inner.lock().projects.insert(project.name.clone(), project);
    }

    fn gate(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_budget > 0 {
            inner.fail_budget -= 1;
            return Err(StoreError::ConnectionLost);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn reconnect(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn projects(&self) -> Result<Vec<Project>, StoreError> {
        self.gate()?;
        let inner = self.inner.lock();
        let mut projects: Vec<Project> = inner.projects.values().cloned().collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    async fn project(&self, name: &str) -> Result<Project, StoreError> {
        self.gate()?;
        self.inner
            .lock()
            .projects
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchProject(name.to_string()))
    }

    async fn update_project(&self, project: &Project) -> Result<(), StoreError> {
        self.gate()?;
        let mut inner = self.inner.lock();
        if !inner.projects.contains_key(&project.name) {
            return Err(StoreError::NoSuchProject(project.name.clone()));
        }
        inner.projects.insert(project.name.clone(), project.clone());
        Ok(())
    }

    async fn next_build_number(&self, project: &str) -> Result<u32, StoreError> {
        self.gate()?;
        let inner = self.inner.lock();
        let highest = inner
            .builds
            .values()
            .filter(|b| b.project_name == project)
            .map(|b| b.number)
            .max()
            .unwrap_or(0);
        Ok(highest + 1)
    }

    async fn insert_build(&self, build: &Build) -> Result<(), StoreError> {
        self.gate()?;
        self.inner.lock().builds.insert(build.id.clone(), build.clone());
        Ok(())
    }

    async fn build(&self, id: &BuildId) -> Result<Build, StoreError> {
        self.gate()?;
        self.inner
            .lock()
            .builds
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchBuild(id.clone()))
    }

    async fn update_build(&self, build: &Build) -> Result<(), StoreError> {
        self.gate()?;
        let mut inner = self.inner.lock();
        if !inner.builds.contains_key(&build.id) {
            return Err(StoreError::NoSuchBuild(build.id.clone()));
        }
        inner.builds.insert(build.id.clone(), build.clone());
        Ok(())
    }

    async fn last_build(
        &self,
        project: &str,
        before: Option<u32>,
    ) -> Result<Option<Build>, StoreError> {
        self.gate()?;
        let inner = self.inner.lock();
        Ok(inner
            .builds
            .values()
            .filter(|b| b.project_name == project)
            .filter(|b| before.map_or(true, |n| b.number < n))
            .max_by_key(|b| b.number)
            .cloned())
    }

    async fn insert_bucket(&self, bucket: &Bucket) -> Result<(), StoreError> {
        self.gate()?;
        self.inner.lock().buckets.insert(bucket.id.clone(), bucket.clone());
        Ok(())
    }

    async fn bucket(&self, id: &BucketId) -> Result<Bucket, StoreError> {
        self.gate()?;
        self.inner
            .lock()
            .buckets
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchBucket(id.clone()))
    }

    async fn update_bucket(&self, bucket: &Bucket) -> Result<(), StoreError> {
        self.gate()?;
        let mut inner = self.inner.lock();
        if !inner.buckets.contains_key(&bucket.id) {
            return Err(StoreError::NoSuchBucket(bucket.id.clone()));
        }
        inner.buckets.insert(bucket.id.clone(), bucket.clone());
        Ok(())
    }

    async fn buckets_of_build(&self, build: &BuildId) -> Result<Vec<Bucket>, StoreError> {
        self.gate()?;
        let inner = self.inner.lock();
        let mut buckets: Vec<Bucket> = inner
            .buckets
            .values()
            .filter(|b| &b.build_id == build)
            .cloned()
            .collect();
        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buckets)
    }

    async fn append_fragment(
        &self,
        bucket: &BucketId,
        content: &str,
    ) -> Result<LogFragment, StoreError> {
        self.gate()?;
        let mut inner = self.inner.lock();
        if !inner.buckets.contains_key(bucket) {
            return Err(StoreError::NoSuchBucket(bucket.clone()));
        }
        inner.fragment_seq += 1;
        let fragment = LogFragment {
            id: FragmentId::new(),
            bucket_id: bucket.clone(),
            seq: inner.fragment_seq,
            content: content.to_string(),
        };
        inner.fragments.entry(bucket.clone()).or_default().push(fragment.clone());
        Ok(fragment)
    }

    async fn fragments_of_bucket(
        &self,
        bucket: &BucketId,
    ) -> Result<Vec<LogFragment>, StoreError> {
        self.gate()?;
        let inner = self.inner.lock();
        let mut fragments = inner.fragments.get(bucket).cloned().unwrap_or_default();
        fragments.sort_by_key(|f| f.seq);
        Ok(fragments)
    }

    async fn delete_fragments(&self, bucket: &BucketId) -> Result<(), StoreError> {
        self.gate()?;
        self.inner.lock().fragments.remove(bucket);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
