// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer discovery through shared metadata tags.

use async_trait::async_trait;
use dcc_core::{discovery_tag, GroupName, WorkerUri};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors from discovery operations
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("tag store unreachable: {0}")]
    Unreachable(String),
}

/// Tag store through which peers announce themselves.
///
/// A peer publishes `dcc:{group}:uri = self-uri` at startup and clears the
/// tag at shutdown; `find_workers` enumerates the group's live peers.
#[async_trait]
pub trait DiscoveryAdapter: Clone + Send + Sync + 'static {
    async fn announce(&self, group: &GroupName, uri: &WorkerUri) -> Result<(), DiscoveryError>;
    /// Clear a previously announced tag. Exact-value match; clearing an
    /// unknown tag is a no-op.
    async fn retire(&self, group: &GroupName, uri: &WorkerUri) -> Result<(), DiscoveryError>;
    async fn find_workers(&self, group: &GroupName) -> Result<Vec<WorkerUri>, DiscoveryError>;
}

/// In-process tag store for single-host pools and tests. Cloud metadata
/// stores implement [`DiscoveryAdapter`] externally.
#[derive(Clone, Default)]
pub struct MemoryDiscovery {
    tags: Arc<Mutex<HashMap<String, Vec<WorkerUri>>>>,
}

impl MemoryDiscovery {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DiscoveryAdapter for MemoryDiscovery {
    async fn announce(&self, group: &GroupName, uri: &WorkerUri) -> Result<(), DiscoveryError> {
        let mut tags = self.tags.lock();
        let entries = tags.entry(discovery_tag(group)).or_default();
        if !entries.contains(uri) {
            entries.push(uri.clone());
        }
        Ok(())
    }

    async fn retire(&self, group: &GroupName, uri: &WorkerUri) -> Result<(), DiscoveryError> {
        let mut tags = self.tags.lock();
        if let Some(entries) = tags.get_mut(&discovery_tag(group)) {
            entries.retain(|u| u != uri);
            if entries.is_empty() {
                tags.remove(&discovery_tag(group));
            }
        }
        Ok(())
    }

    async fn find_workers(&self, group: &GroupName) -> Result<Vec<WorkerUri>, DiscoveryError> {
        Ok(self.tags.lock().get(&discovery_tag(group)).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
