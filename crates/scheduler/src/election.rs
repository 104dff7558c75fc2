// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leader election strategies.
//!
//! Two implementations of [`Election`], selected at construction:
//! [`Nomination`] for the normal lease-based protocol and [`Tyrant`] for
//! bootstrapping a stuck group.

use async_trait::async_trait;
use dcc_adapters::CoordAdapter;
use dcc_core::{group_key, GroupName, WorkerUri};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Renewal pace of a tyrant.
pub const TYRANT_PACE: Duration = Duration::from_secs(60);

/// Role of a peer within its group after an election round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Leader,
    /// Not leading; carries the observed leader when the backend revealed one.
    Follower { leader_uri: Option<WorkerUri> },
}

impl Role {
    pub fn is_leader(&self) -> bool {
        matches!(self, Role::Leader)
    }
}

/// One election strategy: periodically called to (re)take leadership.
#[async_trait]
pub trait Election: Send + Sync + 'static {
    /// Attempt to take or keep the group lock. Coordination errors count
    /// as "not leader" for this round; no retries within a round.
    async fn elect(&self) -> Role;

    /// Interval between election rounds.
    fn pace(&self) -> Duration;
}

/// Lease-based nomination.
///
/// Each round re-acquires the group key with the normal TTL. Holding the key
/// means leading; the same call renews an existing hold, and losing the key
/// (lease lapsed, someone else took it) demotes to follower.
pub struct Nomination<K: CoordAdapter> {
    coord: K,
    key: String,
    self_uri: WorkerUri,
    ttl: Duration,
    tick: Duration,
}

impl<K: CoordAdapter> Nomination<K> {
    pub fn new(coord: K, group: &GroupName, self_uri: WorkerUri, ttl: Duration, tick: Duration) -> Self {
        Self { coord, key: group_key(group), self_uri, ttl, tick }
    }
}

#[async_trait]
impl<K: CoordAdapter> Election for Nomination<K> {
    async fn elect(&self) -> Role {
        match self.coord.acquire(&self.key, self.self_uri.as_str(), self.ttl).await {
            Ok(true) => Role::Leader,
            Ok(false) => {
                let leader_uri = match self.coord.read(&self.key).await {
                    Ok(holder) => holder.map(WorkerUri::new),
                    Err(e) => {
                        tracing::warn!(key = %self.key, error = %e, "leader lookup failed");
                        None
                    }
                };
                Role::Follower { leader_uri }
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "election round failed");
                Role::Follower { leader_uri: None }
            }
        }
    }

    fn pace(&self) -> Duration {
        self.tick
    }
}

/// Bootstrap takeover for a stuck group. Opt-in per peer.
///
/// Seizes the group key with no expiry on the first round, displacing any
/// prior holder, then renews every minute; a lost hold is seized right back.
pub struct Tyrant<K: CoordAdapter> {
    coord: K,
    key: String,
    self_uri: WorkerUri,
    seized: AtomicBool,
}

impl<K: CoordAdapter> Tyrant<K> {
    pub fn new(coord: K, group: &GroupName, self_uri: WorkerUri) -> Self {
        Self { coord, key: group_key(group), self_uri, seized: AtomicBool::new(false) }
    }

    async fn seize(&self) -> Role {
        match self.coord.seize(&self.key, self.self_uri.as_str(), Duration::ZERO).await {
            Ok(()) => {
                self.seized.store(true, Ordering::SeqCst);
                tracing::info!(key = %self.key, "seized group leadership");
                Role::Leader
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "tyrant seize failed");
                Role::Follower { leader_uri: None }
            }
        }
    }
}

#[async_trait]
impl<K: CoordAdapter> Election for Tyrant<K> {
    async fn elect(&self) -> Role {
        if !self.seized.load(Ordering::SeqCst) {
            return self.seize().await;
        }
        match self.coord.renew(&self.key, self.self_uri.as_str(), Duration::ZERO).await {
            Ok(true) => Role::Leader,
            // Someone replaced the binding; take it back.
            Ok(false) => self.seize().await,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "tyrant renew failed");
                Role::Follower { leader_uri: None }
            }
        }
    }

    fn pace(&self) -> Duration {
        TYRANT_PACE
    }
}

#[cfg(test)]
#[path = "election_tests.rs"]
mod tests;
