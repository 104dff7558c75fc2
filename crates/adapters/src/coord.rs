// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic leader lock with lease TTL.

use async_trait::async_trait;
use dcc_core::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from coordination operations
#[derive(Debug, Error)]
pub enum CoordError {
    #[error("coordination backend unreachable: {0}")]
    Unreachable(String),
}

/// Distributed compare-and-set lock with lease expiry.
///
/// All operations are atomic with respect to other callers. A zero `ttl`
/// means the entry never expires.
#[async_trait]
pub trait CoordAdapter: Clone + Send + Sync + 'static {
    /// Bind `key` to `holder` for `ttl`. Succeeds only if `key` is unbound
    /// (or expired) or already held by `holder`.
    async fn acquire(&self, key: &str, holder: &str, ttl: Duration) -> Result<bool, CoordError>;

    /// Extend the lease. Succeeds only while `holder` still holds `key`.
    async fn renew(&self, key: &str, holder: &str, ttl: Duration) -> Result<bool, CoordError>;

    /// Current live holder of `key`, if any.
    async fn read(&self, key: &str) -> Result<Option<String>, CoordError>;

    /// Bind `key` to `holder` unconditionally, displacing any holder.
    /// Reserved for tyrant bootstrap; nomination never calls this.
    async fn seize(&self, key: &str, holder: &str, ttl: Duration) -> Result<(), CoordError>;
}

struct Lease {
    holder: String,
    /// Epoch ms past which the lease is void; `None` never expires.
    expires_at: Option<u64>,
}

/// In-process coordination backend.
///
/// Serves single-host pools and every test. Multi-host groups swap in a
/// cache-backed implementation of [`CoordAdapter`] with the same contract.
#[derive(Clone)]
pub struct MemoryCoord<C: Clock> {
    leases: Arc<Mutex<HashMap<String, Lease>>>,
    clock: C,
}

impl<C: Clock> MemoryCoord<C> {
    pub fn new(clock: C) -> Self {
        Self { leases: Arc::new(Mutex::new(HashMap::new())), clock }
    }

    fn expiry(&self, ttl: Duration) -> Option<u64> {
        if ttl.is_zero() {
            None
        } else {
            Some(self.clock.epoch_ms() + ttl.as_millis() as u64)
        }
    }

    fn live_holder<'a>(&self, lease: &'a Lease) -> Option<&'a str> {
        match lease.expires_at {
            Some(at) if at <= self.clock.epoch_ms() => None,
            _ => Some(&lease.holder),
        }
    }
}

#[async_trait]
impl<C: Clock> CoordAdapter for MemoryCoord<C> {
    async fn acquire(&self, key: &str, holder: &str, ttl: Duration) -> Result<bool, CoordError> {
        let mut leases = self.leases.lock();
        let taken_by_other = leases
            .get(key)
            .and_then(|l| self.live_holder(l))
            .map_or(false, |h| h != holder);
        if taken_by_other {
            return Ok(false);
        }
        leases.insert(
            key.to_string(),
            Lease { holder: holder.to_string(), expires_at: self.expiry(ttl) },
        );
        Ok(true)
    }

    async fn renew(&self, key: &str, holder: &str, ttl: Duration) -> Result<bool, CoordError> {
        let mut leases = self.leases.lock();
        let held = leases
            .get(key)
            .and_then(|l| self.live_holder(l))
            .map_or(false, |h| h == holder);
        if !held {
            return Ok(false);
        }
        let expires_at = self.expiry(ttl);
        if let Some(lease) = leases.get_mut(key) {
            lease.expires_at = expires_at;
        }
        Ok(true)
    }

    async fn read(&self, key: &str) -> Result<Option<String>, CoordError> {
        let leases = self.leases.lock();
        Ok(leases.get(key).and_then(|l| self.live_holder(l)).map(str::to_string))
    }

    async fn seize(&self, key: &str, holder: &str, ttl: Duration) -> Result<(), CoordError> {
        self.leases.lock().insert(
            key.to_string(),
            Lease { holder: holder.to_string(), expires_at: self.expiry(ttl) },
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "coord_tests.rs"]
mod tests;
