// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The leader's in-memory bucket queue.

use dcc_core::{BucketId, WorkerUri};
use std::collections::{HashMap, HashSet, VecDeque};

/// Per-project FIFO of unassigned bucket IDs, owned by the leader.
///
/// Deliberately ephemeral: the store is the only source of truth across
/// leadership changes. Selection is round-robin across projects, biased so
/// that the requestor who was just served yields to others when another
/// project has work. A popped ID is never handed out twice.
#[derive(Default)]
pub struct BucketQueue {
    queues: HashMap<String, VecDeque<BucketId>>,
    /// Project rotation order; served projects move to the back.
    ring: VecDeque<String>,
    /// Per project, requestors in service order (most recent at the back).
    recent: HashMap<String, VecDeque<WorkerUri>>,
    handed_out: HashSet<BucketId>,
}

impl BucketQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a project's pending buckets.
    pub fn set_buckets(&mut self, project: &str, ids: Vec<BucketId>) {
        let ids: VecDeque<BucketId> =
            ids.into_iter().filter(|id| !self.handed_out.contains(id)).collect();
        if !self.ring.iter().any(|p| p == project) {
            self.ring.push_back(project.to_string());
        }
        self.queues.insert(project.to_string(), ids);
    }

    pub fn is_empty(&self, project: &str) -> bool {
        self.queues.get(project).map_or(true, VecDeque::is_empty)
    }

    /// Total pending buckets across all projects.
    pub fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Drop everything (used when losing leadership).
    pub fn clear(&mut self) {
        self.queues.clear();
        self.ring.clear();
        self.recent.clear();
        self.handed_out.clear();
    }

    /// Pop the next bucket for `requestor`, or None when nothing is pending.
    pub fn next_bucket(&mut self, requestor: &WorkerUri) -> Option<BucketId> {
        let project = self.pick_project(requestor)?;

        let id = self.queues.get_mut(&project).and_then(VecDeque::pop_front)?;
        self.handed_out.insert(id.clone());

        // Requestor goes to the back of the project's fairness list.
        let recent = self.recent.entry(project.clone()).or_default();
        recent.retain(|uri| uri != requestor);
        recent.push_back(requestor.clone());

        // Served project goes to the back of the ring.
        self.ring.retain(|p| p != &project);
        self.ring.push_back(project);

        Some(id)
    }

    /// First project in ring order with pending work, preferring one that
    /// did not just serve this requestor.
    fn pick_project(&self, requestor: &WorkerUri) -> Option<String> {
        let pending: Vec<&String> =
            self.ring.iter().filter(|p| !self.is_empty(p)).collect();
        let fresh = pending.iter().find(|p| {
            self.recent
                .get(p.as_str())
                .and_then(VecDeque::back)
                .map_or(true, |last| last != requestor)
        });
        fresh.or(pending.first()).map(|p| p.to_string())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
