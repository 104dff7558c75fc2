// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness: a pool of in-process peers over real TCP.

use dcc_adapters::{FakeChat, FakeMail, MemoryCoord, MemoryDiscovery};
use dcc_core::SystemClock;
use dcc_store::{MemoryStore, Project};
use dcc_worker::{launch, Config, DaemonHandle, TimingConfig};
use std::future::Future;
use std::time::Duration;

/// Upper bound for any single spec wait.
pub const SPEC_WAIT: Duration = Duration::from_secs(20);

/// A group of peers sharing one store, lock backend, and notification fakes.
pub struct Pool {
    pub store: MemoryStore,
    pub coord: MemoryCoord<SystemClock>,
    pub discovery: MemoryDiscovery,
    pub mail: FakeMail,
    pub chat: FakeChat,
    pub peers: Vec<DaemonHandle>,
    dir: tempfile::TempDir,
    next_index: usize,
}

impl Pool {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            coord: MemoryCoord::new(SystemClock),
            discovery: MemoryDiscovery::new(),
            mail: FakeMail::new(),
            chat: FakeChat::new(),
            peers: Vec::new(),
            dir: tempfile::tempdir().expect("tempdir"),
            next_index: 0,
        }
    }

    fn peer_config(&mut self) -> Config {
        let index = self.next_index;
        self.next_index += 1;
        Config {
            group: "spec".to_string(),
            listen_addr: "127.0.0.1:0".to_string(),
            state_dir: Some(self.dir.path().join(format!("peer-{index}"))),
            timing: TimingConfig {
                lease_ttl_ms: 2_000,
                tick_ms: 50,
                back_off_ms: 1_000,
                log_polling_interval_ms: 20,
                assignment_jitter_ms: 0,
                bucket_timeout_ms: 30_000,
                reconnect_delay_ms: 0,
            },
            ..Config::default()
        }
    }

    /// Start one more peer.
    pub async fn spawn(&mut self) {
        self.spawn_with(|_| {}).await;
    }

    pub async fn spawn_with(&mut self, tweak: impl FnOnce(&mut Config)) {
        let mut config = self.peer_config();
        tweak(&mut config);
        let handle = launch(
            config,
            self.store.clone(),
            self.coord.clone(),
            self.discovery.clone(),
            self.mail.clone(),
            self.chat.clone(),
            SystemClock,
        )
        .await
        .expect("peer launch");
        self.peers.push(handle);
    }

    /// Stop one peer (simulating a dying worker).
    pub async fn kill_peer(&mut self, index: usize) {
        let handle = self.peers.remove(index);
        handle.stop().await;
    }

    pub async fn stop_all(mut self) {
        for handle in self.peers.drain(..) {
            handle.stop().await;
        }
    }

    /// Working directory of the shared tempdir, for witness files.
    pub fn scratch(&self) -> std::path::PathBuf {
        self.dir.path().to_path_buf()
    }
}

/// Poll `probe` until it holds or `max` elapses.
pub async fn wait_for<F, Fut>(max: Duration, mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + max;
    loop {
        if probe().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// A local project (no source URL) with the given bucket task lists.
pub fn project(name: &str, commit: &str, buckets: &[(&str, &[&str])]) -> Project {
    let mut project = Project::new(name, "", "main");
    project.current_commit = Some(commit.to_string());
    for (bucket, tasks) in buckets {
        project
            .tasks
            .buckets_tasks
            .insert(bucket.to_string(), tasks.iter().map(|t| t.to_string()).collect());
    }
    project
}
