// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::TimingConfig;
use dcc_adapters::{FakeChat, FakeMail, MemoryCoord, MemoryDiscovery};
use dcc_core::{BucketId as CoreBucketId, BucketState, GroupName, SystemClock};
use dcc_store::{MemoryStore, Project};
use std::future::Future;
use std::path::Path;

fn test_config(state_dir: &Path) -> Config {
    Config {
        group: "spec".to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        state_dir: Some(state_dir.to_path_buf()),
        timing: TimingConfig {
            lease_ttl_ms: 60_000,
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

async fn wait_until<F, Fut>(max: Duration, mut probe: F) -> bool
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

async fn launch_peer(
    dir: &Path,
    store: &MemoryStore,
) -> (DaemonHandle, MemoryDiscovery) {
    let discovery = MemoryDiscovery::new();
    let handle = launch(
        test_config(dir),
        store.clone(),
        MemoryCoord::new(SystemClock),
        discovery.clone(),
        FakeMail::new(),
        FakeChat::new(),
        SystemClock,
    )
    .await
    .unwrap();
    (handle, discovery)
}

#[tokio::test]
async fn answers_ping_and_liveness_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let (handle, _) = launch_peer(dir.path(), &store).await;

    let peers = TcpPeers::with_timeout(Duration::from_secs(2));
    peers.ping(handle.uri()).await.unwrap();
    let active = peers.processing(handle.uri(), &CoreBucketId::from_string("bkt-none")).await.unwrap();
    assert!(!active, "an idle worker denies ownership");

    handle.stop().await;
}

#[tokio::test]
async fn single_peer_builds_a_project_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let mut project = Project::new("web", "", "main");
    project.current_commit = Some("c1".to_string());
    project.tasks.buckets_tasks.insert("units".to_string(), vec!["echo built".to_string()]);
    store.add_project(project);

    let (handle, _) = launch_peer(dir.path(), &store).await;

    let finished = wait_until(Duration::from_secs(15), || async {
        matches!(
            store.last_build("web", None).await,
            Ok(Some(build)) if build.finished_at.is_some()
        )
    })
    .await;
    assert!(finished, "the build should run to completion");

    let build = store.last_build("web", None).await.unwrap().unwrap();
    let buckets = store.buckets_of_build(&build.id).await.unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].state, BucketState::Success);
    assert!(buckets[0].log.contains("built\n"));
    assert_eq!(buckets[0].worker_uri.as_ref(), Some(handle.uri()));
    assert!(build.started_at.unwrap() <= buckets[0].started_at.unwrap());

    handle.stop().await;
}

#[tokio::test]
async fn second_daemon_in_the_same_state_dir_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let (handle, _) = launch_peer(dir.path(), &store).await;

    let result = launch(
        test_config(dir.path()),
        store.clone(),
        MemoryCoord::new(SystemClock),
        MemoryDiscovery::new(),
        FakeMail::new(),
        FakeChat::new(),
        SystemClock,
    )
    .await;
    assert!(matches!(result, Err(DaemonError::AlreadyLocked(_))));

    handle.stop().await;
}

#[tokio::test]
async fn discovery_tag_is_set_and_retired() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let (handle, discovery) = launch_peer(dir.path(), &store).await;
    let group = GroupName::new("spec");

    let workers = discovery.find_workers(&group).await.unwrap();
    assert_eq!(workers, vec![handle.uri().clone()]);

    handle.stop().await;
    let workers = discovery.find_workers(&group).await.unwrap();
    assert!(workers.is_empty(), "no residue after shutdown");
}
