// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fresh project through a full build, across two peers.

use crate::prelude::*;
use dcc_core::BucketState;
use dcc_store::Store;

#[tokio::test]
async fn fresh_project_with_two_buckets_builds_green() {
    let mut pool = Pool::new();
    let witness = pool.scratch().join("before_all.count");
    let mut p = project("web", "c1", &[("a", &["echo built-a"]), ("b", &["echo built-b"])]);
    p.tasks.before_all_code = Some(format!("echo ran >> {}", witness.display()));
    pool.store.add_project(p);

    pool.spawn().await;
    pool.spawn().await;

    let store = pool.store.clone();
    let done = wait_for(SPEC_WAIT, || async {
        matches!(
            store.last_build("web", None).await,
            Ok(Some(build)) if build.finished_at.is_some()
        )
    })
    .await;
    assert!(done, "build should finish");

    let build = store.last_build("web", None).await.unwrap().unwrap();
    assert_eq!(build.number, 1);
    assert_eq!(build.commit, "c1");
    let buckets = store.buckets_of_build(&build.id).await.unwrap();
    assert_eq!(buckets.len(), 2);
    for bucket in &buckets {
        assert_eq!(bucket.state, BucketState::Success, "bucket {}: {}", bucket.name, bucket.log);
        assert!(bucket.log.contains(&format!("built-{}\n", bucket.name)));
        assert!(bucket.worker_uri.is_some());
        assert!(build.started_at.unwrap() <= bucket.started_at.unwrap());
    }

    // The hook ran once per build on each worker that processed a bucket,
    // never once per bucket.
    let hook_runs = std::fs::read_to_string(&witness).unwrap().lines().count();
    assert!(
        (1..=pool.peers.len()).contains(&hook_runs),
        "hook ran {hook_runs} times"
    );

    // First build ever: nothing to announce.
    assert!(pool.mail.deliveries().is_empty());
    assert!(pool.chat.notifications().is_empty());

    pool.stop_all().await;
}

#[tokio::test]
async fn store_disconnects_during_the_build_stay_invisible() {
    let mut pool = Pool::new();
    pool.store.add_project(project("web", "c1", &[("units", &["echo fine"])]));
    pool.spawn().await;

    let store = pool.store.clone();
    // Let the scan create the build, then hiccup the store while the
    // assignment and executor paths are active.
    let created = wait_for(SPEC_WAIT, || async {
        matches!(store.last_build("web", None).await, Ok(Some(_)))
    })
    .await;
    assert!(created);
    pool.store.fail_next(2);

    let done = wait_for(SPEC_WAIT, || async {
        matches!(
            store.last_build("web", None).await,
            Ok(Some(build)) if build.finished_at.is_some()
        )
    })
    .await;
    assert!(done, "reconnect layers hide the outage");

    let build = store.last_build("web", None).await.unwrap().unwrap();
    let buckets = store.buckets_of_build(&build.id).await.unwrap();
    assert_eq!(buckets[0].state, BucketState::Success, "{}", buckets[0].log);

    pool.stop_all().await;
}

#[tokio::test]
async fn a_second_commit_gets_a_second_build() {
    let mut pool = Pool::new();
    pool.store.add_project(project("web", "c1", &[("units", &["true"])]));
    pool.spawn().await;

    let store = pool.store.clone();
    let first = wait_for(SPEC_WAIT, || async {
        matches!(
            store.last_build("web", None).await,
            Ok(Some(build)) if build.number == 1 && build.finished_at.is_some()
        )
    })
    .await;
    assert!(first);

    let mut p = store.project("web").await.unwrap();
    p.current_commit = Some("c2".to_string());
    store.update_project(&p).await.unwrap();

    let second = wait_for(SPEC_WAIT, || async {
        matches!(
            store.last_build("web", None).await,
            Ok(Some(build)) if build.number == 2 && build.finished_at.is_some()
        )
    })
    .await;
    assert!(second, "the new commit gets its own build");

    pool.stop_all().await;
}
