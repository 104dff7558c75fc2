// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tyrant bootstrap of a stuck group.

use crate::prelude::*;
use dcc_adapters::CoordAdapter;
use dcc_core::BucketState;
use dcc_store::Store;
use std::time::Duration;

#[tokio::test]
async fn tyrant_takes_a_stuck_group_and_work_flows_again() {
    let mut pool = Pool::new();
    // A holder that never expires and never answers: the group is stuck.
    pool.coord.seize("spec:leader", "ghost:1", Duration::ZERO).await.unwrap();
    pool.store.add_project(project("web", "c1", &[("units", &["echo unstuck"])]));

    // A normal peer cannot win the election, so no build appears.
    pool.spawn().await;
    let store = pool.store.clone();
    let built_too_early = wait_for(Duration::from_secs(2), || async {
        matches!(store.last_build("web", None).await, Ok(Some(_)))
    })
    .await;
    assert!(!built_too_early, "a nominated peer must not displace the holder");
    assert_eq!(
        pool.coord.read("spec:leader").await.unwrap().as_deref(),
        Some("ghost:1")
    );

    // The tyrant displaces the holder immediately.
    pool.spawn_with(|config| config.tyrant = true).await;
    let tyrant_uri = pool.peers[1].uri().clone();

    let done = wait_for(SPEC_WAIT, || async {
        matches!(
            store.last_build("web", None).await,
            Ok(Some(build)) if build.finished_at.is_some()
        )
    })
    .await;
    assert!(done, "the tyrant should lead and the build should run");

    assert_eq!(
        pool.coord.read("spec:leader").await.unwrap(),
        Some(tyrant_uri.as_str().to_string())
    );
    let build = store.last_build("web", None).await.unwrap().unwrap();
    assert_eq!(build.leader_uri, tyrant_uri);
    let bucket = &store.buckets_of_build(&build.id).await.unwrap()[0];
    assert_eq!(bucket.state, BucketState::Success, "{}", bucket.log);

    pool.stop_all().await;
}
