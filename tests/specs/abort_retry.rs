// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abort-signalled children are retried exactly once.

use crate::prelude::*;
use dcc_core::BucketState;
use dcc_store::Store;

#[tokio::test]
async fn abort_then_success_goes_green_with_a_retry_marker() {
    let mut pool = Pool::new();
    let sentinel = pool.scratch().join("attempted");
    let task = format!(
        "if [ -e {0} ]; then echo recovered; else touch {0}; kill -6 $$; fi",
        sentinel.display()
    );
    pool.store.add_project(project("web", "c1", &[("units", &[task.as_str()])]));
    pool.spawn().await;

    let store = pool.store.clone();
    let done = wait_for(SPEC_WAIT, || async {
        matches!(
            store.last_build("web", None).await,
            Ok(Some(build)) if build.finished_at.is_some()
        )
    })
    .await;
    assert!(done);

    let build = store.last_build("web", None).await.unwrap().unwrap();
    let bucket = &store.buckets_of_build(&build.id).await.unwrap()[0];
    assert_eq!(bucket.state, BucketState::Success, "{}", bucket.log);
    assert_eq!(bucket.log.matches("running it once more").count(), 1);
    assert!(bucket.log.contains("recovered\n"));

    pool.stop_all().await;
}

#[tokio::test]
async fn abort_twice_is_a_plain_failure() {
    let mut pool = Pool::new();
    pool.store.add_project(project("web", "c1", &[("units", &["kill -6 $$"])]));
    pool.spawn().await;

    let store = pool.store.clone();
    let done = wait_for(SPEC_WAIT, || async {
        matches!(
            store.last_build("web", None).await,
            Ok(Some(build)) if build.finished_at.is_some()
        )
    })
    .await;
    assert!(done);

    let build = store.last_build("web", None).await.unwrap().unwrap();
    let bucket = &store.buckets_of_build(&build.id).await.unwrap()[0];
    // A second abort is an ordinary red build, not an infrastructure failure.
    assert_eq!(bucket.state, BucketState::Failed, "{}", bucket.log);
    assert_eq!(bucket.log.matches("running it once more").count(), 1);

    pool.stop_all().await;
}
