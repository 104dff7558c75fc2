// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery of buckets whose worker died.

use crate::prelude::*;
use dcc_core::{BucketState, WorkerUri};
use dcc_store::{Build, Bucket, Store};

#[tokio::test]
async fn dead_workers_bucket_fails_and_siblings_continue() {
    let mut pool = Pool::new();
    pool.store
        .add_project(project("web", "c1", &[("doomed", &["true"]), ("fine", &["echo fine"])]));

    // State left behind by a previous leader: one bucket claimed by a worker
    // that no longer exists, one still queued.
    let build = Build::new("web", 1, "c1", WorkerUri::new("old-leader:1"));
    pool.store.insert_build(&build).await.unwrap();
    let mut doomed = Bucket::new(build.id.clone(), "doomed");
    doomed.state = BucketState::Claimed;
    doomed.worker_uri = Some(WorkerUri::new("127.0.0.1:9"));
    pool.store.insert_bucket(&doomed).await.unwrap();
    let queued = Bucket::new(build.id.clone(), "fine");
    pool.store.insert_bucket(&queued).await.unwrap();
    // The project considers c1 consumed; only the stale build is in play.
    let mut p = pool.store.project("web").await.unwrap();
    p.update_state();
    pool.store.update_project(&p).await.unwrap();

    pool.spawn().await;

    let store = pool.store.clone();
    let settled = wait_for(SPEC_WAIT, || async {
        matches!(
            store.bucket(&doomed.id).await,
            Ok(bucket) if bucket.state.is_terminal()
        )
    })
    .await;
    assert!(settled, "the orphaned bucket should be settled by the new leader");

    let failed = store.bucket(&doomed.id).await.unwrap();
    assert_eq!(failed.state, BucketState::ProcessingFailed);
    assert!(failed.log.contains("------ Processing failed ------"));
    assert!(failed.log.contains("unreachable"), "cause recorded: {}", failed.log);
    assert!(failed.finished_at.is_some());

    // The sibling queued bucket is adopted and completed independently.
    let sibling_done = wait_for(SPEC_WAIT, || async {
        matches!(
            store.bucket(&queued.id).await,
            Ok(bucket) if bucket.state == BucketState::Success
        )
    })
    .await;
    assert!(sibling_done, "queued sibling should be re-enqueued and built");

    // With every bucket terminal, the build closes.
    let closed = wait_for(SPEC_WAIT, || async {
        matches!(
            store.build(&build.id).await,
            Ok(build) if build.finished_at.is_some()
        )
    })
    .await;
    assert!(closed);

    pool.stop_all().await;
}

#[tokio::test]
async fn killing_the_processing_peer_fails_its_bucket_on_the_next_scan() {
    let mut pool = Pool::new();
    // Two peers: whichever is elected leader survives; the task is slow
    // enough that we can observe the claim and then kill the owner.
    pool.store.add_project(project("web", "c1", &[("slow", &["sleep 30"])]));
    pool.spawn().await;
    pool.spawn().await;

    let store = pool.store.clone();
    let claimed = wait_for(SPEC_WAIT, || async {
        match store.last_build("web", None).await {
            Ok(Some(build)) => match store.buckets_of_build(&build.id).await {
                Ok(buckets) => buckets
                    .first()
                    .map_or(false, |b| b.state == BucketState::Claimed && b.worker_uri.is_some()),
                Err(_) => false,
            },
            _ => false,
        }
    })
    .await;
    assert!(claimed, "some peer should claim the slow bucket");

    let build = store.last_build("web", None).await.unwrap().unwrap();
    let bucket = store.buckets_of_build(&build.id).await.unwrap().remove(0);
    let owner = bucket.worker_uri.clone().unwrap();
    let owner_index = pool
        .peers
        .iter()
        .position(|peer| peer.uri() == &owner)
        .expect("the owner is one of our peers");
    pool.kill_peer(owner_index).await;

    // The surviving peer (possibly after taking over leadership) probes the
    // dead worker and fails the bucket.
    let settled = wait_for(SPEC_WAIT, || async {
        matches!(
            store.bucket(&bucket.id).await,
            Ok(bucket) if bucket.state == BucketState::ProcessingFailed
        )
    })
    .await;
    assert!(settled, "the dead worker's bucket should fail processing");

    let failed = store.bucket(&bucket.id).await.unwrap();
    assert!(failed.log.contains("------ Processing failed ------"));

    pool.stop_all().await;
}
