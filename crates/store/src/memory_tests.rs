// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::close_build_if_done;
use dcc_core::{BucketState, WorkerUri};

async fn build(store: &MemoryStore, project: &str, number: u32) -> Build {
    let build = Build::new(project, number, format!("c{number}"), WorkerUri::new("l:1"));
    store.insert_build(&build).await.unwrap();
    build
}

#[tokio::test]
async fn project_lookup_round_trips() {
    let store = MemoryStore::new();
    store.add_project(Project::new("web", "git://example/web.git", "main"));
    let project = store.project("web").await.unwrap();
    assert_eq!(project.url, "git://example/web.git");
    assert!(matches!(
        store.project("missing").await,
        Err(StoreError::NoSuchProject(_))
    ));
}

#[tokio::test]
async fn next_build_number_is_monotonic_per_project() {
    let store = MemoryStore::new();
    assert_eq!(store.next_build_number("web").await.unwrap(), 1);
    build(&store, "web", 1).await;
    build(&store, "web", 2).await;
    build(&store, "other", 7).await;
    assert_eq!(store.next_build_number("web").await.unwrap(), 3);
    assert_eq!(store.next_build_number("other").await.unwrap(), 8);
}

#[tokio::test]
async fn last_build_respects_the_before_bound() {
    let store = MemoryStore::new();
    build(&store, "web", 1).await;
    let second = build(&store, "web", 2).await;
    let third = build(&store, "web", 3).await;

    let latest = store.last_build("web", None).await.unwrap().unwrap();
    assert_eq!(latest.id, third.id);
    let prior = store.last_build("web", Some(3)).await.unwrap().unwrap();
    assert_eq!(prior.id, second.id);
    assert!(store.last_build("web", Some(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn buckets_of_build_only_returns_that_build() {
    let store = MemoryStore::new();
    let b1 = build(&store, "web", 1).await;
    let b2 = build(&store, "web", 2).await;
    let bucket = Bucket::new(b1.id.clone(), "units");
    store.insert_bucket(&bucket).await.unwrap();
    store.insert_bucket(&Bucket::new(b2.id.clone(), "units")).await.unwrap();

    let found = store.buckets_of_build(&b1.id).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, bucket.id);
}

#[tokio::test]
async fn update_bucket_requires_existence() {
    let store = MemoryStore::new();
    let bucket = Bucket::new(dcc_core::BuildId::new(), "units");
    assert!(matches!(
        store.update_bucket(&bucket).await,
        Err(StoreError::NoSuchBucket(_))
    ));
    store.insert_bucket(&bucket).await.unwrap();
    let mut claimed = bucket.clone();
    claimed.state = BucketState::Claimed;
    store.update_bucket(&claimed).await.unwrap();
    assert_eq!(store.bucket(&bucket.id).await.unwrap().state, BucketState::Claimed);
}

#[tokio::test]
async fn fragments_keep_creation_order() {
    let store = MemoryStore::new();
    let b = build(&store, "web", 1).await;
    let bucket = Bucket::new(b.id.clone(), "units");
    store.insert_bucket(&bucket).await.unwrap();

    store.append_fragment(&bucket.id, "first\n").await.unwrap();
    store.append_fragment(&bucket.id, "second\n").await.unwrap();
    store.append_fragment(&bucket.id, "third\n").await.unwrap();

    let fragments = store.fragments_of_bucket(&bucket.id).await.unwrap();
    let joined: String = fragments.iter().map(|f| f.content.as_str()).collect();
    assert_eq!(joined, "first\nsecond\nthird\n");

    store.delete_fragments(&bucket.id).await.unwrap();
    assert!(store.fragments_of_bucket(&bucket.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn close_build_if_done_waits_for_every_bucket() {
    let store = MemoryStore::new();
    let b = build(&store, "web", 1).await;
    let mut first = Bucket::new(b.id.clone(), "a");
    let second = Bucket::new(b.id.clone(), "b");
    store.insert_bucket(&first).await.unwrap();
    store.insert_bucket(&second).await.unwrap();

    assert!(!close_build_if_done(&store, &b.id, 1_000).await.unwrap());
    assert!(store.build(&b.id).await.unwrap().finished_at.is_none());

    first.state = BucketState::Success;
    store.update_bucket(&first).await.unwrap();
    assert!(!close_build_if_done(&store, &b.id, 2_000).await.unwrap());

    let mut settled = second.clone();
    settled.state = BucketState::ProcessingFailed;
    store.update_bucket(&settled).await.unwrap();
    assert!(close_build_if_done(&store, &b.id, 3_000).await.unwrap());
    assert_eq!(store.build(&b.id).await.unwrap().finished_at, Some(3_000));

    // Closing again is a no-op.
    assert!(!close_build_if_done(&store, &b.id, 4_000).await.unwrap());
    assert_eq!(store.build(&b.id).await.unwrap().finished_at, Some(3_000));
}

#[tokio::test]
async fn close_build_if_done_ignores_bucketless_builds() {
    let store = MemoryStore::new();
    let b = build(&store, "web", 1).await;
    assert!(!close_build_if_done(&store, &b.id, 1_000).await.unwrap());
}

#[tokio::test]
async fn fail_next_injects_disconnects_then_heals() {
    let store = MemoryStore::new();
    store.add_project(Project::new("web", "", "main"));
    store.fail_next(2);
    assert!(matches!(store.project("web").await, Err(StoreError::ConnectionLost)));
    assert!(matches!(store.projects().await, Err(StoreError::ConnectionLost)));
    assert!(store.project("web").await.is_ok());
}
