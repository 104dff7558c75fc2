// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repair notifications when a broken bucket goes green again.

use crate::prelude::*;
use dcc_adapters::ChatColor;
use dcc_core::{BucketState, WorkerUri};
use dcc_store::{Build, Bucket, Store};

#[tokio::test]
async fn repaired_bucket_notifies_mail_and_green_chat() {
    let mut pool = Pool::new();
    pool.store.add_project(project("web", "c5", &[("X", &["echo green again"])]));

    // Build 4's bucket X failed before this pool came up.
    let prior = Build::new("web", 4, "c4", WorkerUri::new("old-leader:1"));
    pool.store.insert_build(&prior).await.unwrap();
    let mut failed = Bucket::new(prior.id.clone(), "X");
    failed.state = BucketState::Failed;
    pool.store.insert_bucket(&failed).await.unwrap();

    pool.spawn_with(|config| {
        config.mail.recipients = vec!["dev@example.org".to_string()];
        config.ui.base_url = "http://ci.example.org".to_string();
    })
    .await;

    let store = pool.store.clone();
    let done = wait_for(SPEC_WAIT, || async {
        matches!(
            store.last_build("web", None).await,
            Ok(Some(build)) if build.number == 5 && build.finished_at.is_some()
        )
    })
    .await;
    assert!(done, "build 5 should finish");

    let deliveries = pool.mail.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].subject.contains("repaired"));
    assert_eq!(deliveries[0].to, vec!["dev@example.org"]);

    let notifications = pool.chat.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].color, ChatColor::Green);
    assert!(notifications[0].notify);
    assert_eq!(notifications[0].message, "[web] X repaired - http://ci.example.org/web");

    pool.stop_all().await;
}

#[tokio::test]
async fn a_failing_bucket_notifies_mail_and_red_chat() {
    let mut pool = Pool::new();
    pool.store.add_project(project("web", "c1", &[("units", &["echo red; exit 1"])]));
    pool.spawn_with(|config| {
        config.mail.recipients = vec!["dev@example.org".to_string()];
    })
    .await;

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
    let buckets = store.buckets_of_build(&build.id).await.unwrap();
    assert_eq!(buckets[0].state, BucketState::Failed);

    let deliveries = pool.mail.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].subject.contains("failed"));
    assert!(deliveries[0].body.contains("red\n"), "mail carries the log snapshot");
    assert_eq!(pool.chat.notifications()[0].color, ChatColor::Red);

    pool.stop_all().await;
}
