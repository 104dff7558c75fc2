// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dcc_adapters::MemoryCoord;
use dcc_core::FakeClock;

const TTL: Duration = Duration::from_secs(120);
const TICK: Duration = Duration::from_secs(20);

fn group() -> GroupName {
    GroupName::new("rails-ci")
}

fn nomination(
    coord: &MemoryCoord<FakeClock>,
    uri: &str,
) -> Nomination<MemoryCoord<FakeClock>> {
    Nomination::new(coord.clone(), &group(), WorkerUri::new(uri), TTL, TICK)
}

#[tokio::test]
async fn first_peer_becomes_leader() {
    let coord = MemoryCoord::new(FakeClock::new());
    let n = nomination(&coord, "a:1");
    assert_eq!(n.elect().await, Role::Leader);
    assert_eq!(n.pace(), TICK);
}

#[tokio::test]
async fn second_peer_follows_and_learns_the_leader() {
    let coord = MemoryCoord::new(FakeClock::new());
    let a = nomination(&coord, "a:1");
    let b = nomination(&coord, "b:1");
    assert_eq!(a.elect().await, Role::Leader);
    assert_eq!(
        b.elect().await,
        Role::Follower { leader_uri: Some(WorkerUri::new("a:1")) }
    );
}

#[tokio::test]
async fn re_election_renews_the_lease() {
    let clock = FakeClock::new();
    let coord = MemoryCoord::new(clock.clone());
    let a = nomination(&coord, "a:1");
    let b = nomination(&coord, "b:1");
    assert_eq!(a.elect().await, Role::Leader);
    clock.advance(TTL / 2);
    assert_eq!(a.elect().await, Role::Leader);
    clock.advance(TTL / 2 + Duration::from_secs(1));
    // a renewed half way through, so its lease is still live.
    assert!(matches!(b.elect().await, Role::Follower { .. }));
}

#[tokio::test]
async fn lapsed_lease_lets_another_peer_take_over() {
    let clock = FakeClock::new();
    let coord = MemoryCoord::new(clock.clone());
    let a = nomination(&coord, "a:1");
    let b = nomination(&coord, "b:1");
    assert_eq!(a.elect().await, Role::Leader);
    clock.advance(TTL + Duration::from_secs(1));
    assert_eq!(b.elect().await, Role::Leader);
    // The old leader now observes the takeover.
    assert_eq!(
        a.elect().await,
        Role::Follower { leader_uri: Some(WorkerUri::new("b:1")) }
    );
}

#[tokio::test]
async fn tyrant_displaces_a_live_holder_immediately() {
    let coord = MemoryCoord::new(FakeClock::new());
    let a = nomination(&coord, "a:1");
    assert_eq!(a.elect().await, Role::Leader);

    let t = Tyrant::new(coord.clone(), &group(), WorkerUri::new("t:1"));
    assert_eq!(t.elect().await, Role::Leader);
    assert_eq!(t.pace(), TYRANT_PACE);
    assert!(matches!(a.elect().await, Role::Follower { .. }));
}

#[tokio::test]
async fn tyrant_lease_survives_any_amount_of_time() {
    let clock = FakeClock::new();
    let coord = MemoryCoord::new(clock.clone());
    let t = Tyrant::new(coord.clone(), &group(), WorkerUri::new("t:1"));
    assert_eq!(t.elect().await, Role::Leader);
    clock.advance(Duration::from_secs(7 * 86_400));
    assert_eq!(t.elect().await, Role::Leader);
}

#[tokio::test]
async fn tyrant_takes_back_a_stolen_key() {
    let coord = MemoryCoord::new(FakeClock::new());
    let t = Tyrant::new(coord.clone(), &group(), WorkerUri::new("t:1"));
    assert_eq!(t.elect().await, Role::Leader);
    // Another tyrant-style write displaces ours.
    use dcc_adapters::CoordAdapter;
    coord.seize("rails-ci:leader", "x:1", Duration::ZERO).await.unwrap();
    assert_eq!(t.elect().await, Role::Leader);
    assert_eq!(
        coord.read("rails-ci:leader").await.unwrap().as_deref(),
        Some("t:1")
    );
}
