// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dcc-adapters: seams to the outside world.
//!
//! Coordination lock, discovery tags, peer RPC, mail, chat, and bounded
//! subprocess execution. Every adapter is a trait with a bundled
//! implementation and a recording fake behind the `test-support` feature.

pub mod chat;
pub mod coord;
pub mod discovery;
pub mod mail;
pub mod peers;
pub mod subprocess;

pub use chat::{
    ChatAdapter, ChatColor, ChatError, ChatNotification, ChatRouter, HttpChatAdapter, NoopChat,
};
pub use coord::{CoordAdapter, CoordError, MemoryCoord};
pub use discovery::{DiscoveryAdapter, DiscoveryError, MemoryDiscovery};
pub use mail::{MailAdapter, MailError, MailMessage, SendmailAdapter};
pub use peers::{PeerError, PeerRpc};
pub use subprocess::{run_with_timeout, SubprocessError, GIT_SYNC_TIMEOUT, SENDMAIL_TIMEOUT};

#[cfg(any(test, feature = "test-support"))]
pub use chat::FakeChat;
#[cfg(any(test, feature = "test-support"))]
pub use mail::FakeMail;
#[cfg(any(test, feature = "test-support"))]
pub use peers::{FakePeers, ProcessingAnswer};
