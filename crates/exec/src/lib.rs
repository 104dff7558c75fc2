// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dcc-exec: per-bucket build execution on a follower.
//!
//! Runs a bucket's task lists as isolated child processes with streamed
//! log capture, abort retry, a wall-clock timeout, and classified failure
//! reporting.

mod envelope;
mod environment;
mod error;
mod executor;
mod git;
mod logtail;
mod notify;
mod task;

pub use envelope::{Envelope, ErrorContext};
pub use environment::{scrubbed_env, strip_runtime_shims};
pub use error::ExecError;
pub use executor::{BuildExecutor, ExecConfig};
pub use logtail::{latin1_to_utf8, LogTail};
pub use notify::{chat_line, dcc_message, failure_message, fixed_message, Notifier, NotifyConfig};
pub use task::{TaskRunner, TaskSpec, TaskStatus};
