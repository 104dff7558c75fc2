// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use dcc_core::BucketId;
use serde::{Deserialize, Serialize};

/// Response to a [`crate::Request`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Ping acknowledged
    Pong,

    /// Assignment answer: a bucket to run, or how long to back off
    Assignment {
        bucket_id: Option<BucketId>,
        back_off_secs: u64,
    },

    /// Liveness answer
    Processing { active: bool },

    /// The request could not be served
    Error { message: String },
}

impl Response {
    /// Shorthand for an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { message: message.into() }
    }
}
