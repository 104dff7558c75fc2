// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use dcc_core::{BucketId, WorkerUri};
use serde::{Deserialize, Serialize};

/// Request from one peer to another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Ask the leader for the next bucket to process
    NextBucket {
        requestor_uri: WorkerUri,
        hostname: String,
    },

    /// Ask a worker whether it is still processing a claimed bucket
    Processing { bucket_id: BucketId },
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
