// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bucket state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a bucket.
///
/// Wire codes are fixed by the store schema: terminal states are sticky and
/// the only legal sequence is a prefix of
/// `Queued → Claimed → {Success | Failed | ProcessingFailed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketState {
    /// Created by the scanner, waiting for a worker.
    Queued,
    /// Handed to a worker by the leader.
    Claimed,
    /// Every task list completed cleanly.
    Success,
    /// At least one task reported failure.
    Failed,
    /// The bucket was not evaluated to completion (worker died,
    /// store unreachable, or execution aborted).
    ProcessingFailed,
}

impl BucketState {
    /// Numeric code used by the store schema.
    pub fn code(self) -> u8 {
        match self {
            BucketState::Success => 10,
            BucketState::Queued => 20,
            BucketState::Claimed => 30,
            BucketState::ProcessingFailed => 35,
            BucketState::Failed => 40,
        }
    }

    /// Parse a store code back into a state.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            10 => Some(BucketState::Success),
            20 => Some(BucketState::Queued),
            30 => Some(BucketState::Claimed),
            35 => Some(BucketState::ProcessingFailed),
            40 => Some(BucketState::Failed),
            _ => None,
        }
    }

    /// True once the bucket can never change state again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BucketState::Success | BucketState::Failed | BucketState::ProcessingFailed
        )
    }

    /// Whether the state machine admits `self → next`.
    pub fn may_transition_to(self, next: BucketState) -> bool {
        match self {
            BucketState::Queued => matches!(
                next,
                BucketState::Claimed | BucketState::ProcessingFailed
            ),
            BucketState::Claimed => next.is_terminal(),
            _ => false,
        }
    }
}

crate::simple_display! {
    BucketState {
        Queued => "queued",
        Claimed => "claimed",
        Success => "success",
        Failed => "failure",
        ProcessingFailed => "processing_failed",
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
