// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use dcc_store::{Disconnect, StoreError};
use thiserror::Error;

/// Errors from scheduling operations
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("project {0} wants a build but has no commit")]
    NoCommit(String),
}

impl Disconnect for SchedulerError {
    fn is_disconnect(&self) -> bool {
        matches!(self, SchedulerError::Store(e) if e.is_disconnect())
    }
}
