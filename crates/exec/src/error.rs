// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use dcc_store::{Disconnect, StoreError};
use std::time::Duration;
use thiserror::Error;

/// Errors from bucket execution
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("source sync failed: {0}")]
    Sync(String),
    #[error("prepare failed: {0}")]
    Prepare(String),
    #[error("bucket timed out after {0:?}")]
    Timeout(Duration),
    #[error("peer rpc failed: {0}")]
    Rpc(String),
}

impl Disconnect for ExecError {
    fn is_disconnect(&self) -> bool {
        matches!(self, ExecError::Store(e) if e.is_disconnect())
    }
}

/// Render an error with its full cause chain, one cause per line.
pub(crate) fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\ncaused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
