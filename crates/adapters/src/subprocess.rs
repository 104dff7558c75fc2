// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded external command execution.

use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Source sync can legitimately take a while on first clone.
pub const GIT_SYNC_TIMEOUT: Duration = Duration::from_secs(600);

/// Handing a message to the local MTA should be quick.
pub const SENDMAIL_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from running an external command
#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{label} timed out after {timeout:?}")]
    TimedOut { label: String, timeout: Duration },
    #[error("{label}: {source}")]
    Io {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run a command to completion, killing it when `timeout` elapses.
///
/// Stdout and stderr are captured; stdin is closed.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, SubprocessError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
    let child = cmd.spawn().map_err(|source| SubprocessError::Io {
        label: label.to_string(),
        source,
    })?;
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| SubprocessError::Io {
            label: label.to_string(),
            source,
        }),
        Err(_) => {
            tracing::warn!(label, ?timeout, "subprocess timed out, killing");
            Err(SubprocessError::TimedOut { label: label.to_string(), timeout })
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
