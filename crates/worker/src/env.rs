// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the worker crate.

use std::path::PathBuf;
use std::time::Duration;

/// Resolve state directory: DCC_STATE_DIR > XDG_STATE_HOME/dcc > ~/.local/state/dcc
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DCC_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("dcc"));
    }
    dirs::home_dir().map(|home| home.join(".local/state/dcc"))
}

/// Config file override.
pub fn config_path() -> Option<PathBuf> {
    std::env::var("DCC_CONFIG").ok().map(PathBuf::from)
}

/// Per-call timeout for peer RPC (default 5s, `DCC_RPC_TIMEOUT_MS`).
pub fn rpc_timeout() -> Duration {
    std::env::var("DCC_RPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Log filter (default "info", `DCC_LOG`).
pub fn log_filter() -> String {
    std::env::var("DCC_LOG").unwrap_or_else(|_| "info".to_string())
}
