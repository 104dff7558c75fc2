// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker configuration.

use dcc_core::{GroupName, WorkerUri};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::daemon::DaemonError;

/// Worker daemon configuration, loaded from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Group this peer belongs to.
    pub group: String,
    /// Address the RPC listener binds. Port 0 picks an ephemeral port.
    pub listen_addr: String,
    /// URI peers use to reach this worker; defaults to the bound address.
    pub uri: Option<String>,
    /// Hostname reported with assignments; defaults to `$HOSTNAME`.
    pub hostname: Option<String>,
    /// State directory override.
    pub state_dir: Option<PathBuf>,
    /// Bootstrap a stuck group by seizing leadership.
    pub tyrant: bool,
    pub timing: TimingConfig,
    pub mail: MailConfig,
    pub chat: Option<ChatConfig>,
    pub ui: UiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            group: "default".to_string(),
            listen_addr: "127.0.0.1:4411".to_string(),
            uri: None,
            hostname: None,
            state_dir: None,
            tyrant: false,
            timing: TimingConfig::default(),
            mail: MailConfig::default(),
            chat: None,
            ui: UiConfig::default(),
        }
    }
}

/// All intervals and deadlines, in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub lease_ttl_ms: u64,
    pub tick_ms: u64,
    pub back_off_ms: u64,
    pub log_polling_interval_ms: u64,
    pub assignment_jitter_ms: u64,
    pub bucket_timeout_ms: u64,
    pub reconnect_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            lease_ttl_ms: 120_000,
            tick_ms: 20_000,
            back_off_ms: 60_000,
            log_polling_interval_ms: 10_000,
            assignment_jitter_ms: 2_000,
            bucket_timeout_ms: 7_200_000,
            reconnect_delay_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub sendmail: PathBuf,
    pub from: String,
    /// Recipients of failure and repair mail. Empty disables build mail.
    pub recipients: Vec<String>,
    /// Operator address for worker-error mail.
    pub admin: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sendmail: PathBuf::from("/usr/sbin/sendmail"),
            from: "dcc@localhost".to_string(),
            recipients: Vec::new(),
            admin: None,
        }
    }
}

/// Room notifications. Absent section disables chat.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatConfig {
    pub room_url: String,
    pub token: String,
    pub cc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Base URL of the result UI linked from chat messages.
    pub base_url: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost".to_string() }
    }
}

impl Config {
    /// Parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| DaemonError::Config(format!("{}: {e}", path.display())))
    }

    pub fn group_name(&self) -> GroupName {
        GroupName::new(self.group.clone())
    }

    /// URI peers use to reach this worker, given the actually bound address.
    pub fn self_uri(&self, bound_addr: &str) -> WorkerUri {
        match &self.uri {
            Some(uri) => WorkerUri::new(uri.clone()),
            None => WorkerUri::new(bound_addr),
        }
    }

    pub fn hostname(&self) -> String {
        self.hostname
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// State directory: config > environment > home default.
    pub fn resolve_state_dir(&self) -> Result<PathBuf, DaemonError> {
        self.state_dir
            .clone()
            .or_else(crate::env::state_dir)
            .ok_or_else(|| DaemonError::Config("no state directory resolvable".to_string()))
    }
}

impl TimingConfig {
    pub fn lease_ttl(&self) -> Duration {
        Duration::from_millis(self.lease_ttl_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn back_off(&self) -> Duration {
        Duration::from_millis(self.back_off_ms)
    }

    pub fn log_polling_interval(&self) -> Duration {
        Duration::from_millis(self.log_polling_interval_ms)
    }

    pub fn assignment_jitter(&self) -> Duration {
        Duration::from_millis(self.assignment_jitter_ms)
    }

    pub fn bucket_timeout(&self) -> Duration {
        Duration::from_millis(self.bucket_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
