// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound mail.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::subprocess::SENDMAIL_TIMEOUT;

/// Errors from mail delivery
#[derive(Debug, Error)]
pub enum MailError {
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// A deliverable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Adapter for delivering mail
#[async_trait]
pub trait MailAdapter: Clone + Send + Sync + 'static {
    async fn deliver(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Delivers through the local MTA's sendmail binary.
#[derive(Clone)]
pub struct SendmailAdapter {
    sendmail: PathBuf,
    from: String,
}

impl SendmailAdapter {
    pub fn new(sendmail: impl Into<PathBuf>, from: impl Into<String>) -> Self {
        Self { sendmail: sendmail.into(), from: from.into() }
    }

    /// RFC-822 text handed to `sendmail -t`.
    fn render(&self, message: &MailMessage) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\n\n{}",
            self.from,
            message.to.join(", "),
            message.subject,
            message.body,
        )
    }
}

#[async_trait]
impl MailAdapter for SendmailAdapter {
    async fn deliver(&self, message: &MailMessage) -> Result<(), MailError> {
        let mut child = tokio::process::Command::new(&self.sendmail)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MailError::DeliveryFailed(format!("spawn {:?}: {e}", self.sendmail)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(self.render(message).as_bytes())
                .await
                .map_err(|e| MailError::DeliveryFailed(format!("write: {e}")))?;
        }

        let output = tokio::time::timeout(SENDMAIL_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| MailError::DeliveryFailed("sendmail timed out".to_string()))?
            .map_err(|e| MailError::DeliveryFailed(format!("wait: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MailError::DeliveryFailed(format!(
                "sendmail exited {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        tracing::info!(subject = %message.subject, recipients = message.to.len(), "mail delivered");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{MailAdapter, MailError, MailMessage};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake mail adapter recording deliveries
    #[derive(Clone, Default)]
    pub struct FakeMail {
        inner: Arc<Mutex<Vec<MailMessage>>>,
    }

    impl FakeMail {
        pub fn new() -> Self {
            Self::default()
        }

        /// All recorded deliveries, in order.
        pub fn deliveries(&self) -> Vec<MailMessage> {
            self.inner.lock().clone()
        }
    }

    #[async_trait]
    impl MailAdapter for FakeMail {
        async fn deliver(&self, message: &MailMessage) -> Result<(), MailError> {
            self.inner.lock().push(message.clone());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeMail;

#[cfg(test)]
#[path = "mail_tests.rs"]
mod tests;
