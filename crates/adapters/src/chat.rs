// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat-room notifications.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors from chat delivery
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("room rejected the message: HTTP {0}")]
    Rejected(u16),
}

/// Message colour shown in the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatColor {
    Red,
    Green,
}

/// One room notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatNotification {
    pub message: String,
    pub color: ChatColor,
    pub notify: bool,
}

/// Adapter for posting to the configured chat room
#[async_trait]
pub trait ChatAdapter: Clone + Send + Sync + 'static {
    async fn send(&self, notification: &ChatNotification) -> Result<(), ChatError>;
}

/// Posts JSON to a single room URL with token auth.
#[derive(Clone)]
pub struct HttpChatAdapter {
    client: reqwest::Client,
    room_url: String,
    token: String,
}

impl HttpChatAdapter {
    pub fn new(room_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            room_url: room_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl ChatAdapter for HttpChatAdapter {
    async fn send(&self, notification: &ChatNotification) -> Result<(), ChatError> {
        let response = self
            .client
            .post(&self.room_url)
            .bearer_auth(&self.token)
            .json(notification)
            .send()
            .await
            .map_err(|e| ChatError::SendFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ChatError::Rejected(response.status().as_u16()));
        }
        tracing::info!(message = %notification.message, "chat notification sent");
        Ok(())
    }
}

/// Chat adapter for workers without a configured room.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopChat;

#[async_trait]
impl ChatAdapter for NoopChat {
    async fn send(&self, notification: &ChatNotification) -> Result<(), ChatError> {
        tracing::debug!(message = %notification.message, "chat not configured, dropping");
        Ok(())
    }
}

/// Dispatches to the configured chat transport.
#[derive(Clone)]
pub enum ChatRouter {
    Http(HttpChatAdapter),
    Noop(NoopChat),
}

#[async_trait]
impl ChatAdapter for ChatRouter {
    async fn send(&self, notification: &ChatNotification) -> Result<(), ChatError> {
        match self {
            ChatRouter::Http(adapter) => adapter.send(notification).await,
            ChatRouter::Noop(adapter) => adapter.send(notification).await,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{ChatAdapter, ChatError, ChatNotification};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake chat adapter recording notifications
    #[derive(Clone, Default)]
    pub struct FakeChat {
        inner: Arc<Mutex<Vec<ChatNotification>>>,
    }

    impl FakeChat {
        pub fn new() -> Self {
            Self::default()
        }

        /// All recorded notifications, in order.
        pub fn notifications(&self) -> Vec<ChatNotification> {
            self.inner.lock().clone()
        }
    }

    #[async_trait]
    impl ChatAdapter for FakeChat {
        async fn send(&self, notification: &ChatNotification) -> Result<(), ChatError> {
            self.inner.lock().push(notification.clone());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeChat;

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
