// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound build notifications: mail and chat.

use dcc_adapters::{ChatAdapter, ChatColor, ChatNotification, MailAdapter, MailMessage};
use dcc_store::{Bucket, Build, Project};

/// Notification settings of one worker.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Recipients of failure and repair mail.
    pub recipients: Vec<String>,
    /// Base URL of the result UI; the project name is appended.
    pub gui_base_url: String,
    /// Optional chat handle to cc on room messages.
    pub cc: Option<String>,
}

/// Mail sent when a bucket fails.
pub fn failure_message(
    project: &Project,
    build: &Build,
    bucket: &Bucket,
    recipients: &[String],
) -> MailMessage {
    MailMessage {
        to: recipients.to_vec(),
        subject: format!(
            "[{}] build {} ({}): bucket {} failed",
            project.name, build.number, short_commit(&build.commit), bucket.name
        ),
        body: if bucket.error_log.is_empty() {
            bucket.log.clone()
        } else {
            bucket.error_log.clone()
        },
    }
}

/// Mail sent when a previously broken bucket succeeds again.
pub fn fixed_message(
    project: &Project,
    build: &Build,
    bucket: &Bucket,
    recipients: &[String],
) -> MailMessage {
    MailMessage {
        to: recipients.to_vec(),
        subject: format!(
            "[{}] build {} ({}): bucket {} repaired",
            project.name, build.number, short_commit(&build.commit), bucket.name
        ),
        body: format!("{} is green again.\n", bucket.name),
    }
}

/// Free-form operator mail.
pub fn dcc_message(address: &str, subject: &str, body: &str) -> MailMessage {
    MailMessage {
        to: vec![address.to_string()],
        subject: subject.to_string(),
        body: body.to_string(),
    }
}

/// Room message line for a failed or repaired bucket.
pub fn chat_line(
    project_name: &str,
    bucket_name: &str,
    repaired: bool,
    gui_base_url: &str,
    cc: Option<&str>,
) -> String {
    let verb = if repaired { "repaired" } else { "failed" };
    let cc = cc.map(|user| format!(" /cc @{user}")).unwrap_or_default();
    format!(
        "[{project_name}] {bucket_name} {verb} - {}/{project_name}{cc}",
        gui_base_url.trim_end_matches('/'),
    )
}

fn short_commit(commit: &str) -> &str {
    if commit.len() > 8 {
        &commit[..8]
    } else {
        commit
    }
}

/// Fans a bucket outcome out to mail and chat.
///
/// Delivery problems are logged and never fail the bucket; the store
/// record is already durable by the time notifications fire.
pub struct Notifier<M: MailAdapter, H: ChatAdapter> {
    mail: M,
    chat: H,
    config: NotifyConfig,
}

impl<M: MailAdapter, H: ChatAdapter> Notifier<M, H> {
    pub fn new(mail: M, chat: H, config: NotifyConfig) -> Self {
        Self { mail, chat, config }
    }

    pub async fn bucket_failed(&self, project: &Project, build: &Build, bucket: &Bucket) {
        if !self.config.recipients.is_empty() {
            let message = failure_message(project, build, bucket, &self.config.recipients);
            if let Err(e) = self.mail.deliver(&message).await {
                tracing::warn!(bucket = %bucket.id, error = %e, "failure mail not delivered");
            }
        }
        self.room(project, bucket, false).await;
    }

    pub async fn bucket_repaired(&self, project: &Project, build: &Build, bucket: &Bucket) {
        if !self.config.recipients.is_empty() {
            let message = fixed_message(project, build, bucket, &self.config.recipients);
            if let Err(e) = self.mail.deliver(&message).await {
                tracing::warn!(bucket = %bucket.id, error = %e, "repair mail not delivered");
            }
        }
        self.room(project, bucket, true).await;
    }

    async fn room(&self, project: &Project, bucket: &Bucket, repaired: bool) {
        let notification = ChatNotification {
            message: chat_line(
                &project.name,
                &bucket.name,
                repaired,
                &self.config.gui_base_url,
                self.config.cc.as_deref(),
            ),
            color: if repaired { ChatColor::Green } else { ChatColor::Red },
            notify: true,
        };
        if let Err(e) = self.chat.send(&notification).await {
            tracing::warn!(bucket = %bucket.id, error = %e, "chat notification not sent");
        }
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
