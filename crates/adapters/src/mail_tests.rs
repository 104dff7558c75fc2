// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn render_produces_deliverable_text() {
    let adapter = SendmailAdapter::new("/usr/sbin/sendmail", "dcc@example.org");
    let message = MailMessage {
        to: vec!["ops@example.org".to_string(), "dev@example.org".to_string()],
        subject: "Failed build".to_string(),
        body: "the log".to_string(),
    };
    let text = adapter.render(&message);
    assert_eq!(
        text,
        "From: dcc@example.org\nTo: ops@example.org, dev@example.org\nSubject: Failed build\n\nthe log"
    );
}

#[tokio::test]
async fn fake_records_deliveries_in_order() {
    let fake = FakeMail::new();
    let first = MailMessage {
        to: vec!["a@example.org".to_string()],
        subject: "one".to_string(),
        body: String::new(),
    };
    let second = MailMessage { subject: "two".to_string(), ..first.clone() };
    fake.deliver(&first).await.unwrap();
    fake.deliver(&second).await.unwrap();
    let seen = fake.deliveries();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].subject, "one");
    assert_eq!(seen[1].subject, "two");
}

#[tokio::test]
async fn missing_sendmail_binary_is_a_delivery_failure() {
    let adapter = SendmailAdapter::new("/nonexistent/sendmail", "dcc@example.org");
    let message = MailMessage {
        to: vec!["ops@example.org".to_string()],
        subject: "x".to_string(),
        body: String::new(),
    };
    assert!(matches!(adapter.deliver(&message).await, Err(MailError::DeliveryFailed(_))));
}
