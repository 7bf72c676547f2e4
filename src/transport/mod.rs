//! Outbound collaborators: the notification message transport and the mail
//! transport.
//!
//! Queue semantics and mail-provider integration are out of scope for this
//! crate; these traits are the narrow seams where they plug in. The
//! in-memory implementations serve tests and local wiring, plus a channel
//! transport that feeds an in-process delivery loop.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::stream::NotificationRecord;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport-specific error type
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Message transport failure: {0}")]
    Send(String),

    #[error("Message transport is closed")]
    Closed,
}

/// Mail-transport error type
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport failure: {0}")]
    Transport(String),
}

/// Outcome reported by the mail transport for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Succeeded,
    Failed,
}

/// Destination for per-client notification records emitted during a
/// campaign pass.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, record: NotificationRecord) -> TransportResult<()>;
}

/// Outbound mail delivery.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(
        &self,
        subject: &str,
        sender: &str,
        recipient: &str,
        html_body: &str,
    ) -> Result<DeliveryStatus, MailError>;
}

/// A record captured by the in-memory transport, with an envelope identity
/// assigned at enqueue time.
#[derive(Debug, Clone)]
pub struct QueuedNotification {
    pub id: Uuid,
    pub record: NotificationRecord,
    pub enqueued_at: DateTime<Utc>,
}

/// In-memory message transport that captures every sent record.
#[derive(Default)]
pub struct MemoryMessageTransport {
    sent: Mutex<Vec<QueuedNotification>>,
}

impl MemoryMessageTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<QueuedNotification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageTransport for MemoryMessageTransport {
    async fn send(&self, record: NotificationRecord) -> TransportResult<()> {
        let queued = QueuedNotification {
            id: Uuid::new_v4(),
            record,
            enqueued_at: Utc::now(),
        };
        self.sent
            .lock()
            .map_err(|_| TransportError::Send("transport state poisoned".to_string()))?
            .push(queued);
        Ok(())
    }
}

/// Message transport backed by an in-process channel, connecting the
/// campaign pass to a delivery loop.
pub struct ChannelMessageTransport {
    tx: mpsc::Sender<NotificationRecord>,
}

impl ChannelMessageTransport {
    pub fn new(tx: mpsc::Sender<NotificationRecord>) -> Self {
        Self { tx }
    }

    /// Create a bounded channel transport together with its receiving end.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<NotificationRecord>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl MessageTransport for ChannelMessageTransport {
    async fn send(&self, record: NotificationRecord) -> TransportResult<()> {
        self.tx.send(record).await.map_err(|_| TransportError::Closed)
    }
}

/// One message captured by the in-memory mail transport.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub subject: String,
    pub sender: String,
    pub recipient: String,
    pub html_body: String,
    pub sent_at: DateTime<Utc>,
}

/// In-memory mail transport; can be told to fail for specific recipients
/// to exercise failure paths.
#[derive(Default)]
pub struct MemoryMailTransport {
    sent: Mutex<Vec<SentMail>>,
    failing_recipients: Mutex<Vec<String>>,
}

impl MemoryMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `recipient` report `Failed`.
    pub fn fail_for(&self, recipient: impl Into<String>) {
        if let Ok(mut failing) = self.failing_recipients.lock() {
            failing.push(recipient.into());
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MailTransport for MemoryMailTransport {
    async fn send(
        &self,
        subject: &str,
        sender: &str,
        recipient: &str,
        html_body: &str,
    ) -> Result<DeliveryStatus, MailError> {
        let failing = self
            .failing_recipients
            .lock()
            .map(|failing| failing.iter().any(|r| r == recipient))
            .unwrap_or(false);
        if failing {
            return Ok(DeliveryStatus::Failed);
        }

        self.sent
            .lock()
            .map_err(|_| MailError::Transport("mail state poisoned".to_string()))?
            .push(SentMail {
                subject: subject.to_string(),
                sender: sender.to_string(),
                recipient: recipient.to_string(),
                html_body: html_body.to_string(),
                sent_at: Utc::now(),
            });
        Ok(DeliveryStatus::Succeeded)
    }
}
