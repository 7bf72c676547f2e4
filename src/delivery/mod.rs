//! Notification delivery: turn one queued record into a rendered mail.
//!
//! For each record the processor looks up the recipient profile and the
//! template text, normalizes the marketing payload, renders the template
//! and hands the result to the mail transport. Every failure is isolated
//! to its record; a batch continues past failed records.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::render::{RenderError, Renderer};
use crate::store::{ClientDataStore, StoreError, TemplateStore};
use crate::stream::NotificationRecord;
use crate::transport::{DeliveryStatus, MailError, MailTransport};
use crate::value::{normalize, NormalizeError, Value};

/// Result type for delivery operations
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Delivery-specific error type; every variant is scoped to one record.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("No client data for client {0}")]
    ClientNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Aggregate outcome of a delivery loop.
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Renders and delivers queued notification records.
pub struct NotificationProcessor {
    templates: Arc<dyn TemplateStore>,
    clients: Arc<dyn ClientDataStore>,
    mailer: Arc<dyn MailTransport>,
    renderer: Renderer,
    fail_fast: bool,
}

impl NotificationProcessor {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        clients: Arc<dyn ClientDataStore>,
        mailer: Arc<dyn MailTransport>,
        renderer: Renderer,
    ) -> Self {
        Self {
            templates,
            clients,
            mailer,
            renderer,
            fail_fast: false,
        }
    }

    /// Stop the delivery loop at the first failed record instead of
    /// draining the batch.
    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Process one record end to end.
    pub async fn process(&self, record: &NotificationRecord) -> DeliveryResult<DeliveryStatus> {
        let client = self
            .clients
            .get(&record.client_id)
            .await?
            .ok_or_else(|| DeliveryError::ClientNotFound(record.client_id.clone()))?;

        let template = self
            .templates
            .get(&record.client_id, &record.template_id)
            .await?;

        let data = if record.data.trim().is_empty() {
            Value::Mapping(BTreeMap::new())
        } else {
            normalize(&record.data)?
        };

        let html = self.renderer.render_str(&template, &data)?;

        let status = self
            .mailer
            .send(&record.subject, &record.sender_email, &client.email, &html)
            .await?;

        match status {
            DeliveryStatus::Succeeded => {
                tracing::info!(
                    client_id = %record.client_id,
                    recipient = %client.email,
                    "Email sent"
                );
            }
            DeliveryStatus::Failed => {
                tracing::error!(
                    client_id = %record.client_id,
                    recipient = %client.email,
                    "Mail transport reported failure"
                );
            }
        }

        Ok(status)
    }

    /// Drain a record channel, processing each record and isolating
    /// per-record failures. Finishes when the sending side closes, or at
    /// the first failure in fail-fast mode.
    pub async fn run(&self, mut records: mpsc::Receiver<NotificationRecord>) -> DeliverySummary {
        let mut summary = DeliverySummary::default();

        while let Some(record) = records.recv().await {
            match self.process(&record).await {
                Ok(DeliveryStatus::Succeeded) => {
                    summary.succeeded += 1;
                    continue;
                }
                Ok(DeliveryStatus::Failed) => summary.failed += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(
                        client_id = %record.client_id,
                        template_id = %record.template_id,
                        error = %e,
                        "Failed to process notification"
                    );
                }
            }

            if self.fail_fast {
                tracing::error!(
                    client_id = %record.client_id,
                    "Stopping delivery loop on first failure"
                );
                break;
            }
        }

        summary
    }
}
