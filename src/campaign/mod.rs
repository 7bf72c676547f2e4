//! Campaign ingest: drive the XML streamer and hand each record to the
//! message transport.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::io::AsyncBufRead;

use crate::error::Result;
use crate::stream::XmlRecordStreamer;
use crate::transport::MessageTransport;

/// Outcome of one campaign pass.
#[derive(Debug, Clone)]
pub struct CampaignSummary {
    /// Records handed to the transport
    pub clients_sent: usize,
    /// Incomplete clients skipped during streaming
    pub clients_skipped: usize,
    /// Records the transport refused
    pub transport_failures: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Streams a bulk campaign document and fans records out to a transport.
pub struct CampaignService {
    transport: Arc<dyn MessageTransport>,
}

impl CampaignService {
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self { transport }
    }

    /// Process one campaign document in a single streaming pass.
    ///
    /// Incomplete clients are skipped by the streamer; transport failures
    /// are logged and counted but do not abort the pass. Only a
    /// structurally malformed document fails.
    pub async fn start_campaign<R>(
        &self,
        subject: &str,
        sender_email: &str,
        source: R,
    ) -> Result<CampaignSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let started_at = Utc::now();
        let mut streamer = XmlRecordStreamer::new(source, subject, sender_email);

        let mut clients_sent = 0usize;
        let mut transport_failures = 0usize;

        while let Some(record) = streamer.next_record().await? {
            let client_id = record.client_id.clone();
            match self.transport.send(record).await {
                Ok(()) => {
                    clients_sent += 1;
                    tracing::debug!(client_id = %client_id, "Notification record enqueued");
                }
                Err(e) => {
                    transport_failures += 1;
                    tracing::error!(client_id = %client_id, error = %e, "Transport rejected notification record");
                }
            }
        }

        let summary = CampaignSummary {
            clients_sent,
            clients_skipped: streamer.skipped(),
            transport_failures,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            clients_sent = summary.clients_sent,
            clients_skipped = summary.clients_skipped,
            transport_failures = summary.transport_failures,
            "Campaign pass finished"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::transport::MemoryMessageTransport;

    const CAMPAIGN: &str = r#"<Clients>
        <Client ID="12345">
            <Template Id="1">
                <Name>Welcome.html</Name>
                <MarketingData>{"title":"Hello"}</MarketingData>
            </Template>
        </Client>
        <Client ID="no-template"></Client>
        <Client ID="54321">
            <Template Id="2">
                <Name>Promo.html</Name>
                <MarketingData>{"title":"Promo"}</MarketingData>
            </Template>
        </Client>
    </Clients>"#;

    #[tokio::test]
    async fn test_campaign_sends_one_message_per_client() {
        let transport = Arc::new(MemoryMessageTransport::new());
        let service = CampaignService::new(transport.clone());

        let summary = service
            .start_campaign("Spring sale", "news@example.com", CAMPAIGN.as_bytes())
            .await
            .unwrap();

        assert_eq!(summary.clients_sent, 2);
        assert_eq!(summary.clients_skipped, 1);
        assert_eq!(summary.transport_failures, 0);

        let sent = transport.sent();
        assert_eq!(sent[0].record.client_id, "12345");
        assert_eq!(sent[0].record.subject, "Spring sale");
        assert_eq!(sent[0].record.sender_email, "news@example.com");
        assert_eq!(sent[1].record.client_id, "54321");
    }

    #[tokio::test]
    async fn test_closed_transport_is_counted_not_fatal() {
        let (transport, rx) = crate::transport::ChannelMessageTransport::bounded(1);
        drop(rx);

        let service = CampaignService::new(Arc::new(transport));
        let summary = service
            .start_campaign("S", "a@b.cc", CAMPAIGN.as_bytes())
            .await
            .unwrap();

        assert_eq!(summary.clients_sent, 0);
        assert_eq!(summary.transport_failures, 2);
    }

    #[tokio::test]
    async fn test_malformed_document_aborts_the_pass() {
        let xml = r#"<Clients><Client ID="1"><Template></Client></Clients>"#;
        let transport = Arc::new(MemoryMessageTransport::new());
        let service = CampaignService::new(transport.clone());

        let err = service
            .start_campaign("S", "a@b.cc", xml.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Stream(_)));
        assert!(transport.is_empty());
    }
}
