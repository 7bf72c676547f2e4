use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::BufReader;

use campaign_mailer::campaign::CampaignService;
use campaign_mailer::config::Settings;
use campaign_mailer::delivery::NotificationProcessor;
use campaign_mailer::render::Renderer;
use campaign_mailer::store::{MemoryClientDataStore, MemoryTemplateStore};
use campaign_mailer::telemetry;
use campaign_mailer::transport::{ChannelMessageTransport, MemoryMailTransport};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    telemetry::init(&settings.log);
    tracing::info!("Configuration loaded");

    let xml_path = settings
        .campaign
        .xml_path
        .clone()
        .context("campaign.xml_path is required (set CAMPAIGN_XML_PATH)")?;

    // Collaborators. The in-memory stores and mail transport stand in for
    // the external systems this binary is wired against in production.
    let templates = Arc::new(MemoryTemplateStore::new());
    let clients = Arc::new(MemoryClientDataStore::new());
    let mailer = Arc::new(MemoryMailTransport::new());

    // The formatter registry is built once and shared by every render.
    let renderer = Renderer::with_builtins();

    let (transport, records) =
        ChannelMessageTransport::bounded(settings.delivery.channel_capacity);

    let processor = NotificationProcessor::new(
        templates.clone(),
        clients.clone(),
        mailer.clone(),
        renderer,
    )
    .fail_fast(settings.delivery.fail_fast);
    let delivery_handle = tokio::spawn(async move { processor.run(records).await });

    // Stream the campaign document in a single pass.
    let service = CampaignService::new(Arc::new(transport));
    let source = BufReader::new(
        File::open(&xml_path)
            .await
            .with_context(|| format!("Failed to open campaign document {}", xml_path))?,
    );

    let summary = service
        .start_campaign(
            &settings.campaign.subject,
            &settings.campaign.sender_email,
            source,
        )
        .await
        .context("Campaign pass failed")?;

    tracing::info!(
        clients_sent = summary.clients_sent,
        clients_skipped = summary.clients_skipped,
        "Campaign ingest complete"
    );

    // Closing the transport ends the delivery loop.
    drop(service);
    let delivery = delivery_handle.await?;
    tracing::info!(
        succeeded = delivery.succeeded,
        failed = delivery.failed,
        "Delivery loop finished"
    );

    Ok(())
}
