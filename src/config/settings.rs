use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub campaign: CampaignConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignConfig {
    /// Email subject stamped onto every record of a campaign pass
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Sender address stamped onto every record
    #[serde(default = "default_sender_email")]
    pub sender_email: String,
    /// Path of the campaign XML document to ingest
    pub xml_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Capacity of the in-process record channel between the campaign pass
    /// and the delivery loop
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Stop the delivery loop on the first failed record instead of
    /// draining the batch
    #[serde(default)]
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Tracing filter used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON-formatted log lines
    #[serde(default)]
    pub json: bool,
}

fn default_subject() -> String {
    "Campaign update".to_string()
}

fn default_sender_email() -> String {
    "noreply@example.com".to_string()
}

fn default_channel_capacity() -> usize {
    64
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("campaign.subject", default_subject())?
            .set_default("campaign.sender_email", default_sender_email())?
            .set_default(
                "delivery.channel_capacity",
                default_channel_capacity() as i64,
            )?
            .set_default("delivery.fail_fast", false)?
            .set_default("log.filter", default_log_filter())?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // CAMPAIGN_SUBJECT, CAMPAIGN_SENDER_EMAIL, CAMPAIGN_XML_PATH, etc.
            .add_source(Environment::default().separator("_").try_parsing(true));

        builder.build()?.try_deserialize()
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            sender_email: default_sender_email(),
            xml_path: None,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            fail_fast: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}
