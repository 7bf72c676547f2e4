mod settings;

pub use settings::{CampaignConfig, DeliveryConfig, LogConfig, Settings};
