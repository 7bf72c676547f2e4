use thiserror::Error;

use crate::delivery::DeliveryError;
use crate::render::RenderError;
use crate::store::StoreError;
use crate::stream::StreamError;
use crate::transport::{MailError, TransportError};
use crate::value::NormalizeError;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
