//! Persistence collaborators: template and client-data stores.
//!
//! The rendering core consumes these behind narrow async traits; the
//! in-memory implementations back the tests and local runs. Real document
//! database or blob storage access lives outside this crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-specific error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Template {template_id} not found for client {client_id}")]
    TemplateNotFound {
        client_id: String,
        template_id: String,
    },

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// A stored email template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    /// Template identifier, unique per client
    pub id: String,

    /// Owning client
    pub client_id: String,

    /// Human-readable template file name (e.g. `Welcome.html`)
    pub name: String,

    /// Template body in the placeholder language
    pub content: String,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl EmailTemplate {
    pub fn new(
        id: impl Into<String>,
        client_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            client_id: client_id.into(),
            name: name.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate the template identifiers.
    pub fn validate(&self) -> StoreResult<()> {
        if self.id.is_empty() || self.client_id.is_empty() {
            return Err(StoreError::InvalidTemplate(
                "Client ID and template ID cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-client recipient profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientData {
    /// Client identifier
    pub id: String,

    /// Recipient email address
    pub email: String,

    /// Display name (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Template storage keyed by (client, template).
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Fetch template text for one client/template pair.
    async fn get(&self, client_id: &str, template_id: &str) -> StoreResult<String>;

    /// Create or overwrite a template.
    async fn save(&self, template: EmailTemplate) -> StoreResult<EmailTemplate>;

    /// All templates owned by a client.
    async fn list_for_client(&self, client_id: &str) -> StoreResult<Vec<EmailTemplate>>;

    /// Delete a template; missing templates error with `TemplateNotFound`.
    async fn delete(&self, client_id: &str, template_id: &str) -> StoreResult<()>;
}

/// Per-client profile storage.
#[async_trait]
pub trait ClientDataStore: Send + Sync {
    /// Fetch a client profile; `None` when the client is unknown.
    async fn get(&self, client_id: &str) -> StoreResult<Option<ClientData>>;

    /// Insert or update a client profile.
    async fn upsert(&self, client: ClientData) -> StoreResult<()>;
}

/// In-memory template storage.
#[derive(Default)]
pub struct MemoryTemplateStore {
    templates: DashMap<(String, String), EmailTemplate>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.templates.len()
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn get(&self, client_id: &str, template_id: &str) -> StoreResult<String> {
        self.templates
            .get(&(client_id.to_string(), template_id.to_string()))
            .map(|entry| entry.content.clone())
            .ok_or_else(|| StoreError::TemplateNotFound {
                client_id: client_id.to_string(),
                template_id: template_id.to_string(),
            })
    }

    async fn save(&self, mut template: EmailTemplate) -> StoreResult<EmailTemplate> {
        template.validate()?;
        template.updated_at = Utc::now();
        let key = (template.client_id.clone(), template.id.clone());
        self.templates.insert(key, template.clone());
        Ok(template)
    }

    async fn list_for_client(&self, client_id: &str) -> StoreResult<Vec<EmailTemplate>> {
        Ok(self
            .templates
            .iter()
            .filter(|entry| entry.key().0 == client_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete(&self, client_id: &str, template_id: &str) -> StoreResult<()> {
        self.templates
            .remove(&(client_id.to_string(), template_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::TemplateNotFound {
                client_id: client_id.to_string(),
                template_id: template_id.to_string(),
            })
    }
}

/// In-memory client profile storage.
#[derive(Default)]
pub struct MemoryClientDataStore {
    clients: DashMap<String, ClientData>,
}

impl MemoryClientDataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientDataStore for MemoryClientDataStore {
    async fn get(&self, client_id: &str) -> StoreResult<Option<ClientData>> {
        Ok(self.clients.get(client_id).map(|entry| entry.clone()))
    }

    async fn upsert(&self, client: ClientData) -> StoreResult<()> {
        self.clients.insert(client.id.clone(), client);
        Ok(())
    }
}
