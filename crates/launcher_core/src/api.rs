use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{decode_events_json, DocumentId, Event},
    protocol::{ApplicationConfiguration, TriggerRequest},
};
use tracing::debug;
use url::Url;

use crate::{
    catalog::Catalog,
    error::{LauncherError, Result},
};

/// Requests execution of an event on the trigger server.
#[async_trait]
pub trait EventLauncher: Send + Sync {
    async fn launch(&self, document_id: &DocumentId, event: &Event) -> Result<()>;
}

/// Upper bound on any single request to the trigger server or a preview host.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the trigger server's REST surface.
#[derive(Debug, Clone)]
pub struct TriggerApi {
    http: Client,
    server_url: String,
}

impl TriggerApi {
    pub fn new(server_url: &str) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Self::with_client(http, server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self> {
        let parsed = Url::parse(server_url).map_err(|err| LauncherError::InvalidUrl {
            url: server_url.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LauncherError::InvalidUrl {
                url: server_url.to_string(),
                reason: "server_url must start with http:// or https://".to_string(),
            });
        }
        Ok(Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn events_url(&self, document_id: &DocumentId) -> String {
        format!(
            "{}/api/v1/document/{}/events",
            self.server_url, document_id
        )
    }

    pub fn trigger_url(&self, document_id: &DocumentId, event: &Event) -> String {
        format!("{}/{}/trigger", self.events_url(document_id), event.id)
    }

    pub async fn fetch_events(&self, document_id: &DocumentId) -> Result<Vec<Event>> {
        let body = self
            .http
            .get(self.events_url(document_id))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(decode_events_json(&body)?)
    }

    pub async fn fetch_catalog(&self, document_id: &DocumentId) -> Result<Catalog> {
        self.fetch_events(document_id).await.map(Catalog::from_events)
    }

    pub async fn fetch_configuration(&self) -> Result<ApplicationConfiguration> {
        let config = self
            .http
            .get(format!("{}/api/v1/configuration", self.server_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(config)
    }
}

#[async_trait]
impl EventLauncher for TriggerApi {
    async fn launch(&self, document_id: &DocumentId, event: &Event) -> Result<()> {
        let url = self.trigger_url(document_id, event);
        debug!(event_id = %event.id, url = %url, "launch: posting trigger request");
        self.http
            .post(url)
            .json(&TriggerRequest::from_parameters(&event.parameters))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
