//! Export API client
//!
//! Endpoints, relative to the configured base URL:
//!
//! | path | body |
//! |---|---|
//! | `/instance/export/{id}/{kind_code}/{since}` | event page (JSON array) |
//! | `/instance/export/{id}` | instance metadata |
//! | `/instance/export/participants/{id}` | participants |
//! | `/instance/export/attempts/{id}` | attempts |

use serde::de::DeserializeOwned;

use crate::combat_log::{Event, EventId, EventKind, parse_page};
use crate::context::{Attempt, InstanceMeta, Participant, ViewerConfig};

use super::{ExportSource, FetchError};

#[derive(Debug, Clone)]
pub struct HttpExportSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExportSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.export_base_url.as_str())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn events_url(&self, instance_id: u64, kind: EventKind, since: EventId) -> String {
        format!(
            "{}/instance/export/{}/{}/{}",
            self.base_url,
            instance_id,
            kind.code(),
            since
        )
    }

    pub fn meta_url(&self, instance_id: u64) -> String {
        format!("{}/instance/export/{}", self.base_url, instance_id)
    }

    pub fn participants_url(&self, instance_id: u64) -> String {
        format!("{}/instance/export/participants/{}", self.base_url, instance_id)
    }

    pub fn attempts_url(&self, instance_id: u64) -> String {
        format!("{}/instance/export/attempts/{}", self.base_url, instance_id)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, FetchError> {
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(source) => return Err(FetchError::Transport { url, source }),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(source) => return Err(FetchError::Transport { url, source }),
        };
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { url, source })
    }
}

impl ExportSource for HttpExportSource {
    async fn fetch_events(
        &self,
        instance_id: u64,
        kind: EventKind,
        since: EventId,
    ) -> Result<Vec<Event>, FetchError> {
        let records: Vec<serde_json::Value> =
            self.get_json(self.events_url(instance_id, kind, since)).await?;
        let page = parse_page(kind, records);
        if page.skipped > 0 {
            tracing::warn!(%kind, skipped = page.skipped, "Skipped malformed records in page");
        }
        Ok(page.events)
    }

    async fn fetch_meta(&self, instance_id: u64) -> Result<InstanceMeta, FetchError> {
        self.get_json(self.meta_url(instance_id)).await
    }

    async fn fetch_participants(&self, instance_id: u64) -> Result<Vec<Participant>, FetchError> {
        self.get_json(self.participants_url(instance_id)).await
    }

    async fn fetch_attempts(&self, instance_id: u64) -> Result<Vec<Attempt>, FetchError> {
        self.get_json(self.attempts_url(instance_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_export_routes() {
        let source = HttpExportSource::new("http://localhost:8000/API/");
        assert_eq!(source.base_url(), "http://localhost:8000/API");
        assert_eq!(
            source.events_url(12, EventKind::Heal, 340),
            "http://localhost:8000/API/instance/export/12/14/340"
        );
        assert_eq!(
            source.meta_url(12),
            "http://localhost:8000/API/instance/export/12"
        );
        assert_eq!(
            source.participants_url(12),
            "http://localhost:8000/API/instance/export/participants/12"
        );
        assert_eq!(
            source.attempts_url(12),
            "http://localhost:8000/API/instance/export/attempts/12"
        );
    }

    #[test]
    fn source_from_config_uses_base_url() {
        let config = ViewerConfig {
            export_base_url: "https://example.org/API".to_string(),
            ..Default::default()
        };
        let source = HttpExportSource::from_config(&config);
        assert_eq!(
            source.events_url(1, EventKind::SpellCast, 0),
            "https://example.org/API/instance/export/1/0/0"
        );
    }
}
