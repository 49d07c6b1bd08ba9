//! Thin HTTP wrapper over the `/api/progress` endpoints, using [`reqwest`].

use roadmap_core::progress::ProgressStatus;
use roadmap_core::types::Timestamp;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Page size used when pulling the full progress listing.
const LISTING_PAGE_SIZE: i64 = 100;

/// The parts of a backend progress record the client keeps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub item_id: String,
    pub phase_id: String,
    pub section_id: String,
    pub status: ProgressStatus,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// Status counts from `GET /progress/overview`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOverview {
    pub completed_items: u64,
    pub in_progress_items: u64,
}

/// One row of `GET /progress/phase/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSection {
    pub section_id: String,
    pub completed_items: u64,
    pub in_progress_items: u64,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    pagination: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    page: i64,
    pages: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for one roadmap backend.
pub struct BackendApi {
    client: reqwest::Client,
    api_url: Url,
    token: Option<String>,
}

impl BackendApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let api_url = Url::parse(&format!("{}/api", config.base_url))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        Ok(Self {
            client,
            api_url,
            token: None,
        })
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// `POST /progress` with the given status.
    pub async fn upsert_progress(
        &self,
        item_id: &str,
        phase_id: &str,
        section_id: &str,
        status: ProgressStatus,
    ) -> Result<RemoteRecord, ClientError> {
        let body = serde_json::json!({
            "itemId": item_id,
            "phaseId": phase_id,
            "sectionId": section_id,
            "status": status,
        });
        let request = self.client.post(self.endpoint(&["progress"])?).json(&body);
        let envelope: Envelope<RemoteRecord> = self.send(request).await?;
        require_data(envelope.data)
    }

    /// `GET /progress/item/{id}`; `None` when the user has no record.
    pub async fn get_item(&self, item_id: &str) -> Result<Option<RemoteRecord>, ClientError> {
        let request = self
            .client
            .get(self.endpoint(&["progress", "item", item_id])?);
        let envelope: Envelope<Option<RemoteRecord>> = self.send(request).await?;
        Ok(envelope.data.flatten())
    }

    /// Every record the user has, following pagination to the end.
    pub async fn list_all(&self) -> Result<Vec<RemoteRecord>, ClientError> {
        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let request = self
                .client
                .get(self.endpoint(&["progress"])?)
                .query(&[("page", page), ("limit", LISTING_PAGE_SIZE)]);
            let envelope: Envelope<Vec<RemoteRecord>> = self.send(request).await?;
            records.extend(envelope.data.unwrap_or_default());
            match envelope.pagination {
                Some(meta) if meta.page < meta.pages => page = meta.page + 1,
                _ => break,
            }
        }
        Ok(records)
    }

    pub async fn overview(&self) -> Result<RemoteOverview, ClientError> {
        let request = self.client.get(self.endpoint(&["progress", "overview"])?);
        let envelope: Envelope<RemoteOverview> = self.send(request).await?;
        require_data(envelope.data)
    }

    pub async fn phase_progress(&self, phase_id: &str) -> Result<Vec<RemoteSection>, ClientError> {
        let request = self
            .client
            .get(self.endpoint(&["progress", "phase", phase_id])?);
        let envelope: Envelope<Vec<RemoteSection>> = self.send(request).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    // ---- private helpers ----

    /// `api_url` extended by `segments`, each percent-encoded as a single
    /// path segment so ids containing `/`, `?` or `#` stay intact.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.api_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach the bearer token, send, classify the status and parse the body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&text)?);
        }

        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or(text);
        if status.is_server_error() {
            Err(ClientError::Server {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn require_data<T>(data: Option<T>) -> Result<T, ClientError> {
    data.ok_or_else(|| {
        ClientError::Serde(<serde_json::Error as serde::de::Error>::custom(
            "response envelope has no data",
        ))
    })
}
