use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};

use crate::{
    config::PortalConfig,
    data_objects::{PageEnvelope, PortalRecord},
    PortalApiError,
};

/// Endpoint serving checkout journey records.
pub const CHECKOUT_JOURNEY_PATH: &str = "get_checkout_journey.php";
/// Endpoint serving confirmed transaction records.
pub const TRANSACTIONS_PATH: &str = "get_transactions.php";

#[derive(Clone)]
pub struct PortalApi {
    config: PortalConfig,
    client: Arc<Client>,
}

impl PortalApi {
    pub fn new(config: PortalConfig) -> Result<Self, PortalApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| PortalApiError::Initialization(e.to_string()))?;
        headers.insert("X-Api-Key", val);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PortalApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn client_name(&self) -> &str {
        &self.config.client_name
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.as_str().trim_end_matches('/'))
    }

    /// Fetches a single page from a paginated portal endpoint. Pages are 1-based.
    async fn fetch_page(&self, path: &str, days: u32, page: u32, limit: u32) -> Result<PageEnvelope, PortalApiError> {
        let url = self.url(path);
        trace!("[{}] Requesting page {page} from {url}", self.config.client_name);
        let params = [("days", days.to_string()), ("page", page.to_string()), ("limit", limit.to_string())];
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| PortalApiError::RequestError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| PortalApiError::RequestError(e.to_string()))?;
            return Err(PortalApiError::QueryError { status, message });
        }
        let envelope =
            response.json::<PageEnvelope>().await.map_err(|e| PortalApiError::JsonError(e.to_string()))?;
        if !envelope.success {
            return Err(PortalApiError::ApiError(envelope.error.unwrap_or_else(|| "Unknown".to_string())));
        }
        Ok(envelope)
    }

    /// Fetches every page of a paginated endpoint, strictly in page order, and returns the
    /// concatenated records. Any failing page aborts the whole fetch; callers never see a
    /// partial collection presented as success.
    pub async fn fetch_all_pages(&self, path: &str, days: u32, limit: u32) -> Result<Vec<PortalRecord>, PortalApiError> {
        let mut records = vec![];
        let mut page = 1;
        loop {
            let envelope = self.fetch_page(path, days, page, limit).await?;
            debug!(
                "[{}] {path} page {page}: {} records, has_more: {}",
                self.config.client_name,
                envelope.data.len(),
                envelope.has_more
            );
            records.extend(envelope.data);
            if !envelope.has_more {
                break;
            }
            page += 1;
        }
        Ok(records)
    }

    pub async fn checkout_journeys(&self, days: u32, page_size: u32) -> Result<Vec<PortalRecord>, PortalApiError> {
        self.fetch_all_pages(CHECKOUT_JOURNEY_PATH, days, page_size).await
    }

    pub async fn transactions(&self, days: u32, page_size: u32) -> Result<Vec<PortalRecord>, PortalApiError> {
        self.fetch_all_pages(TRANSACTIONS_PATH, days, page_size).await
    }
}
