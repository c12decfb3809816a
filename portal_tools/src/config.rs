use std::time::Duration;

use recon_common::Secret;
use url::Url;

use crate::PortalApiError;

/// Connection details for one client's donation portal.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub client_name: String,
    pub base_url: Url,
    pub api_key: Secret<String>,
    pub request_timeout: Duration,
}

impl PortalConfig {
    pub fn new(
        client_name: &str,
        base_url: &str,
        api_key: Secret<String>,
        request_timeout: Duration,
    ) -> Result<Self, PortalApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| PortalApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self { client_name: client_name.to_string(), base_url, api_key, request_timeout })
    }
}
