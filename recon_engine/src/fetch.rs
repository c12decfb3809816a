//! Fetch stage: pulls both record streams for every enabled client.
//!
//! This stage is I/O-bound, so it fans out on the async runtime: one future per client,
//! each awaiting its two endpoint fetches concurrently. A client's failure is captured on
//! its [`ClientFetchResult`] and never propagates to its neighbours.

use std::time::Duration;

use futures::future::join_all;
use log::*;
use portal_tools::{PortalApi, PortalApiError, PortalConfig, PortalRecord};

use crate::{
    records::ClientFetchResult,
    settings::{ClientConfig, RunSettings},
};

async fn fetch_streams(
    client: &ClientConfig,
    settings: &RunSettings,
) -> Result<(Vec<PortalRecord>, Vec<PortalRecord>), PortalApiError> {
    let config = PortalConfig::new(
        &client.name,
        &client.base_url,
        client.api_key.clone(),
        Duration::from_secs(settings.request_timeout),
    )?;
    let api = PortalApi::new(config)?;
    // The two streams are independent reads, so they run concurrently.
    tokio::try_join!(
        api.checkout_journeys(settings.days, settings.fetch_page_size),
        api.transactions(settings.days, settings.fetch_page_size),
    )
}

/// Fetches checkout journeys and transactions for a single client. Failure of either stream
/// is returned as data on the result, with empty record lists.
pub async fn fetch_client_data(client: &ClientConfig, settings: &RunSettings) -> ClientFetchResult {
    let mut result = ClientFetchResult::new(&client.name);
    info!("📥 [{}] Fetching data (last {} days)", client.name, settings.days);
    match fetch_streams(client, settings).await {
        Ok((checkouts, transactions)) => {
            result.checkout_count = checkouts.len();
            result.transaction_count = transactions.len();
            result.checkouts = checkouts;
            result.transactions = transactions;
            info!(
                "📥 [{}] Fetched {} checkouts, {} transactions",
                client.name, result.checkout_count, result.transaction_count
            );
        },
        Err(e) => {
            error!("📥 [{}] Fetch failed: {e}", client.name);
            result.error = Some(e.to_string());
        },
    }
    result
}

/// Fetches every client concurrently. Results come back in client order regardless of
/// completion order, and a slow or failing client never delays the others. All clients run
/// to completion; there is no early exit.
pub async fn fetch_all_clients(clients: &[ClientConfig], settings: &RunSettings) -> Vec<ClientFetchResult> {
    info!("📥 Starting fetch for {} clients", clients.len());
    let tasks = clients.iter().map(|client| fetch_client_data(client, settings));
    let results = join_all(tasks).await;
    let success = results.iter().filter(|r| r.error.is_none()).count();
    info!("📥 Fetch complete: {success}/{} clients successful", results.len());
    results
}
