//! Core record and result types that flow between the pipeline stages.
//!
//! Portal payloads are loosely typed: only the two join-key fields are contractually
//! guaranteed, so records stay opaque field maps all the way into the reports. Per-client
//! failure travels as data on these results rather than as an error the caller must catch.

use portal_tools::PortalRecord;

/// An opaque checkout or transaction record as returned by a portal endpoint.
pub type Record = PortalRecord;

/// Checkout-side join key: the payment intent the donor's checkout created.
pub const PAYMENT_INTENT_FIELD: &str = "stripe_payment_intent_id";
/// Transaction-side join key: the processor's payment reference.
pub const PAYMENT_REFERENCE_FIELD: &str = "paya_reference";

/// Returns a non-empty string field from a record, if present.
pub fn record_str<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

/// Everything fetched for one client in one run. `error` set means the fetch failed and the
/// record lists are empty; downstream stages treat that as data, not as a reason to stop.
#[derive(Debug, Clone, Default)]
pub struct ClientFetchResult {
    pub client_name: String,
    pub checkouts: Vec<Record>,
    pub transactions: Vec<Record>,
    pub checkout_count: usize,
    pub transaction_count: usize,
    pub error: Option<String>,
}

impl ClientFetchResult {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self { client_name: client_name.into(), ..Default::default() }
    }
}

/// A checkout paired with the transaction that confirms it.
#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub checkout: Record,
    pub transaction: Record,
    pub payment_intent: String,
}

/// The outcome of matching one client's checkouts against its transactions.
///
/// `matched_count + unmatched_count` equals the number of checkouts that carried a non-empty
/// payment intent; checkouts without one are deliberately excluded from both sides.
/// `total_checkouts`/`total_transactions` report the raw fetched counts.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub client_name: String,
    pub matched: Vec<MatchedPair>,
    pub unmatched: Vec<Record>,
    pub matched_count: usize,
    pub unmatched_count: usize,
    pub total_checkouts: usize,
    pub total_transactions: usize,
    pub match_rate: f64,
    pub error: Option<String>,
}
