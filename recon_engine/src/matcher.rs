//! Match stage: joins one client's checkouts to its confirmed transactions.
//!
//! Matching is set-based and linear in the number of records. Across clients it runs on a
//! bounded blocking-worker pool sized by `max_workers`, since this stage is compute-bound
//! rather than I/O-bound.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::*;
use tokio::sync::Semaphore;

use crate::records::{
    record_str,
    ClientFetchResult,
    MatchResult,
    MatchedPair,
    Record,
    PAYMENT_INTENT_FIELD,
    PAYMENT_REFERENCE_FIELD,
};

/// Matches a single client's checkout journeys against its transactions.
///
/// Consumes the fetch result: the raw record lists are not needed by anything downstream,
/// so they are dropped here to bound peak memory on large clients.
///
/// A checkout with no payment intent is excluded from both the matched and unmatched sides.
/// A matched reference is removed from the lookup set, so a second checkout presenting the
/// same intent lands in the unmatched list; the reference-to-transaction map is left intact
/// and only decides which transaction record a match carries (the first one observed).
pub fn match_client(data: ClientFetchResult) -> MatchResult {
    let mut result = MatchResult { client_name: data.client_name, ..Default::default() };

    if let Some(error) = data.error {
        result.error = Some(error);
        return result;
    }

    result.total_checkouts = data.checkout_count;
    result.total_transactions = data.transaction_count;

    let mut reference_set: HashSet<String> = HashSet::with_capacity(data.transactions.len());
    let mut txn_by_reference: HashMap<String, Record> = HashMap::with_capacity(data.transactions.len());
    for txn in data.transactions {
        let Some(reference) = record_str(&txn, PAYMENT_REFERENCE_FIELD).map(str::to_string) else {
            continue;
        };
        reference_set.insert(reference.clone());
        txn_by_reference.entry(reference).or_insert(txn);
    }

    for checkout in data.checkouts {
        let Some(intent) = record_str(&checkout, PAYMENT_INTENT_FIELD).map(str::to_string) else {
            continue;
        };
        if reference_set.remove(&intent) {
            let transaction = txn_by_reference.get(&intent).cloned().unwrap_or_default();
            result.matched.push(MatchedPair { checkout, transaction, payment_intent: intent });
        } else {
            result.unmatched.push(checkout);
        }
    }

    result.matched_count = result.matched.len();
    result.unmatched_count = result.unmatched.len();
    let total = result.matched_count + result.unmatched_count;
    if total > 0 {
        result.match_rate = result.matched_count as f64 / total as f64 * 100.0;
    }

    info!(
        "🧩 [{}] Matched: {}, Unmatched: {}, Rate: {:.1}%",
        result.client_name, result.matched_count, result.unmatched_count, result.match_rate
    );
    result
}

/// Matches every client on a worker pool bounded by `max_workers`. Result order matches the
/// input order regardless of which worker finishes first.
pub async fn match_all_clients(data: Vec<ClientFetchResult>, max_workers: usize) -> Vec<MatchResult> {
    info!("🧩 Starting matching for {} clients (workers={max_workers})", data.len());
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut handles = Vec::with_capacity(data.len());
    for client_data in data {
        let permit = semaphore.clone().acquire_owned().await.expect("match semaphore is never closed");
        let client_name = client_data.client_name.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let result = match_client(client_data);
            drop(permit);
            result
        });
        handles.push((client_name, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (client_name, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!("🧩 [{client_name}] Match worker panicked: {e}");
                MatchResult {
                    client_name,
                    error: Some(format!("Match worker failed: {e}")),
                    ..Default::default()
                }
            },
        };
        results.push(result);
    }

    let total_matched: usize = results.iter().map(|r| r.matched_count).sum();
    let total_unmatched: usize = results.iter().map(|r| r.unmatched_count).sum();
    info!("🧩 Matching complete: {total_matched} matched, {total_unmatched} unmatched across all clients");
    results
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn checkout(id: u64, intent: &str) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(id));
        record.insert(PAYMENT_INTENT_FIELD.to_string(), json!(intent));
        record
    }

    fn txn(reference: &str, note: &str) -> Record {
        let mut record = Record::new();
        record.insert(PAYMENT_REFERENCE_FIELD.to_string(), json!(reference));
        record.insert("note".to_string(), json!(note));
        record
    }

    fn fetched(name: &str, checkouts: Vec<Record>, transactions: Vec<Record>) -> ClientFetchResult {
        ClientFetchResult {
            client_name: name.to_string(),
            checkout_count: checkouts.len(),
            transaction_count: transactions.len(),
            checkouts,
            transactions,
            error: None,
        }
    }

    #[test]
    fn matched_plus_unmatched_covers_every_checkout_with_an_intent() {
        let checkouts = vec![
            checkout(1, "pi_1"),
            checkout(2, ""),
            checkout(3, "pi_3"),
            checkout(4, "pi_4"),
        ];
        let transactions = vec![txn("pi_1", "a"), txn("pi_3", "b")];
        let result = match_client(fetched("Acme", checkouts, transactions));
        assert_eq!(result.matched_count + result.unmatched_count, 3);
        assert_eq!(result.matched_count, 2);
        assert_eq!(result.unmatched_count, 1);
        assert_eq!(result.total_checkouts, 4);
        assert_eq!(result.total_transactions, 2);
    }

    #[test]
    fn fifty_percent_rate_for_one_of_two() {
        let result = match_client(fetched(
            "Acme",
            vec![checkout(1, "pi_1"), checkout(2, "pi_2")],
            vec![txn("pi_1", "a")],
        ));
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.unmatched_count, 1);
        assert_eq!(result.match_rate, 50.0);
        assert_eq!(result.unmatched[0]["id"], json!(2));
    }

    #[test]
    fn transaction_order_and_duplicates_do_not_change_the_outcome() {
        let forwards = match_client(fetched(
            "Acme",
            vec![checkout(1, "pi_1"), checkout(2, "pi_2")],
            vec![txn("pi_2", "first"), txn("pi_2", "second"), txn("pi_1", "only")],
        ));
        let backwards = match_client(fetched(
            "Acme",
            vec![checkout(1, "pi_1"), checkout(2, "pi_2")],
            vec![txn("pi_1", "only"), txn("pi_2", "first"), txn("pi_2", "second")],
        ));
        assert_eq!(forwards.matched_count, 2);
        assert_eq!(backwards.matched_count, 2);
        // The first transaction observed for a reference is the one attached.
        let pair = forwards.matched.iter().find(|p| p.payment_intent == "pi_2").unwrap();
        assert_eq!(pair.transaction["note"], json!("first"));
    }

    #[test]
    fn duplicate_intents_match_once_then_fall_through_to_unmatched() {
        let result = match_client(fetched(
            "Acme",
            vec![checkout(1, "pi_1"), checkout(2, "pi_1")],
            vec![txn("pi_1", "a")],
        ));
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.unmatched_count, 1);
        assert_eq!(result.unmatched[0]["id"], json!(2));
    }

    #[test]
    fn missing_intents_are_excluded_from_both_sides() {
        let mut no_field = Record::new();
        no_field.insert("id".to_string(), json!(9));
        let result = match_client(fetched("Acme", vec![no_field, checkout(1, "")], vec![txn("pi_1", "a")]));
        assert_eq!(result.matched_count, 0);
        assert_eq!(result.unmatched_count, 0);
        assert_eq!(result.total_checkouts, 2);
    }

    #[test]
    fn zero_eligible_checkouts_rate_is_exactly_zero() {
        let result = match_client(fetched("Acme", vec![], vec![txn("pi_1", "a")]));
        assert_eq!(result.match_rate, 0.0);
    }

    #[test]
    fn fetch_errors_pass_through_without_matching() {
        let mut data = fetched("Acme", vec![checkout(1, "pi_1")], vec![txn("pi_1", "a")]);
        data.error = Some("HTTP 500".to_string());
        let result = match_client(data);
        assert_eq!(result.error.as_deref(), Some("HTTP 500"));
        assert_eq!(result.matched_count, 0);
        assert_eq!(result.unmatched_count, 0);
        assert_eq!(result.total_checkouts, 0);
        assert_eq!(result.match_rate, 0.0);
    }

    #[tokio::test]
    async fn pool_results_come_back_in_client_order() {
        let inputs = vec![
            fetched("First", vec![checkout(1, "pi_1")], vec![txn("pi_1", "a")]),
            {
                let mut failed = ClientFetchResult::new("Second");
                failed.error = Some("down".to_string());
                failed
            },
            fetched("Third", vec![checkout(2, "pi_9")], vec![]),
        ];
        let results = match_all_clients(inputs, 2).await;
        let names: Vec<&str> = results.iter().map(|r| r.client_name.as_str()).collect();
        assert_eq!(names, ["First", "Second", "Third"]);
        assert_eq!(results[0].matched_count, 1);
        assert!(results[1].error.is_some());
        assert_eq!(results[2].unmatched_count, 1);
    }

    #[tokio::test]
    async fn a_zero_worker_configuration_still_makes_progress() {
        let results = match_all_clients(vec![fetched("Only", vec![], vec![])], 0).await;
        assert_eq!(results.len(), 1);
    }
}
