//! Report stage: turns match results into durable artifacts.
//!
//! Every run gets a fresh directory keyed by its start timestamp, holding one
//! unmatched-checkout CSV per client and a combined JSON document. Per-client artifacts are
//! written in parallel on the same bounded worker pool the match stage uses; the combined
//! document is assembled only once every per-client artifact is on disk.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Local;
use log::*;
use recon_common::safe_file_name;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::{
    errors::ReportError,
    records::{MatchResult, Record, PAYMENT_INTENT_FIELD},
};

/// Column order of the per-client unmatched CSV. Fixed; operator tooling depends on it.
pub const CSV_COLUMNS: [&str; 11] = [
    "Client",
    "Checkout ID",
    "Invoice ID",
    "Order No",
    "Payment Intent",
    "Payment Status",
    "Amount",
    "Currency",
    "Donor Email",
    "Donor Name",
    "Created At",
];

pub const COMBINED_REPORT_FILE: &str = "combined_report.json";

/// The well-known checkout fields surfaced in JSON reports. Fields the portal did not
/// return serialize as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedRecord {
    pub id: Value,
    pub invoiceid: Value,
    pub order_no: Value,
    pub payment_intent: Value,
    pub payment_status: Value,
    pub amount: Value,
    pub currency: Value,
    pub donor_email: Value,
    pub donor_name: Value,
    pub created_at: Value,
}

impl UnmatchedRecord {
    pub fn from_record(record: &Record) -> Self {
        let field = |name: &str| record.get(name).cloned().unwrap_or(Value::Null);
        Self {
            id: field("id"),
            invoiceid: field("invoiceid"),
            order_no: field("order_no"),
            payment_intent: field(PAYMENT_INTENT_FIELD),
            payment_status: field("payment_status"),
            amount: field("total_amount"),
            currency: field("currency"),
            donor_email: field("donor_email"),
            donor_name: field("donor_name"),
            created_at: field("created_at"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    pub total_checkouts: usize,
    pub total_transactions: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub match_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientReport {
    pub client: String,
    pub summary: ClientSummary,
    pub unmatched_records: Vec<UnmatchedRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverallSummary {
    pub total_matched: usize,
    pub total_unmatched: usize,
    pub clients_with_errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CombinedReport {
    pub generated_at: String,
    pub total_clients: usize,
    pub overall_summary: OverallSummary,
    pub clients: Vec<ClientReport>,
}

/// Paths and the combined document produced by one report run.
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub run_dir: PathBuf,
    pub combined_json_path: PathBuf,
    pub csv_files: Vec<PathBuf>,
    pub combined: CombinedReport,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn csv_field(record: &Record, name: &str) -> String {
    match record.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Everything one worker needs to write a client's artifacts. Owned, so it can move onto
/// the blocking pool.
struct ClientArtifactJob {
    client_name: String,
    unmatched: Vec<Record>,
    summary: ClientSummary,
}

impl ClientArtifactJob {
    fn from_result(result: &MatchResult) -> Self {
        Self {
            client_name: result.client_name.clone(),
            unmatched: result.unmatched.clone(),
            summary: ClientSummary {
                total_checkouts: result.total_checkouts,
                total_transactions: result.total_transactions,
                matched: result.matched_count,
                unmatched: result.unmatched_count,
                match_rate: round2(result.match_rate),
            },
        }
    }

    fn render_csv(&self) -> Result<Vec<u8>, ReportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_COLUMNS).map_err(|e| ReportError::Serialize(e.to_string()))?;
        for checkout in &self.unmatched {
            let row = [
                self.client_name.clone(),
                csv_field(checkout, "id"),
                csv_field(checkout, "invoiceid"),
                csv_field(checkout, "order_no"),
                csv_field(checkout, PAYMENT_INTENT_FIELD),
                csv_field(checkout, "payment_status"),
                csv_field(checkout, "total_amount"),
                csv_field(checkout, "currency"),
                csv_field(checkout, "donor_email"),
                csv_field(checkout, "donor_name"),
                csv_field(checkout, "created_at"),
            ];
            writer.write_record(&row).map_err(|e| ReportError::Serialize(e.to_string()))?;
        }
        writer.into_inner().map_err(|e| ReportError::Serialize(e.to_string()))
    }

    fn write_artifacts(self, run_dir: &Path) -> Result<(PathBuf, ClientReport), ReportError> {
        let csv_bytes = self.render_csv()?;
        let csv_path = run_dir.join(format!("{}_unmatched.csv", safe_file_name(&self.client_name)));
        fs::write(&csv_path, csv_bytes)
            .map_err(|e| ReportError::WriteFile(format!("{}: {e}", csv_path.display())))?;
        let report = ClientReport {
            client: self.client_name,
            summary: self.summary,
            unmatched_records: self.unmatched.iter().map(UnmatchedRecord::from_record).collect(),
        };
        Ok((csv_path, report))
    }
}

/// Creates `<root>/<timestamp>` for this run. A second run starting within the same second
/// gets a numbered sibling instead of reusing the directory.
fn create_run_dir(root: &Path, timestamp: &str) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(root).map_err(|e| ReportError::CreateDir(format!("{}: {e}", root.display())))?;
    let mut run_dir = root.join(timestamp);
    let mut attempt = 1;
    loop {
        match fs::create_dir(&run_dir) {
            Ok(()) => return Ok(run_dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                attempt += 1;
                run_dir = root.join(format!("{timestamp}_{attempt}"));
            },
            Err(e) => return Err(ReportError::CreateDir(format!("{}: {e}", run_dir.display()))),
        }
    }
}

/// Writes every client's CSV (bounded by `max_workers`), then the combined JSON document.
pub async fn generate_reports(
    results: &[MatchResult],
    max_workers: usize,
    reports_root: &Path,
) -> Result<ReportArtifacts, ReportError> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let run_dir = create_run_dir(reports_root, &timestamp)?;

    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut handles = Vec::with_capacity(results.len());
    for result in results {
        let job = ClientArtifactJob::from_result(result);
        let permit = semaphore.clone().acquire_owned().await.expect("report semaphore is never closed");
        let dir = run_dir.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let outcome = job.write_artifacts(&dir);
            drop(permit);
            outcome
        }));
    }

    let mut csv_files = Vec::with_capacity(handles.len());
    let mut clients = Vec::with_capacity(handles.len());
    for handle in handles {
        let (csv_path, report) = handle.await.map_err(|e| ReportError::WorkerFailure(e.to_string()))??;
        csv_files.push(csv_path);
        clients.push(report);
    }

    let combined = CombinedReport {
        generated_at: Local::now().to_rfc3339(),
        total_clients: results.len(),
        overall_summary: OverallSummary {
            total_matched: results.iter().map(|r| r.matched_count).sum(),
            total_unmatched: results.iter().map(|r| r.unmatched_count).sum(),
            clients_with_errors: results.iter().filter(|r| r.error.is_some()).count(),
        },
        clients,
    };
    let combined_json_path = run_dir.join(COMBINED_REPORT_FILE);
    let body = serde_json::to_vec_pretty(&combined).map_err(|e| ReportError::Serialize(e.to_string()))?;
    fs::write(&combined_json_path, body)
        .map_err(|e| ReportError::WriteFile(format!("{}: {e}", combined_json_path.display())))?;

    info!("🗃️ Reports saved to {}", run_dir.display());
    Ok(ReportArtifacts { run_dir, combined_json_path, csv_files, combined })
}
