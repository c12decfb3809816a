//! Pipeline orchestration and run state.
//!
//! [`PipelineRunner`] owns the only shared mutable state in the system: the single-run
//! guard and the latest run summary. One run moves Fetch → Match → Report → Notify in
//! strict sequence; per-client failures ride along as data, while configuration or report
//! I/O failures abort the run without recording a summary.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use chrono::{DateTime, Local};
use log::*;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    errors::PipelineError,
    fetch::fetch_all_clients,
    matcher::match_all_clients,
    notify::send_report_email,
    records::MatchResult,
    report::{generate_reports, round2, ReportArtifacts, UnmatchedRecord},
    settings::{ConfigStore, RunSettings},
};

#[derive(Debug, Clone, Serialize)]
pub struct ClientRunSummary {
    pub name: String,
    pub matched: usize,
    pub unmatched: usize,
    pub total_checkouts: usize,
    pub total_transactions: usize,
    pub match_rate: f64,
    pub error: Option<String>,
    pub unmatched_records: Vec<UnmatchedRecord>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTotals {
    pub matched: usize,
    pub unmatched: usize,
    pub errors: usize,
}

/// The externally visible result of one pipeline run. Every configured client appears,
/// either with full numbers or with `error` set; callers must treat a client-level error as
/// "skip this client's numbers", not as a failed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub elapsed_seconds: f64,
    pub days: u32,
    pub email_sent: bool,
    pub report_dir: String,
    pub clients: Vec<ClientRunSummary>,
    pub totals: RunTotals,
}

/// Owns the run-state guard, the latest summary, and the handles needed to execute runs.
pub struct PipelineRunner {
    store: ConfigStore,
    reports_root: PathBuf,
    running: AtomicBool,
    last_run: RwLock<Option<RunSummary>>,
}

impl PipelineRunner {
    pub fn new(store: ConfigStore, reports_root: impl Into<PathBuf>) -> Self {
        Self { store, reports_root: reports_root.into(), running: AtomicBool::new(false), last_run: RwLock::new(None) }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The summary of the most recent completed run, if any.
    pub async fn last_run(&self) -> Option<RunSummary> {
        self.last_run.read().await.clone()
    }

    /// Executes one full run. Rejected with [`PipelineError::AlreadyRunning`] when a run is
    /// in flight; the losing caller observes no side effects. The guard is released on every
    /// exit path.
    ///
    /// Configuration is reloaded fresh at the start of each run, so edits to the document
    /// apply to the next run, never a running one. `days_override` narrows or widens the
    /// lookback window for this run only.
    pub async fn run(&self, days_override: Option<u32>) -> Result<RunSummary, PipelineError> {
        let _guard = RunGuard::acquire(&self.running)?;
        let started_at = Local::now();
        let clock = Instant::now();

        let mut config = self.store.load()?;
        if let Some(days) = days_override {
            config.settings.days = days;
        }

        info!("{}", "=".repeat(60));
        info!("🚀️ PIPELINE START - {} clients, {} days", config.clients.len(), config.settings.days);
        info!("{}", "=".repeat(60));

        let fetched = fetch_all_clients(&config.clients, &config.settings).await;
        let results = match_all_clients(fetched, config.settings.max_workers).await;
        let artifacts = generate_reports(&results, config.settings.max_workers, &self.reports_root).await?;
        let email_sent = send_report_email(&config.settings.email, &artifacts, &results).await;

        let elapsed = clock.elapsed().as_secs_f64();
        let summary = build_summary(started_at, elapsed, &config.settings, email_sent, &artifacts, results);
        *self.last_run.write().await = Some(summary.clone());

        info!("🚀️ PIPELINE COMPLETE in {elapsed:.2}s");
        Ok(summary)
    }
}

/// RAII guard around the Idle→Running transition. Acquisition is a single compare-and-set,
/// so concurrent run requests cannot both win; dropping the guard returns the state to Idle
/// no matter how the run ended.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, PipelineError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| PipelineError::AlreadyRunning)?;
        Ok(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

fn build_summary(
    started_at: DateTime<Local>,
    elapsed: f64,
    settings: &RunSettings,
    email_sent: bool,
    artifacts: &ReportArtifacts,
    results: Vec<MatchResult>,
) -> RunSummary {
    let mut totals = RunTotals::default();
    let mut clients = Vec::with_capacity(results.len());
    for result in results {
        totals.matched += result.matched_count;
        totals.unmatched += result.unmatched_count;
        if result.error.is_some() {
            totals.errors += 1;
        }
        clients.push(ClientRunSummary {
            name: result.client_name,
            matched: result.matched_count,
            unmatched: result.unmatched_count,
            total_checkouts: result.total_checkouts,
            total_transactions: result.total_transactions,
            match_rate: round2(result.match_rate),
            error: result.error,
            unmatched_records: result.unmatched.iter().map(UnmatchedRecord::from_record).collect(),
        });
    }
    RunSummary {
        timestamp: started_at.to_rfc3339(),
        elapsed_seconds: round2(elapsed),
        days: settings.days,
        email_sent,
        report_dir: artifacts.run_dir.display().to_string(),
        clients,
        totals,
    }
}
