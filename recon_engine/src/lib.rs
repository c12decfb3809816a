//! Payment Reconciliation Engine
//!
//! The engine pulls checkout journey and transaction records from each configured client's
//! donation portal, matches checkouts against confirmed transactions on the shared
//! payment-intent key, and writes per-client CSV and combined JSON reports, optionally
//! emailing them to administrators.
//!
//! A run moves through four strictly sequenced stages:
//! 1. **Fetch** ([`mod@fetch`]) — all clients concurrently on the async runtime, two
//!    paginated streams per client. A client's failure is captured on its result, never
//!    raised; one slow portal cannot stall another client's fetch.
//! 2. **Match** ([`mod@matcher`]) — set-based matching per client on a bounded worker pool,
//!    sized independently of fetch concurrency.
//! 3. **Report** ([`mod@report`]) — one unmatched-checkout CSV per client plus a combined
//!    JSON document, written to a fresh timestamp-keyed run directory.
//! 4. **Notify** ([`mod@notify`]) — best-effort admin email; failure downgrades to a flag on
//!    the run summary.
//!
//! [`pipeline::PipelineRunner`] owns the sequencing, the single-run guard and the latest
//! run summary.

pub mod errors;
pub mod fetch;
pub mod matcher;
pub mod notify;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod settings;

pub use errors::{ConfigError, PipelineError, ReportError};
pub use pipeline::{PipelineRunner, RunSummary};
pub use records::{ClientFetchResult, MatchResult};
pub use settings::{AppConfig, ClientConfig, ConfigStore, RunSettings};
