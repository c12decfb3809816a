//! Notify stage: emails the run's report artifacts to the administrators.
//!
//! Delivery is strictly best-effort. An unconfigured sender or empty recipient list skips
//! the send, and any build/transport failure is logged and reported as "not sent" — nothing
//! in this module can fail the pipeline.

use std::{fs, path::Path};

use chrono::Local;
use lettre::{
    message::{header::ContentType, Attachment, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
};
use log::*;
use thiserror::Error;

use crate::{records::MatchResult, report::ReportArtifacts, settings::EmailSettings};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("Could not assemble the message: {0}")]
    Build(String),
    #[error("Could not read attachment: {0}")]
    Attachment(String),
}

/// Sends the report email with all CSVs and the combined JSON attached. Returns whether the
/// email went out.
pub async fn send_report_email(
    email: &EmailSettings,
    artifacts: &ReportArtifacts,
    results: &[MatchResult],
) -> bool {
    if email.sender_email.is_empty() || email.admin_emails.is_empty() {
        warn!("📧 Email not configured, skipping send");
        return false;
    }
    match try_send(email, artifacts, results).await {
        Ok(()) => {
            info!("📧 Report email sent to {}", email.admin_emails.join(", "));
            true
        },
        Err(e) => {
            error!("📧 Email send failed: {e}");
            false
        },
    }
}

async fn try_send(
    email: &EmailSettings,
    artifacts: &ReportArtifacts,
    results: &[MatchResult],
) -> Result<(), NotifyError> {
    let subject = format!("Reconciliation Report - {}", Local::now().format("%Y-%m-%d %H:%M"));
    let mut builder = Message::builder().from(email.sender_email.parse()?).subject(subject);
    for admin in &email.admin_emails {
        builder = builder.to(admin.parse()?);
    }

    let mut multipart = MultiPart::mixed().singlepart(SinglePart::plain(build_body(results)));
    for csv_path in &artifacts.csv_files {
        multipart = multipart.singlepart(attachment_part(csv_path)?);
    }
    multipart = multipart.singlepart(attachment_part(&artifacts.combined_json_path)?);

    let message = builder.multipart(multipart).map_err(|e| NotifyError::Build(e.to_string()))?;
    let credentials = Credentials::new(email.sender_email.clone(), email.sender_password.reveal().clone());
    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&email.smtp_host)?
        .port(email.smtp_port)
        .credentials(credentials)
        .build();
    mailer.send(message).await?;
    Ok(())
}

fn attachment_part(path: &Path) -> Result<SinglePart, NotifyError> {
    let bytes = fs::read(path).map_err(|e| NotifyError::Attachment(format!("{}: {e}", path.display())))?;
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("report").to_string();
    let content_type =
        ContentType::parse("application/octet-stream").map_err(|e| NotifyError::Build(e.to_string()))?;
    Ok(Attachment::new(filename).body(bytes, content_type))
}

fn build_body(results: &[MatchResult]) -> String {
    let total_matched: usize = results.iter().map(|r| r.matched_count).sum();
    let total_unmatched: usize = results.iter().map(|r| r.unmatched_count).sum();
    let mut lines = vec![
        "Payment Reconciliation Report".to_string(),
        "=".repeat(40),
        format!("Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        format!("Clients Processed: {}", results.len()),
        format!("Total Matched: {total_matched}"),
        format!("Total Unmatched: {total_unmatched}"),
        String::new(),
        "Per Client Summary:".to_string(),
        "-".repeat(40),
    ];
    for result in results {
        let status = if result.error.is_some() { "ERROR" } else { "OK" };
        lines.push(format!(
            "  {}: Matched={}, Unmatched={}, Rate={:.1}% [{status}]",
            result.client_name, result.matched_count, result.unmatched_count, result.match_rate
        ));
    }
    lines.join("\n")
}
