use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use log::*;
use recon_engine::{pipeline::PipelineRunner, ConfigStore, RunSummary};

#[derive(Parser, Debug)]
#[command(version, about = "Multi-client payment reconciliation tools")]
pub struct Arguments {
    /// Path to the configuration document. Falls back to RECON_CONFIG_FILE, then clients.json
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "run", about = "Run the reconciliation pipeline once and print the summary")]
    Run(RunParams),
    #[clap(name = "clients", about = "List the enabled clients in the configuration document")]
    Clients,
    #[clap(name = "check", about = "Validate the configuration document")]
    Check,
}

#[derive(Debug, Args)]
pub struct RunParams {
    /// Override the lookback window (in days) for this run only
    #[arg(short, long)]
    days: Option<u32>,
    /// Directory report artifacts are written under
    #[arg(short, long, default_value = "reports")]
    reports_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();
    let args = Arguments::parse();
    let store = match args.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::from_env_or_default(),
    };
    match args.command {
        Command::Run(params) => run_pipeline(store, params).await,
        Command::Clients => list_clients(&store),
        Command::Check => check_config(&store),
    }
}

async fn run_pipeline(store: ConfigStore, params: RunParams) -> Result<()> {
    info!("Using config document at {}", store.path().display());
    let runner = PipelineRunner::new(store, params.reports_dir);
    let summary = runner.run(params.days).await?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Run started:  {}", summary.timestamp);
    println!("Elapsed:      {:.2}s", summary.elapsed_seconds);
    println!("Lookback:     {} days", summary.days);
    println!("Report dir:   {}", summary.report_dir);
    println!("Email sent:   {}", if summary.email_sent { "yes" } else { "no" });
    println!();
    println!("{:<28} {:>8} {:>10} {:>8}  Status", "Client", "Matched", "Unmatched", "Rate");
    for client in &summary.clients {
        let status = client.error.as_deref().unwrap_or("OK");
        println!(
            "{:<28} {:>8} {:>10} {:>7.1}%  {status}",
            client.name, client.matched, client.unmatched, client.match_rate
        );
    }
    println!();
    println!(
        "Totals: {} matched, {} unmatched, {} clients with errors",
        summary.totals.matched, summary.totals.unmatched, summary.totals.errors
    );
}

fn list_clients(store: &ConfigStore) -> Result<()> {
    let config = store.load()?;
    if config.clients.is_empty() {
        println!("No enabled clients in {}", store.path().display());
        return Ok(());
    }
    for client in &config.clients {
        println!("{:<28} {}", client.name, client.base_url);
    }
    Ok(())
}

fn check_config(store: &ConfigStore) -> Result<()> {
    let config = store.load()?;
    println!(
        "{} OK: {} enabled clients, {} day lookback, {} workers, page size {}",
        store.path().display(),
        config.clients.len(),
        config.settings.days,
        config.settings.max_workers,
        config.settings.fetch_page_size
    );
    if config.settings.email.sender_email.is_empty() || config.settings.email.admin_emails.is_empty() {
        println!("Email is not configured; run reports will not be sent");
    }
    Ok(())
}
