//! # AI News Digest
//!
//! A scheduled pipeline that reads a list of sites from a spreadsheet,
//! scrapes their recently published articles, summarizes each one with an
//! OpenAI-compatible model and posts the digests to a Slack channel.
//!
//! ## Usage
//!
//! ```sh
//! # credentials from the environment or a .env file
//! ai_news_digest
//! ```
//!
//! ## Architecture
//!
//! The application runs one strictly sequential pass:
//! 1. **Configuration**: validate the four required credentials
//! 2. **Site list**: fetch the spreadsheet CSV (retried)
//! 3. **Per site**: collect recent articles (retried), summarize them
//!    one at a time, post a digest (retried); failures stay with the site
//! 4. **Summary**: post the run's counters and error list
//!
//! A configuration error or an unreachable site list is fatal: an error
//! notice is attempted and the process exits with status 1.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod error;
mod models;
mod notifier;
mod orchestrator;
mod retry;
mod scrapers;
mod sites;
mod summarizer;
mod utils;

use cli::Cli;
use orchestrator::RunReport;

#[tokio::main]
async fn main() -> ExitCode {
    // .env first so RUST_LOG from it reaches the filter
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("🚀 AI News Digest started");

    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "Failed to load .env file");
        }
    }

    let args = Cli::parse();

    let code = match orchestrator::run(&args).await {
        Ok(RunReport::NoSites) => {
            info!("Nothing to do; exiting");
            ExitCode::SUCCESS
        }
        Ok(RunReport::Completed(metrics)) => {
            info!(
                successful_sites = metrics.successful_sites,
                total_articles = metrics.total_articles,
                "✅ AI News Digest completed successfully"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "❌ Fatal error");
            orchestrator::report_fatal(&args, &e).await;
            ExitCode::FAILURE
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    code
}
