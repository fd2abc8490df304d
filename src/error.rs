//! Crate-wide error type.
//!
//! Configuration problems, transport failures and upstream API rejections all
//! surface through [`Error`]. Whether an error aborts the run or is recorded
//! against a single site is decided by the orchestrator, not here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A required configuration value was absent or blank. Carries the
    /// environment variable name so operators know what to set.
    #[error("{0} is not set in environment variables")]
    MissingConfig(&'static str),

    #[error("{name} is invalid: {reason}")]
    InvalidConfig { name: &'static str, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} failed: {status}")]
    Status { url: String, status: reqwest::StatusCode },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Slack API error: {0}")]
    Slack(String),

    #[error("Summarization error: {0}")]
    Summarize(String),
}

pub type Result<T> = std::result::Result<T, Error>;
