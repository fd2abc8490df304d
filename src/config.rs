//! Per-run configuration.
//!
//! [`RunConfig`] is built once from the parsed [`Cli`] and handed by reference
//! to every adapter that needs a credential or endpoint. Nothing else in the
//! crate reads the environment.

use crate::cli::Cli;
use crate::error::{Error, Result};
use chrono::Duration;
use std::fmt;

/// Immutable, validated configuration for a single run.
#[derive(Clone)]
pub struct RunConfig {
    /// CSV export URL of the site list.
    pub spreadsheet_url: String,
    pub openai_api_key: String,
    pub slack_bot_token: String,
    pub slack_channel_id: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub slack_api_base: String,
    /// Upper bound on candidate articles collected per site.
    pub max_articles_per_site: usize,
    /// Width of the recency window.
    pub recency_window: Duration,
}

impl RunConfig {
    /// Validate the CLI/environment values into a [`RunConfig`].
    ///
    /// The required values are checked in a fixed order and the first one
    /// that is absent or blank is reported by its environment variable name.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(Self {
            spreadsheet_url: required(&cli.spreadsheet_url, "SPREADSHEET_URL")?,
            openai_api_key: required(&cli.openai_api_key, "OPENAI_API_KEY")?,
            slack_bot_token: required(&cli.slack_bot_token, "SLACK_BOT_TOKEN")?,
            slack_channel_id: required(&cli.slack_channel_id, "SLACK_CHANNEL_ID")?,
            openai_base_url: cli.openai_base_url.trim_end_matches('/').to_string(),
            openai_model: cli.openai_model.clone(),
            slack_api_base: cli.slack_api_base.trim_end_matches('/').to_string(),
            max_articles_per_site: cli.max_articles,
            recency_window: recency_window(cli.recency_hours)?,
        })
    }
}

/// Longest accepted window, about ten years.
const MAX_RECENCY_HOURS: i64 = 24 * 366 * 10;

fn recency_window(hours: i64) -> Result<Duration> {
    if !(0..=MAX_RECENCY_HOURS).contains(&hours) {
        return Err(Error::InvalidConfig {
            name: "RECENCY_HOURS",
            reason: format!("{hours} is outside 0..={MAX_RECENCY_HOURS}"),
        });
    }
    Duration::try_hours(hours).ok_or_else(|| Error::InvalidConfig {
        name: "RECENCY_HOURS",
        reason: format!("{hours} hours is out of range"),
    })
}

fn required(value: &Option<String>, name: &'static str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::MissingConfig(name)),
    }
}

// Credentials stay out of logs.
impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("spreadsheet_url", &self.spreadsheet_url)
            .field("openai_api_key", &"<redacted>")
            .field("slack_bot_token", &"<redacted>")
            .field("slack_channel_id", &self.slack_channel_id)
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("slack_api_base", &self.slack_api_base)
            .field("max_articles_per_site", &self.max_articles_per_site)
            .field("recency_window", &self.recency_window)
            .finish()
    }
}
