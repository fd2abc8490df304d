//! Command-line interface definitions for AI News Digest.
//!
//! Every option can be supplied as a flag or through the environment (a
//! `.env` file in the working directory is loaded before parsing). The four
//! credentials are optional at the clap level so that a missing one is
//! reported by [`crate::config::RunConfig`] with the variable's name instead
//! of a generic usage error.

use clap::Parser;

/// Command-line arguments for the AI News Digest run.
///
/// # Examples
///
/// ```sh
/// # Everything from the environment / .env
/// ai_news_digest
///
/// # Point at a self-hosted OpenAI-compatible endpoint
/// ai_news_digest --openai-base-url http://localhost:8080/v1 --openai-model qwen2.5
/// ```
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// CSV export URL of the spreadsheet listing the sites to watch
    #[arg(long, env = "SPREADSHEET_URL")]
    pub spreadsheet_url: Option<String>,

    /// API key for the summarization model
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Slack bot token used to post messages
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub slack_bot_token: Option<String>,

    /// Slack channel that receives digests and run summaries
    #[arg(long, env = "SLACK_CHANNEL_ID")]
    pub slack_channel_id: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Chat model used for summaries
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    /// Base URL of the Slack Web API
    #[arg(long, env = "SLACK_API_BASE", default_value = "https://slack.com/api")]
    pub slack_api_base: String,

    /// Maximum number of candidate articles taken from each site
    #[arg(long, env = "MAX_ARTICLES_PER_SITE", default_value_t = 5)]
    pub max_articles: usize,

    /// Articles published longer ago than this many hours are skipped
    #[arg(long, env = "RECENCY_HOURS", default_value_t = 24)]
    pub recency_hours: i64,
}
