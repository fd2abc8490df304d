//! Slack delivery of digests, run summaries and fatal-error notices.
//!
//! Messages go through the Web API `chat.postMessage` method as Block Kit
//! blocks with a plain `text` fallback. Slack reports most failures with a
//! `200 OK` and `{"ok": false, "error": "..."}`, so both the HTTP status and
//! the `ok` flag are checked.
//!
//! Only [`Notify::post_digest`] reports failure to its caller (the
//! orchestrator retries it). Summary and error posts log and swallow their
//! own failures.

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::models::{RunMetrics, SummarizedArticle};
use crate::utils::local_timestamp;
use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Destination for everything a run reports.
pub trait Notify {
    /// Post one site's digest. Does nothing for an empty list.
    async fn post_digest(&self, site_name: &str, articles: &[SummarizedArticle]) -> Result<()>;
    /// Best-effort fatal error notice.
    async fn post_error(&self, message: &str);
    /// Best-effort aggregate run summary.
    async fn post_summary(&self, metrics: &RunMetrics);
}

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// [`Notify`] implementation for a Slack channel.
#[derive(Clone)]
pub struct SlackNotifier {
    client: Client,
    api_base: String,
    token: String,
    channel: String,
}

impl SlackNotifier {
    pub fn new(client: Client, config: &RunConfig) -> Self {
        Self {
            client,
            api_base: config.slack_api_base.clone(),
            token: config.slack_bot_token.clone(),
            channel: config.slack_channel_id.clone(),
        }
    }

    async fn post_message(&self, blocks: Vec<Value>, text: String) -> Result<()> {
        let url = format!("{}/chat.postMessage", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({
                "channel": self.channel,
                "blocks": blocks,
                "text": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status { url, status });
        }

        let body: SlackResponse = response.json().await?;
        if body.ok {
            Ok(())
        } else {
            Err(Error::Slack(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ))
        }
    }
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackNotifier")
            .field("api_base", &self.api_base)
            .field("channel", &self.channel)
            .finish()
    }
}

impl Notify for SlackNotifier {
    #[instrument(level = "info", skip(self, articles), fields(count = articles.len()))]
    async fn post_digest(&self, site_name: &str, articles: &[SummarizedArticle]) -> Result<()> {
        if articles.is_empty() {
            info!("ℹ️ No articles to post");
            return Ok(());
        }

        info!("📤 Posting digest to Slack");
        let blocks = digest_blocks(site_name, articles, &local_timestamp());
        let text = format!("Latest articles from {} ({})", site_name, articles.len());
        self.post_message(blocks, text).await?;
        info!("✅ Posted {} article(s) to Slack", articles.len());
        Ok(())
    }

    #[instrument(level = "info", skip_all)]
    async fn post_error(&self, message: &str) {
        let blocks = error_blocks(message, &local_timestamp());
        let text = format!("AI News Bot error: {}", message);
        match self.post_message(blocks, text).await {
            Ok(()) => info!("✅ Error notification posted to Slack"),
            Err(e) => error!(error = %e, "❌ Failed to post error to Slack"),
        }
    }

    #[instrument(level = "info", skip_all)]
    async fn post_summary(&self, metrics: &RunMetrics) {
        let blocks = summary_blocks(metrics, &local_timestamp());
        let text = format!(
            "AI News Bot run summary: {} article(s) posted",
            metrics.total_articles
        );
        match self.post_message(blocks, text).await {
            Ok(()) => info!("✅ Summary posted to Slack"),
            Err(e) => error!(error = %e, "❌ Failed to post summary to Slack"),
        }
    }
}

fn context(text: String) -> Value {
    json!({
        "type": "context",
        "elements": [{ "type": "mrkdwn", "text": text }],
    })
}

fn mrkdwn_section(text: String) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text },
    })
}

fn header(text: String) -> Value {
    json!({
        "type": "header",
        "text": { "type": "plain_text", "text": text, "emoji": true },
    })
}

fn divider() -> Value {
    json!({ "type": "divider" })
}

/// Blocks for one site's digest: header, one {title, summary, link} group per
/// article with dividers between groups, and a capture-time footer.
pub fn digest_blocks(
    site_name: &str,
    articles: &[SummarizedArticle],
    captured_at: &str,
) -> Vec<Value> {
    let mut blocks = vec![
        header(format!("🤖 Latest articles from {}", site_name)),
        divider(),
    ];

    for (i, article) in articles.iter().enumerate() {
        if i > 0 {
            blocks.push(divider());
        }
        blocks.push(mrkdwn_section(format!("*📰 {}*", article.title)));
        blocks.push(mrkdwn_section(article.summary.clone()));
        blocks.push(mrkdwn_section(format!("🔗 <{}|Read article>", article.url)));
    }

    blocks.push(divider());
    blocks.push(context(format!(
        "Captured: {} | Articles: {}",
        captured_at,
        articles.len()
    )));
    blocks
}

/// Blocks for the aggregate run summary.
pub fn summary_blocks(metrics: &RunMetrics, run_at: &str) -> Vec<Value> {
    let status = if metrics.errors.is_empty() { "✅" } else { "⚠️" };
    let field = |label: &str, value: usize| {
        json!({ "type": "mrkdwn", "text": format!("*{}:*\n{}", label, value) })
    };

    let mut blocks = vec![
        header(format!("{} AI News Bot - Run Summary", status)),
        json!({
            "type": "section",
            "fields": [
                field("Sites", metrics.total_sites),
                field("Successful", metrics.successful_sites),
                field("Total articles", metrics.total_articles),
                field("Errors", metrics.errors.len()),
            ],
        }),
    ];

    if !metrics.errors.is_empty() {
        let details = metrics.errors.iter().map(|e| format!("• {}", e)).join("\n");
        blocks.push(mrkdwn_section(format!("*Error details:*\n{}", details)));
    }

    blocks.push(context(format!("Run at: {}", run_at)));
    blocks
}

/// Blocks for a fatal error notice.
pub fn error_blocks(message: &str, occurred_at: &str) -> Vec<Value> {
    vec![
        header("❌ AI News Bot - Error".to_string()),
        mrkdwn_section(format!("*An error occurred*\n```{}```", message)),
        context(format!("Occurred at: {}", occurred_at)),
    ]
}
