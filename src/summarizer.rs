//! Article summarization through an OpenAI-compatible chat API.
//!
//! # Architecture
//!
//! - [`ChatModel`]: core trait for a single system + user prompt completion
//! - [`OpenAiChat`]: [`ChatModel`] over `POST {base}/chat/completions`
//! - [`Summarizer`]: turns articles into summaries on top of any [`ChatModel`]
//! - [`Summarize`]: the batch interface the orchestrator depends on
//!
//! # Failure Policy
//!
//! Summarization never fails outward. When the model call errors, times out
//! or comes back empty, the summary falls back to the first
//! [`FALLBACK_CHARS`] characters of the excerpt plus `...`, or to the title
//! when there is no excerpt. Batches are processed one article at a time
//! with [`ARTICLE_DELAY`] between calls.

use crate::error::{Error, Result};
use crate::models::{Article, SummarizedArticle};
use crate::utils::{truncate_chars, truncate_for_log};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Pause between consecutive model calls in a batch.
pub const ARTICLE_DELAY: Duration = Duration::from_millis(500);
/// Characters of excerpt used when the model gives nothing usable.
pub const FALLBACK_CHARS: usize = 200;
/// Characters of excerpt sent to the model.
const PROMPT_CONTENT_CHARS: usize = 3000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "You are an expert at summarizing AI-related news articles. \
Condense the important information into 3-4 clear lines.";

/// Trait for a single async chat completion.
///
/// Implementors return the model's text; an empty string is a valid
/// (if useless) answer and is handled by the caller.
pub trait ChatModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Batch summarization as seen by the orchestrator.
pub trait Summarize {
    /// Exactly one output per input, in input order.
    async fn summarize_articles(&self, articles: &[Article]) -> Vec<SummarizedArticle>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// [`ChatModel`] backed by an OpenAI-compatible `chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiChat {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl std::fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl ChatModel for OpenAiChat {
    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let t0 = Instant::now();
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: 300,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status { url, status });
        }

        let parsed: ChatResponse = response.json().await?;
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "Chat completion returned");

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Summarize("response contained no message content".to_string()))
    }
}

/// Summarizes articles with a [`ChatModel`], falling back when it fails.
#[derive(Debug, Clone)]
pub struct Summarizer<M> {
    model: M,
    delay: Duration,
}

impl<M: ChatModel> Summarizer<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            delay: ARTICLE_DELAY,
        }
    }

    /// Summarize one article. Never fails; see the module docs for the fallback.
    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(&article.title, 50)))]
    pub async fn summarize_article(&self, article: &Article) -> SummarizedArticle {
        info!("📝 Summarizing");
        let prompt = build_prompt(article);

        let summary = match self.model.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Model returned an empty summary; using fallback");
                fallback_summary(article)
            }
            Err(e) => {
                warn!(error = %e, "⚠️ Summarization failed; using fallback");
                fallback_summary(article)
            }
        };

        SummarizedArticle {
            title: article.title.clone(),
            url: article.url.clone(),
            summary,
        }
    }
}

impl<M: ChatModel> Summarize for Summarizer<M> {
    #[instrument(level = "info", skip_all, fields(count = articles.len()))]
    async fn summarize_articles(&self, articles: &[Article]) -> Vec<SummarizedArticle> {
        info!("📝 Summarizing {} article(s)", articles.len());
        let mut summarized = Vec::with_capacity(articles.len());

        for (i, article) in articles.iter().enumerate() {
            if i > 0 {
                sleep(self.delay).await;
            }
            summarized.push(self.summarize_article(article).await);
        }

        info!("✅ Summarized {} article(s)", summarized.len());
        summarized
    }
}

fn build_prompt(article: &Article) -> String {
    let body = if article.content.is_empty() {
        article.title.as_str()
    } else {
        article.content.as_str()
    };

    format!(
        "Summarize the following AI-related article in 3-4 lines, keeping only the key points.\n\n\
         Title: {}\n\n\
         Body:\n{}",
        article.title,
        truncate_chars(body, PROMPT_CONTENT_CHARS)
    )
}

/// Deterministic summary used when the model gives nothing usable.
pub fn fallback_summary(article: &Article) -> String {
    if article.content.is_empty() {
        article.title.clone()
    } else {
        format!("{}...", truncate_chars(&article.content, FALLBACK_CHARS))
    }
}
