//! Article collection from the listed sites.
//!
//! Collection is a two-phase pass per site:
//!
//! 1. **Listing**: fetch the site URL and pick article links using the
//!    site's [`profiles::SiteProfile`]
//! 2. **Details**: for profiles that ask for it, open each article page for
//!    an excerpt and a publish date ([`article::parse_details`])
//!
//! Candidates are then filtered to the recency window. A failed listing
//! fetch is an error for the caller's retry policy; a failed detail fetch
//! only costs that article its excerpt and date.

pub mod article;
pub mod profiles;

use crate::error::{Error, Result};
use crate::models::Article;
use chrono::{DateTime, Utc};
use profiles::SiteProfile;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const LISTING_TIMEOUT: Duration = Duration::from_secs(60);
const ARTICLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns recency-filtered candidate articles for a site.
pub trait ArticleCollector {
    async fn collect_articles(&self, site_url: &str) -> Result<Vec<Article>>;
}

/// [`ArticleCollector`] that scrapes static HTML over HTTP.
#[derive(Debug, Clone)]
pub struct WebCollector {
    client: Client,
    max_articles: usize,
    /// Start of the recency window, fixed at run start.
    since: DateTime<Utc>,
    /// Use this profile for every site instead of choosing by host.
    profile: Option<&'static SiteProfile>,
}

impl WebCollector {
    pub fn new(client: Client, max_articles: usize, since: DateTime<Utc>) -> Self {
        Self {
            client,
            max_articles,
            since,
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: &'static SiteProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    async fn fetch_html(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.text().await?)
    }
}

impl ArticleCollector for WebCollector {
    #[instrument(level = "info", skip(self))]
    async fn collect_articles(&self, site_url: &str) -> Result<Vec<Article>> {
        info!("🔍 Scraping articles");
        let page_url = Url::parse(site_url)?;
        let profile = self.profile.unwrap_or_else(|| profiles::profile_for(&page_url));

        let html = self.fetch_html(site_url, LISTING_TIMEOUT).await?;
        let mut articles = profile.extract_candidates(&html, &page_url, self.max_articles);
        debug!(profile = profile.name, candidates = articles.len(), "Extracted candidates");

        if profile.fetch_details {
            for article in articles.iter_mut() {
                match self.fetch_html(&article.url, ARTICLE_TIMEOUT).await {
                    Ok(body) => {
                        let details = article::parse_details(&body);
                        article.content = details.content;
                        article.published_at = details.published_at;
                    }
                    Err(e) => {
                        warn!(url = %article.url, error = %e, "⚠️ Could not fetch details");
                    }
                }
            }
        }

        let found = articles.len();
        let recent = filter_recent(articles, self.since);
        info!(found, recent = recent.len(), "✅ Collected articles");
        Ok(recent)
    }
}

/// Keep undated articles and those published at or after `since`.
pub fn filter_recent(articles: Vec<Article>, since: DateTime<Utc>) -> Vec<Article> {
    articles.into_iter().filter(|a| a.is_recent(since)).collect()
}
