//! Data models flowing through a run.
//!
//! - [`SiteTarget`]: a site URL and its display name
//! - [`Article`]: a candidate article as collected from a site
//! - [`SummarizedArticle`]: an article paired with its summary
//! - [`SiteOutcome`]: the tagged result of processing one site
//! - [`RunMetrics`]: counters accumulated over the whole run

use crate::sites::site_name;
use chrono::{DateTime, Utc};

/// A site to process, as listed in the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTarget {
    pub url: String,
    /// Display name derived from the URL host.
    pub name: String,
}

impl SiteTarget {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let name = site_name(&url);
        Self { url, name }
    }
}

/// A candidate article collected from a site.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Never empty; collectors drop candidates without a title.
    pub title: String,
    pub url: String,
    /// Excerpt of the body, possibly empty.
    pub content: String,
    /// `None` when the page carried no usable timestamp.
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Whether the article belongs to the window starting at `since`.
    /// Undated articles are always kept.
    pub fn is_recent(&self, since: DateTime<Utc>) -> bool {
        match self.published_at {
            None => true,
            Some(ts) => ts >= since,
        }
    }
}

/// An article with the summary that will be posted for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizedArticle {
    pub title: String,
    pub url: String,
    pub summary: String,
}

/// How processing a single site ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteOutcome {
    /// The digest was posted with this many articles.
    Posted(usize),
    /// Collection succeeded but nothing fell in the recency window.
    NoRecentArticles,
    /// Summarization produced nothing to post.
    NothingToPost,
    /// A stage failed after its retries; the message is the last error.
    Failed(String),
}

/// Counters for one run. Reported once at the end, then dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMetrics {
    pub total_sites: usize,
    pub successful_sites: usize,
    pub total_articles: usize,
    /// `"{site name}: {message}"`, in processing order.
    pub errors: Vec<String>,
}

impl RunMetrics {
    pub fn new(total_sites: usize) -> Self {
        Self {
            total_sites,
            ..Self::default()
        }
    }

    /// Fold one site's outcome into the counters.
    pub fn record(&mut self, site: &SiteTarget, outcome: &SiteOutcome) {
        match outcome {
            SiteOutcome::Posted(count) => {
                self.successful_sites += 1;
                self.total_articles += count;
            }
            SiteOutcome::NoRecentArticles | SiteOutcome::NothingToPost => {
                self.successful_sites += 1;
            }
            SiteOutcome::Failed(message) => {
                self.errors.push(format!("{}: {}", site.name, message));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_site_target_derives_name() {
        let site = SiteTarget::new("https://www.anthropic.com/news");
        assert_eq!(site.name, "Anthropic");
        assert_eq!(site.url, "https://www.anthropic.com/news");
    }

    #[test]
    fn test_is_recent() {
        let now = Utc::now();
        let since = now - Duration::hours(24);
        let mut article = Article {
            title: "Title".to_string(),
            url: "https://example.com/a".to_string(),
            content: String::new(),
            published_at: None,
        };
        assert!(article.is_recent(since));

        article.published_at = Some(now - Duration::hours(2));
        assert!(article.is_recent(since));

        article.published_at = Some(since);
        assert!(article.is_recent(since));

        article.published_at = Some(now - Duration::hours(25));
        assert!(!article.is_recent(since));
    }

    #[test]
    fn test_metrics_distinguish_soft_success_from_failure() {
        let openai = SiteTarget::new("https://openai.com/news");
        let google = SiteTarget::new("https://blog.google/technology/");
        let broken = SiteTarget::new("https://broken.example.com/");

        let mut metrics = RunMetrics::new(3);
        metrics.record(&openai, &SiteOutcome::Posted(4));
        metrics.record(&google, &SiteOutcome::NoRecentArticles);
        metrics.record(&broken, &SiteOutcome::Failed("timeout".to_string()));

        assert_eq!(metrics.total_sites, 3);
        assert_eq!(metrics.successful_sites, 2);
        assert_eq!(metrics.total_articles, 4);
        assert_eq!(metrics.errors, vec!["Example: timeout".to_string()]);
    }
}
