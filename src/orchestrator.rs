//! Run orchestration.
//!
//! A run moves through these states:
//!
//! ```text
//! Init -> LoadConfig -> FetchSiteList -> PerSiteLoop -> PostSummary -> Done
//!             |              |
//!             +----> Fatal <-+
//! ```
//!
//! - **LoadConfig**: [`RunConfig::from_cli`]; a missing value is fatal and
//!   is not retried.
//! - **FetchSiteList**: [`RetryPolicy::SITE_LIST`]; exhaustion is fatal. An
//!   empty list ends the run early with [`RunReport::NoSites`].
//! - **PerSiteLoop**: sites in list order. Each site yields a
//!   [`SiteOutcome`] folded into [`RunMetrics`]; a failing site never stops
//!   the loop.
//! - **PostSummary**: always attempted once the loop ran; its failure is
//!   only logged.
//!
//! The fatal path ([`report_fatal`]) is driven by the binary.

use crate::cli::Cli;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::models::{RunMetrics, SiteOutcome, SiteTarget};
use crate::notifier::{Notify, SlackNotifier};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::scrapers::{ArticleCollector, WebCollector};
use crate::sites::{SiteSource, SpreadsheetSource};
use crate::summarizer::{OpenAiChat, Summarize, Summarizer};
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Pause after each site that did not fail.
pub const SITE_DELAY: Duration = Duration::from_millis(2000);

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// How a run that did not hit a fatal error ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    /// The site list was empty; nothing was posted.
    NoSites,
    /// Every site was visited and the summary was attempted.
    Completed(RunMetrics),
}

/// The per-run pipeline over its four collaborators.
#[derive(Debug)]
pub struct Pipeline<S, C, M, N> {
    sites: S,
    collector: C,
    summarizer: M,
    notifier: N,
    site_delay: Duration,
}

impl<S, C, M, N> Pipeline<S, C, M, N>
where
    S: SiteSource,
    C: ArticleCollector,
    M: Summarize,
    N: Notify,
{
    pub fn new(sites: S, collector: C, summarizer: M, notifier: N) -> Self {
        Self {
            sites,
            collector,
            summarizer,
            notifier,
            site_delay: SITE_DELAY,
        }
    }

    /// FetchSiteList through PostSummary.
    ///
    /// Returns `Err` only when the site list cannot be fetched.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<RunReport> {
        let sites = &self.sites;
        let urls = retry_with_backoff("fetch site list", RetryPolicy::SITE_LIST, move || {
            sites.fetch_site_urls()
        })
        .await?;

        if urls.is_empty() {
            warn!("⚠️ No site URLs found in spreadsheet");
            return Ok(RunReport::NoSites);
        }

        let targets: Vec<SiteTarget> = urls.into_iter().map(SiteTarget::new).collect();
        info!("📰 Processing {} site(s)", targets.len());

        let mut metrics = RunMetrics::new(targets.len());
        for site in &targets {
            let outcome = self.process_site(site).await;
            metrics.record(site, &outcome);
            if !matches!(outcome, SiteOutcome::Failed(_)) {
                sleep(self.site_delay).await;
            }
        }

        log_summary(&metrics);
        self.notifier.post_summary(&metrics).await;
        Ok(RunReport::Completed(metrics))
    }

    /// Collect, summarize and post one site. Never fails; errors become
    /// [`SiteOutcome::Failed`].
    #[instrument(level = "info", skip_all, fields(site = %site.name, url = %site.url))]
    async fn process_site(&self, site: &SiteTarget) -> SiteOutcome {
        info!("🌐 Processing {}", site.name);

        let collector = &self.collector;
        let url = site.url.as_str();
        let articles = match retry_with_backoff("scrape", RetryPolicy::SCRAPE, move || {
            collector.collect_articles(url)
        })
        .await
        {
            Ok(articles) => articles,
            Err(e) => {
                error!(error = %e, "❌ Failed to process {}", site.name);
                return SiteOutcome::Failed(e.to_string());
            }
        };

        if articles.is_empty() {
            info!("ℹ️ No recent articles found for {}", site.name);
            return SiteOutcome::NoRecentArticles;
        }

        let summarized = self.summarizer.summarize_articles(&articles).await;
        if summarized.is_empty() {
            info!("ℹ️ No articles to post for {}", site.name);
            return SiteOutcome::NothingToPost;
        }

        let notifier = &self.notifier;
        let name = site.name.as_str();
        let batch = summarized.as_slice();
        if let Err(e) = retry_with_backoff("post digest", RetryPolicy::POST, move || {
            notifier.post_digest(name, batch)
        })
        .await
        {
            error!(error = %e, "❌ Failed to process {}", site.name);
            return SiteOutcome::Failed(e.to_string());
        }

        info!("✅ Successfully processed {}", site.name);
        SiteOutcome::Posted(summarized.len())
    }
}

fn log_summary(metrics: &RunMetrics) {
    info!(
        total_sites = metrics.total_sites,
        successful_sites = metrics.successful_sites,
        total_articles = metrics.total_articles,
        errors = metrics.errors.len(),
        "📊 Execution summary"
    );
    for (i, e) in metrics.errors.iter().enumerate() {
        warn!(index = i + 1, error = %e, "Site error");
    }
}

fn http_client() -> Result<Client> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

/// LoadConfig, wire the HTTP adapters, then run the pipeline.
#[instrument(level = "info", skip_all)]
pub async fn run(cli: &Cli) -> Result<RunReport> {
    let config = RunConfig::from_cli(cli)?;
    info!(?config, "✅ Configuration loaded");

    let run_start = Utc::now();
    let since = run_start
        .checked_sub_signed(config.recency_window)
        .ok_or_else(|| Error::InvalidConfig {
            name: "RECENCY_HOURS",
            reason: "window reaches before the earliest representable time".to_string(),
        })?;
    let client = http_client()?;

    let pipeline = Pipeline::new(
        SpreadsheetSource::new(client.clone(), &config.spreadsheet_url),
        WebCollector::new(
            client.clone(),
            config.max_articles_per_site,
            since,
        ),
        Summarizer::new(OpenAiChat::new(
            client.clone(),
            &config.openai_base_url,
            &config.openai_api_key,
            &config.openai_model,
        )),
        SlackNotifier::new(client, &config),
    );
    pipeline.run().await
}

/// Fatal path: reload configuration and post a best-effort error notice.
/// Nothing here can fail the caller.
#[instrument(level = "info", skip_all)]
pub async fn report_fatal(cli: &Cli, fatal: &Error) {
    let config = match RunConfig::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Cannot notify Slack without configuration");
            return;
        }
    };
    let client = match http_client() {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client for error notification");
            return;
        }
    };
    SlackNotifier::new(client, &config)
        .post_error(&fatal.to_string())
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::full_cli;
    use crate::models::{Article, SummarizedArticle};
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// `None` stands for an unreachable spreadsheet.
    struct FakeSites {
        urls: Option<Vec<String>>,
        calls: AtomicUsize,
    }

    impl FakeSites {
        fn ok(urls: &[&str]) -> Self {
            Self {
                urls: Some(urls.iter().map(|u| u.to_string()).collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                urls: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SiteSource for FakeSites {
        async fn fetch_site_urls(&self) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.clone().ok_or_else(|| Error::Status {
                url: "https://sheets.example.com/export.csv".to_string(),
                status: StatusCode::SERVICE_UNAVAILABLE,
            })
        }
    }

    /// Per-URL scripted collection; unknown URLs always fail.
    #[derive(Default)]
    struct FakeCollector {
        articles: HashMap<String, Vec<Article>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeCollector {
        fn with(mut self, url: &str, titles: &[&str]) -> Self {
            let articles = titles
                .iter()
                .map(|t| Article {
                    title: t.to_string(),
                    url: format!("{url}/{t}"),
                    content: format!("{t} body"),
                    published_at: None,
                })
                .collect();
            self.articles.insert(url.to_string(), articles);
            self
        }

        fn calls_for(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    impl ArticleCollector for FakeCollector {
        async fn collect_articles(&self, site_url: &str) -> Result<Vec<Article>> {
            self.calls.lock().unwrap().push(site_url.to_string());
            self.articles
                .get(site_url)
                .cloned()
                .ok_or_else(|| Error::Status {
                    url: site_url.to_string(),
                    status: StatusCode::BAD_GATEWAY,
                })
        }
    }

    #[derive(Default)]
    struct EchoSummarizer {
        batches: Mutex<Vec<usize>>,
        drop_all: bool,
    }

    impl Summarize for EchoSummarizer {
        async fn summarize_articles(&self, articles: &[Article]) -> Vec<SummarizedArticle> {
            self.batches.lock().unwrap().push(articles.len());
            if self.drop_all {
                return Vec::new();
            }
            articles
                .iter()
                .map(|a| SummarizedArticle {
                    title: a.title.clone(),
                    url: a.url.clone(),
                    summary: format!("summary of {}", a.title),
                })
                .collect()
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        digests: Mutex<Vec<(String, Vec<String>)>>,
        digest_attempts: AtomicUsize,
        failing_sites: Vec<String>,
        summaries: Mutex<Vec<RunMetrics>>,
    }

    impl Notify for RecordingNotifier {
        async fn post_digest(&self, site_name: &str, articles: &[SummarizedArticle]) -> Result<()> {
            self.digest_attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing_sites.iter().any(|s| s == site_name) {
                return Err(Error::Slack("rate_limited".to_string()));
            }
            let titles = articles.iter().map(|a| a.title.clone()).collect();
            self.digests.lock().unwrap().push((site_name.to_string(), titles));
            Ok(())
        }

        async fn post_error(&self, _message: &str) {}

        async fn post_summary(&self, metrics: &RunMetrics) {
            self.summaries.lock().unwrap().push(metrics.clone());
        }
    }

    const OPENAI: &str = "https://www.openai.com/news";
    const GOOGLE: &str = "https://blog.google/technology/";
    const BROKEN: &str = "https://broken.example.com/blog";

    fn completed(report: RunReport) -> RunMetrics {
        match report {
            RunReport::Completed(metrics) => metrics,
            RunReport::NoSites => panic!("expected a completed run"),
        }
    }

    #[tokio::test]
    async fn test_missing_config_aborts_before_network() {
        let mut cli = full_cli();
        cli.openai_api_key = None;
        let err = run(&cli).await.unwrap_err();
        assert!(matches!(err, Error::MissingConfig("OPENAI_API_KEY")));
    }

    #[tokio::test]
    async fn test_out_of_range_recency_is_fatal_not_a_panic() {
        let mut cli = full_cli();
        cli.recency_hours = i64::MAX;
        let err = run(&cli).await.unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { name: "RECENCY_HOURS", .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_site_list_posts_nothing() {
        let pipeline = Pipeline::new(
            FakeSites::ok(&[]),
            FakeCollector::default(),
            EchoSummarizer::default(),
            RecordingNotifier::default(),
        );

        let report = pipeline.run().await.unwrap();

        assert_eq!(report, RunReport::NoSites);
        assert!(pipeline.notifier.digests.lock().unwrap().is_empty());
        assert!(pipeline.notifier.summaries.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_site_list_failure_is_fatal_after_retries() {
        let pipeline = Pipeline::new(
            FakeSites::failing(),
            FakeCollector::default(),
            EchoSummarizer::default(),
            RecordingNotifier::default(),
        );

        let start = Instant::now();
        let err = pipeline.run().await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Request to https://sheets.example.com/export.csv failed: 503 Service Unavailable"
        );
        assert_eq!(pipeline.sites.calls.load(Ordering::SeqCst), 4);
        // 2000 + 4000 + 8000
        assert!(start.elapsed() >= Duration::from_millis(14_000));
        assert!(pipeline.notifier.summaries.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_site_is_isolated() {
        let pipeline = Pipeline::new(
            FakeSites::ok(&[OPENAI, BROKEN, GOOGLE]),
            FakeCollector::default()
                .with(OPENAI, &["gpt", "sora"])
                .with(GOOGLE, &["gemini"]),
            EchoSummarizer::default(),
            RecordingNotifier::default(),
        );

        let metrics = completed(pipeline.run().await.unwrap());

        assert_eq!(metrics.total_sites, 3);
        assert_eq!(metrics.successful_sites, 2);
        assert_eq!(metrics.total_articles, 3);
        assert_eq!(metrics.errors.len(), 1);
        assert_eq!(
            metrics.errors[0],
            format!("Example: Request to {BROKEN} failed: 502 Bad Gateway")
        );
        assert_eq!(pipeline.collector.calls_for(BROKEN), 3);

        let digests = pipeline.notifier.digests.lock().unwrap();
        let order: Vec<&str> = digests.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(order, vec!["Openai", "Google"]);
        assert_eq!(digests[0].1, vec!["gpt".to_string(), "sora".to_string()]);

        let summaries = pipeline.notifier.summaries.lock().unwrap();
        assert_eq!(*summaries, vec![metrics.clone()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_recent_articles_is_soft_success() {
        let pipeline = Pipeline::new(
            FakeSites::ok(&[OPENAI]),
            FakeCollector::default().with(OPENAI, &[]),
            EchoSummarizer::default(),
            RecordingNotifier::default(),
        );

        let metrics = completed(pipeline.run().await.unwrap());

        assert_eq!(metrics.successful_sites, 1);
        assert_eq!(metrics.total_articles, 0);
        assert!(metrics.errors.is_empty());
        assert!(pipeline.summarizer.batches.lock().unwrap().is_empty());
        assert_eq!(pipeline.notifier.digest_attempts.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.notifier.summaries.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_summarized_is_soft_success() {
        let pipeline = Pipeline::new(
            FakeSites::ok(&[OPENAI]),
            FakeCollector::default().with(OPENAI, &["gpt"]),
            EchoSummarizer {
                drop_all: true,
                ..EchoSummarizer::default()
            },
            RecordingNotifier::default(),
        );

        let metrics = completed(pipeline.run().await.unwrap());

        assert_eq!(metrics.successful_sites, 1);
        assert_eq!(metrics.total_articles, 0);
        assert_eq!(pipeline.notifier.digest_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_failure_is_recorded_and_loop_continues() {
        let pipeline = Pipeline::new(
            FakeSites::ok(&[OPENAI, GOOGLE]),
            FakeCollector::default()
                .with(OPENAI, &["gpt"])
                .with(GOOGLE, &["gemini", "veo"]),
            EchoSummarizer::default(),
            RecordingNotifier {
                failing_sites: vec!["Openai".to_string()],
                ..RecordingNotifier::default()
            },
        );

        let metrics = completed(pipeline.run().await.unwrap());

        assert_eq!(metrics.successful_sites, 1);
        assert_eq!(metrics.total_articles, 2);
        assert_eq!(
            metrics.errors,
            vec!["Openai: Slack API error: rate_limited".to_string()]
        );
        // 3 attempts for Openai, 1 for Google
        assert_eq!(pipeline.notifier.digest_attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_sites_failing_still_posts_summary() {
        let pipeline = Pipeline::new(
            FakeSites::ok(&[BROKEN, "https://down.example.org/"]),
            FakeCollector::default(),
            EchoSummarizer::default(),
            RecordingNotifier::default(),
        );

        let metrics = completed(pipeline.run().await.unwrap());

        assert_eq!(metrics.successful_sites, 0);
        assert_eq!(metrics.errors.len(), 2);
        assert_eq!(pipeline.notifier.summaries.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_applies_to_successes_only() {
        let ok_pipeline = Pipeline::new(
            FakeSites::ok(&[OPENAI, GOOGLE]),
            FakeCollector::default()
                .with(OPENAI, &["gpt"])
                .with(GOOGLE, &[]),
            EchoSummarizer::default(),
            RecordingNotifier::default(),
        );
        let start = Instant::now();
        ok_pipeline.run().await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(4000));
        assert!(elapsed < Duration::from_millis(4500));

        let failing_pipeline = Pipeline::new(
            FakeSites::ok(&[BROKEN]),
            FakeCollector::default(),
            EchoSummarizer::default(),
            RecordingNotifier::default(),
        );
        let start = Instant::now();
        failing_pipeline.run().await.unwrap();
        let elapsed = start.elapsed();
        // scrape backoff 3000 + 6000, no pacing delay
        assert!(elapsed >= Duration::from_millis(9000));
        assert!(elapsed < Duration::from_millis(9500));
    }
}
