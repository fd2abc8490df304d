//! Site list retrieval.
//!
//! The list of sites lives in a spreadsheet published as CSV. Only the first
//! column matters: every row whose first cell is an `http://` or `https://`
//! URL becomes a site, in row order. Header rows, notes and blank rows are
//! skipped without complaint.

use crate::error::{Error, Result};
use crate::utils::upcase;
use csv::{ReaderBuilder, Trim};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Provides the ordered list of candidate site URLs for a run.
pub trait SiteSource {
    async fn fetch_site_urls(&self) -> Result<Vec<String>>;
}

/// [`SiteSource`] backed by a CSV export URL.
#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    client: Client,
    csv_url: String,
}

impl SpreadsheetSource {
    pub fn new(client: Client, csv_url: impl Into<String>) -> Self {
        Self {
            client,
            csv_url: csv_url.into(),
        }
    }
}

impl SiteSource for SpreadsheetSource {
    #[instrument(level = "info", skip_all)]
    async fn fetch_site_urls(&self) -> Result<Vec<String>> {
        info!("📊 Fetching site URLs from spreadsheet");
        let response = self
            .client
            .get(&self.csv_url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: self.csv_url.clone(),
                status,
            });
        }

        let body = response.text().await?;
        let urls = parse_site_urls(&body)?;

        info!(count = urls.len(), "✅ Found site URL(s)");
        for (i, url) in urls.iter().enumerate() {
            debug!(index = i + 1, %url, "Site");
        }
        Ok(urls)
    }
}

/// Extract candidate site URLs from CSV text.
pub fn parse_site_urls(csv_text: &str) -> Result<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(csv_text.as_bytes());

    let mut urls = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(first) = record.get(0) else {
            continue;
        };
        if first.starts_with("http://") || first.starts_with("https://") {
            urls.push(first.to_string());
        }
    }
    Ok(urls)
}

/// Derive a display name from a site URL.
///
/// Takes the label just left of the top-level domain and capitalizes it:
/// `https://www.openai.com/news` becomes `Openai`, `https://blog.google/`
/// becomes `Google`. Input that does not parse as a URL with a host is
/// returned unchanged.
pub fn site_name(url: &str) -> String {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(%url, error = %e, "⚠️ Could not parse URL");
            return url.to_string();
        }
    };
    let Some(host) = parsed.host_str() else {
        warn!(%url, "⚠️ URL has no host");
        return url.to_string();
    };

    let host = host.strip_prefix("www.").unwrap_or(host);
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() >= 2 {
        upcase(parts[parts.len() - 2])
    } else {
        host.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_site_name_examples() {
        assert_eq!(site_name("https://www.openai.com/news/x"), "Openai");
        assert_eq!(site_name("https://blog.google/technology/"), "Google");
        assert_eq!(site_name("https://www.anthropic.com/news"), "Anthropic");
        assert_eq!(site_name("http://localhost:8080/feed"), "localhost");
    }

    #[test]
    fn test_site_name_unparsable_is_unchanged() {
        assert_eq!(site_name("not a url"), "not a url");
        assert_eq!(site_name(""), "");
    }

    #[test]
    fn test_parse_site_urls_filters_rows() {
        let csv = "URL,Notes\n\
                   https://openai.com/news,OpenAI\n\
                   ,empty first cell\n\
                   \n\
                   ftp://files.example.com,wrong scheme\n\
                   \x20 http://blog.google/technology/ \x20\n\
                   https://www.anthropic.com/news\n";

        let urls = parse_site_urls(csv).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://openai.com/news".to_string(),
                "http://blog.google/technology/".to_string(),
                "https://www.anthropic.com/news".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_site_urls_quoted_cells() {
        let csv = "\"https://example.com/blog\",\"Example, Inc.\"\n";
        assert_eq!(
            parse_site_urls(csv).unwrap(),
            vec!["https://example.com/blog".to_string()]
        );
    }

    #[test]
    fn test_parse_site_urls_empty() {
        assert!(parse_site_urls("").unwrap().is_empty());
        assert!(parse_site_urls("Header only\n").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_site_urls_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/export.csv"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("https://openai.com/news\nhttps://blog.google/\n"),
            )
            .mount(&server)
            .await;

        let source =
            SpreadsheetSource::new(Client::new(), format!("{}/export.csv", server.uri()));
        let urls = source.fetch_site_urls().await.unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], "https://openai.com/news");
    }

    #[tokio::test]
    async fn test_fetch_site_urls_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let source =
            SpreadsheetSource::new(Client::new(), format!("{}/export.csv", server.uri()));
        let err = source.fetch_site_urls().await.unwrap_err();
        assert!(matches!(err, Error::Status { status, .. } if status.as_u16() == 403));
    }
}
