//! Article page parsing: body excerpt and publish date.

use crate::utils::normalize_whitespace;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static PARAGRAPHS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article p, main p, .content p").expect("valid selector"));
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").expect("valid selector"));

/// Paragraphs kept for the excerpt.
const EXCERPT_PARAGRAPHS: usize = 3;

/// What an article page contributes to an [`crate::models::Article`].
#[derive(Debug, Default, PartialEq)]
pub struct ArticleDetails {
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Parse the first few body paragraphs and the first `<time datetime>`.
pub fn parse_details(html: &str) -> ArticleDetails {
    let document = Html::parse_document(html);

    let content = document
        .select(&PARAGRAPHS)
        .map(|p| normalize_whitespace(&p.text().collect::<String>()))
        .filter(|p| !p.is_empty())
        .take(EXCERPT_PARAGRAPHS)
        .collect::<Vec<_>>()
        .join("\n\n");

    let published_at = document
        .select(&TIME)
        .next()
        .and_then(|t| t.value().attr("datetime"))
        .and_then(parse_timestamp);

    ArticleDetails {
        content,
        published_at,
    }
}

/// Parse the timestamp formats seen in `datetime` attributes. Values without
/// an offset are taken as UTC; bare dates as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
