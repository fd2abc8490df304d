//! Per-site listing profiles.
//!
//! A profile says which links on a site's listing page are articles, where
//! the title lives, and whether article pages are worth opening for an
//! excerpt and a publish date. Sites without a dedicated profile fall back
//! to [`GENERIC`], which takes the anchor text as the title and does not
//! visit article pages.
//!
//! | Host            | Links                         | Title           | Details |
//! |-----------------|-------------------------------|-----------------|---------|
//! | `openai.com`    | `a[href*="/news/"]`           | `h2, h3, h4`    | yes     |
//! | `anthropic.com` | `a[href*="/news/"]`           | `h2, h3, h4`    | yes     |
//! | `blog.google`   | `a[href*="/products/gemini/"]`| `h2, h3, h4`    | yes     |
//! | anything else   | common article/post anchors   | anchor text     | no      |

use crate::models::Article;
use crate::utils::normalize_whitespace;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static NEWS_LINKS: Lazy<Selector> = Lazy::new(|| selector(r#"a[href*="/news/"]"#));
static GEMINI_LINKS: Lazy<Selector> = Lazy::new(|| selector(r#"a[href*="/products/gemini/"]"#));
static GENERIC_LINKS: Lazy<Selector> = Lazy::new(|| {
    selector(r#"article a, .post a, .news-item a, a[href*="/article"], a[href*="/post"]"#)
});
static HEADINGS: Lazy<Selector> = Lazy::new(|| selector("h3, h2, h4"));

/// How to find articles on one kind of site.
#[derive(Debug)]
pub struct SiteProfile {
    pub name: &'static str,
    /// Host suffix this profile applies to; empty for the generic profile.
    host_suffix: &'static str,
    links: &'static Lazy<Selector>,
    /// Element inside the link holding the title; `None` uses the link text.
    title: Option<&'static Lazy<Selector>>,
    /// Open each article page for an excerpt and a publish date.
    pub fetch_details: bool,
}

pub static OPENAI: SiteProfile = SiteProfile {
    name: "openai",
    host_suffix: "openai.com",
    links: &NEWS_LINKS,
    title: Some(&HEADINGS),
    fetch_details: true,
};

pub static ANTHROPIC: SiteProfile = SiteProfile {
    name: "anthropic",
    host_suffix: "anthropic.com",
    links: &NEWS_LINKS,
    title: Some(&HEADINGS),
    fetch_details: true,
};

pub static GOOGLE_BLOG: SiteProfile = SiteProfile {
    name: "google_blog",
    host_suffix: "blog.google",
    links: &GEMINI_LINKS,
    title: Some(&HEADINGS),
    fetch_details: true,
};

pub static GENERIC: SiteProfile = SiteProfile {
    name: "generic",
    host_suffix: "",
    links: &GENERIC_LINKS,
    title: None,
    fetch_details: false,
};

static PROFILES: [&SiteProfile; 3] = [&OPENAI, &ANTHROPIC, &GOOGLE_BLOG];

/// Pick the profile for a site URL by host.
pub fn profile_for(site_url: &Url) -> &'static SiteProfile {
    let host = site_url.host_str().unwrap_or_default();
    PROFILES
        .iter()
        .copied()
        .find(|p| host == p.host_suffix || host.ends_with(&format!(".{}", p.host_suffix)))
        .unwrap_or(&GENERIC)
}

impl SiteProfile {
    /// Extract up to `limit` article candidates from a listing page.
    ///
    /// Links are resolved against `page_url`, links without a title are
    /// dropped, and repeated links keep their first occurrence. Content and
    /// publish date are left empty for the detail pass.
    pub fn extract_candidates(&self, html: &str, page_url: &Url, limit: usize) -> Vec<Article> {
        let document = Html::parse_document(html);

        document
            .select(self.links)
            .filter_map(|link| {
                let href = link.value().attr("href")?;
                let url = page_url.join(href).ok()?;
                let title = self.title_of(link)?;
                Some(Article {
                    title,
                    url: url.to_string(),
                    content: String::new(),
                    published_at: None,
                })
            })
            .unique_by(|a| a.url.clone())
            .take(limit)
            .collect()
    }

    fn title_of(&self, link: ElementRef<'_>) -> Option<String> {
        let raw = match self.title {
            Some(sel) => link.select(sel).next()?.text().collect::<String>(),
            None => link.text().collect::<String>(),
        };
        let title = normalize_whitespace(&raw);
        (!title.is_empty()).then_some(title)
    }
}
