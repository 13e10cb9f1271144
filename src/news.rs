pub mod rss;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

pub use rss::RssSource;

/// Default number of articles returned by the news endpoint
pub const DEFAULT_NEWS_LIMIT: usize = 30;

/// Feed article as served by `/api/news` (not yet stored)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Article {
    pub title: String,
    pub content: String,
    /// Absent for feed entries without a link
    pub url: Option<String>,
    #[schema(example = "HackerOne Hacktivity")]
    pub source: String,
    #[schema(example = "hacktivity")]
    pub category: String,
    #[schema(example = "2026-10-01 12:00:00")]
    pub published_date: String,
    pub is_read: bool,
    pub is_favorite: bool,
}

/// Source of security news articles
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch(&self, limit: usize) -> Result<Vec<Article>>;
    fn name(&self) -> &str;
}

/// News feed that degrades to placeholder articles when its source is
/// missing, failing or empty
#[derive(Clone, Default)]
pub struct NewsFeed {
    source: Option<Arc<dyn NewsSource>>,
}

impl NewsFeed {
    pub fn new(source: Arc<dyn NewsSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// Feed without a live source; always serves placeholders
    pub fn disabled() -> Self {
        Self { source: None }
    }

    pub fn is_live(&self) -> bool {
        self.source.is_some()
    }

    /// Articles from the live source only; empty when it is missing or fails
    pub async fn live(&self, limit: usize) -> Vec<Article> {
        let Some(source) = &self.source else {
            return Vec::new();
        };
        match source.fetch(limit).await {
            Ok(articles) => {
                debug!(source = source.name(), count = articles.len(), "Fetched news articles");
                articles.into_iter().take(limit).collect()
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "Failed to fetch news");
                Vec::new()
            }
        }
    }

    /// Latest articles, at most `limit`
    pub async fn latest(&self, limit: usize) -> Vec<Article> {
        let articles = self.live(limit).await;
        if !articles.is_empty() {
            return articles;
        }

        debug!("No live news available, using placeholders");
        placeholder_articles().into_iter().take(limit).collect()
    }
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Fixed articles shown when no live feed is available
pub fn placeholder_articles() -> Vec<Article> {
    let published_date = now();
    [
        (
            "Critical SQL Injection Found in Popular CMS",
            "Security researchers discovered a critical SQL injection vulnerability affecting thousands of websites...",
            "https://example.com/news/sql-injection",
            "Security News",
            "vulnerabilities",
        ),
        (
            "New Bug Bounty Program Launches with $1M Pool",
            "Tech giant announces comprehensive bug bounty program with record-breaking reward pool...",
            "https://example.com/news/bounty-program",
            "Bug Bounty News",
            "programs",
        ),
        (
            "XSS Vulnerability Discovered in Major Social Platform",
            "Cross-site scripting vulnerability allows attackers to execute malicious code in user browsers...",
            "https://example.com/news/xss-vulnerability",
            "Vulnerability Research",
            "research",
        ),
    ]
    .into_iter()
    .map(|(title, content, url, source, category)| Article {
        title: title.to_string(),
        content: content.to_string(),
        url: Some(url.to_string()),
        source: source.to_string(),
        category: category.to_string(),
        published_date: published_date.clone(),
        is_read: false,
        is_favorite: false,
    })
    .collect()
}
