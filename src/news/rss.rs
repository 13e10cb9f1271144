use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use feed_rs::model::Entry;
use tracing::debug;

use super::{Article, NewsSource};

const SOURCE_LABEL: &str = "HackerOne Hacktivity";
const CATEGORY: &str = "hacktivity";

/// RSS/Atom feed fetched over HTTP
pub struct RssSource {
    client: reqwest::Client,
    feed_url: String,
}

impl RssSource {
    pub fn new(feed_url: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent(concat!("bounty-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, feed_url })
    }

}

#[async_trait]
impl NewsSource for RssSource {
    async fn fetch(&self, limit: usize) -> Result<Vec<Article>> {
        debug!(url = %self.feed_url, "Fetching news feed");

        let body = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .context("Failed to request news feed")?
            .error_for_status()
            .context("News feed returned an error status")?
            .bytes()
            .await
            .context("Failed to read news feed body")?;

        let feed = feed_rs::parser::parse(body.as_ref()).context("Failed to parse news feed")?;

        Ok(feed.entries.iter().take(limit).map(to_article).collect())
    }

    fn name(&self) -> &str {
        "rss"
    }
}

fn to_article(entry: &Entry) -> Article {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let content = entry
        .summary
        .as_ref()
        .map(|s| s.content.clone())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
        .unwrap_or_default();

    let url = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty());

    let published_date = entry
        .published
        .or(entry.updated)
        .unwrap_or_else(chrono::Utc::now)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    Article {
        title,
        content,
        url,
        source: SOURCE_LABEL.to_string(),
        category: CATEGORY.to_string(),
        published_date,
        is_read: false,
        is_favorite: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Hacktivity</title>
    <link>https://hackerone.com/hacktivity</link>
    <description>Disclosed reports</description>
    <item>
      <title>IDOR in billing API</title>
      <link>https://hackerone.com/reports/1001</link>
      <description>Disclosed IDOR</description>
      <pubDate>Tue, 06 Oct 2026 10:30:00 GMT</pubDate>
    </item>
    <item>
      <link>https://hackerone.com/reports/1002</link>
      <description>No title here</description>
    </item>
    <item>
      <title>Linkless advisory</title>
    </item>
  </channel>
</rss>"#;

    async fn serve(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hacktivity.rss"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_fetch_parses_rss() {
        let server = serve(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(RSS),
        )
        .await;
        let source = RssSource::new(format!("{}/hacktivity.rss", server.uri()), 5).unwrap();

        let articles = source.fetch(30).await.expect("Feed should parse");
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].title, "IDOR in billing API");
        assert_eq!(articles[0].url.as_deref(), Some("https://hackerone.com/reports/1001"));
        assert_eq!(articles[0].content, "Disclosed IDOR");
        assert_eq!(articles[0].published_date, "2026-10-06 10:30:00");
        assert_eq!(articles[0].source, "HackerOne Hacktivity");
        assert_eq!(articles[0].category, "hacktivity");
        assert_eq!(articles[1].title, "Untitled");
        assert_eq!(articles[2].url, None);
    }

    #[tokio::test]
    async fn test_fetch_respects_limit() {
        let server = serve(ResponseTemplate::new(200).set_body_string(RSS)).await;
        let source = RssSource::new(format!("{}/hacktivity.rss", server.uri()), 5).unwrap();

        assert_eq!(source.fetch(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let server = serve(ResponseTemplate::new(503)).await;
        let source = RssSource::new(format!("{}/hacktivity.rss", server.uri()), 5).unwrap();

        assert!(source.fetch(30).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_invalid_body() {
        let server = serve(ResponseTemplate::new(200).set_body_string("not a feed")).await;
        let source = RssSource::new(format!("{}/hacktivity.rss", server.uri()), 5).unwrap();

        assert!(source.fetch(30).await.is_err());
    }
}
