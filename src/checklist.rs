//! Import of markdown checklists from a URL

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

use crate::storage::models::SecurityChecklist;
use crate::storage::{Database, Fields, StoreError};

pub const DEFAULT_CHECKLIST_NAME: &str = "Imported Checklist";

/// Outcome of a checklist import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedChecklist {
    pub id: i64,
    pub items: Vec<String>,
}

/// Extract checklist items from a markdown document.
///
/// Task items (`- [ ] step`, `- [x] step`, `* [ ] step`) are preferred. A
/// document without any task item contributes its plain bullet items instead.
pub fn parse_checklist_items(markdown: &str) -> Vec<String> {
    let bullets: Vec<&str> = markdown
        .lines()
        .filter_map(|line| {
            let line = line.trim_start();
            line.strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .or_else(|| line.strip_prefix("+ "))
        })
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();

    let tasks: Vec<String> = bullets
        .iter()
        .filter_map(|item| {
            ["[ ]", "[x]", "[X]"]
                .iter()
                .find_map(|marker| item.strip_prefix(marker))
        })
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if !tasks.is_empty() {
        return tasks;
    }
    bullets.into_iter().map(str::to_string).collect()
}

/// Fetches checklist documents and stores them as security checklists
#[derive(Clone)]
pub struct ChecklistImporter {
    client: reqwest::Client,
}

impl ChecklistImporter {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Download a document and extract its items
    pub async fn fetch_items(&self, url: &str) -> Result<Vec<String>> {
        let body = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to request checklist")?
            .error_for_status()
            .context("Checklist URL returned an error status")?
            .text()
            .await
            .context("Failed to read checklist body")?;

        Ok(parse_checklist_items(&body))
    }

    /// Import the checklist at `url`. A failed download still records the
    /// checklist with its source URL and no items.
    pub async fn import(
        &self,
        db: &Database,
        url: &str,
        name: Option<&str>,
    ) -> Result<ImportedChecklist, StoreError> {
        if url.trim().is_empty() {
            return Err(StoreError::missing_field("url"));
        }

        let items = match self.fetch_items(url).await {
            Ok(items) => items,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to fetch checklist, importing without items");
                Vec::new()
            }
        };

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_CHECKLIST_NAME);

        let fields: Fields = json!({
            "name": name,
            "type": "web",
            "source_url": url,
            "items": items,
        })
        .as_object()
        .cloned()
        .unwrap_or_default();

        let id = db.create::<SecurityChecklist>(&fields)?;
        info!(id = id, url = %url, items = items.len(), "Checklist imported");

        Ok(ImportedChecklist { id, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MARKDOWN: &str = "# Web checklist\n\n\
        Intro paragraph.\n\n\
        - [ ] Check for open redirects\n\
        - [x] Test password reset flow\n\
        * [ ] Review CORS policy\n\
        - plain bullet ignored when tasks exist\n";

    #[test]
    fn test_parse_task_items() {
        assert_eq!(
            parse_checklist_items(MARKDOWN),
            vec![
                "Check for open redirects".to_string(),
                "Test password reset flow".to_string(),
                "Review CORS policy".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_plain_bullets_fallback() {
        let markdown = "## Recon\n- Enumerate subdomains\n  * Check wayback urls\n+ Scan ports\ntext";
        assert_eq!(
            parse_checklist_items(markdown),
            vec![
                "Enumerate subdomains".to_string(),
                "Check wayback urls".to_string(),
                "Scan ports".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parse_checklist_items("").is_empty());
        assert!(parse_checklist_items("# Title only\n\nNo lists.").is_empty());
    }

    #[tokio::test]
    async fn test_import_stores_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/checklist.md"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MARKDOWN))
            .mount(&server)
            .await;

        let db = Database::new(":memory:").unwrap();
        let importer = ChecklistImporter::new(5).unwrap();
        let url = format!("{}/checklist.md", server.uri());

        let imported = importer.import(&db, &url, Some("WSTG")).await.unwrap();
        assert_eq!(imported.items.len(), 3);

        let stored: SecurityChecklist = db.read(imported.id).unwrap();
        assert_eq!(stored.name, "WSTG");
        assert_eq!(stored.checklist_type.as_deref(), Some("web"));
        assert_eq!(stored.source_url.as_deref(), Some(url.as_str()));
        assert_eq!(stored.items, imported.items);
    }

    #[tokio::test]
    async fn test_import_failed_fetch_keeps_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let db = Database::new(":memory:").unwrap();
        let importer = ChecklistImporter::new(5).unwrap();
        let url = format!("{}/missing.md", server.uri());

        let imported = importer.import(&db, &url, None).await.unwrap();
        assert!(imported.items.is_empty());

        let stored: SecurityChecklist = db.read(imported.id).unwrap();
        assert_eq!(stored.name, DEFAULT_CHECKLIST_NAME);
        assert!(stored.items.is_empty());
    }

    #[tokio::test]
    async fn test_import_requires_url() {
        let db = Database::new(":memory:").unwrap();
        let importer = ChecklistImporter::new(5).unwrap();
        assert!(matches!(
            importer.import(&db, "  ", None).await.unwrap_err(),
            StoreError::Validation(_)
        ));
    }
}
