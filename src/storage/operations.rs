//! Generic CRUD operations driven by table descriptors

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::debug;

use crate::news::Article;

use super::database::Database;
use super::error::StoreError;
use super::fields::{Fields, filter_value, insert_values, update_values};
use super::models::{Entity, NewsArticle};
use super::schema::{ColumnKind, SortDirection};

/// Ordering, filtering and paging for list queries
#[derive(Debug, Default, Clone)]
pub struct ListParams {
    /// Column to order by; the entity's default order when absent
    pub order_by: Option<String>,
    /// Defaults to descending
    pub direction: Option<SortDirection>,
    /// Equality filters as (column, raw value)
    pub filters: Vec<(String, String)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Timestamp in SQLite's CURRENT_TIMESTAMP format (UTC)
pub(super) fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn read_in<E: Entity>(conn: &Connection, id: i64) -> Result<E, StoreError> {
    let schema = E::SCHEMA;
    conn.query_row(
        &format!("SELECT * FROM \"{}\" WHERE id = ?1", schema.table),
        [id],
        |row| E::from_row(row),
    )
    .optional()?
    .ok_or(StoreError::NotFound {
        entity: schema.entity,
        id,
    })
}

impl Database {
    /// Insert a new record and return its id
    pub fn create<E: Entity>(&self, fields: &Fields) -> Result<i64, StoreError> {
        let schema = E::SCHEMA;
        let mut values = insert_values(schema, fields)?;
        let timestamp = now();
        values.push(("created_at", SqlValue::Text(timestamp.clone())));
        values.push(("updated_at", SqlValue::Text(timestamp)));

        let columns: Vec<String> = values.iter().map(|(name, _)| format!("\"{}\"", name)).collect();
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            schema.table,
            columns.join(", "),
            placeholders.join(", ")
        );

        let conn = self.lock()?;
        conn.execute(&sql, params_from_iter(values.into_iter().map(|(_, v)| v)))?;
        let id = conn.last_insert_rowid();

        debug!(table = schema.table, id = id, "Record created");
        Ok(id)
    }

    /// Fetch a single record by id
    pub fn read<E: Entity>(&self, id: i64) -> Result<E, StoreError> {
        let conn = self.lock()?;
        read_in(&conn, id)
    }

    /// List records; an empty table yields an empty vector
    pub fn list<E: Entity>(&self, params: &ListParams) -> Result<Vec<E>, StoreError> {
        let schema = E::SCHEMA;
        let mut sql = format!("SELECT * FROM \"{}\"", schema.table);
        let mut sql_params: Vec<SqlValue> = Vec::new();

        let mut conditions = Vec::new();
        for (name, raw) in &params.filters {
            let condition = if name == "id" {
                let id = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| StoreError::validation("Field 'id' must be an integer"))?;
                sql_params.push(SqlValue::Integer(id));
                "\"id\" = ?".to_string()
            } else {
                let column = schema.column(name).ok_or_else(|| {
                    StoreError::validation(format!("Unknown filter field: {}", name))
                })?;
                sql_params.push(filter_value(column, raw)?);
                match column.kind {
                    ColumnKind::List => format!("\"{}\" LIKE ? ESCAPE '\\'", column.name),
                    _ => format!("\"{}\" = ?", column.name),
                }
            };
            conditions.push(condition);
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        let mut order: Vec<String> = match &params.order_by {
            Some(column) => {
                if !schema.has_column(column) {
                    return Err(StoreError::validation(format!(
                        "Unknown order_by field: {}",
                        column
                    )));
                }
                let direction = params.direction.unwrap_or(SortDirection::Desc);
                vec![format!("\"{}\" {}", column, direction.as_sql())]
            }
            None => schema
                .default_order
                .iter()
                .map(|(column, direction)| format!("\"{}\" {}", column, direction.as_sql()))
                .collect(),
        };
        // Rows created within the same second keep insertion order
        order.push("\"id\" DESC".to_string());
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));

        if params.limit.is_some() || params.offset.is_some() {
            sql.push_str(" LIMIT ? OFFSET ?");
            sql_params.push(SqlValue::Integer(params.limit.unwrap_or(-1)));
            sql_params.push(SqlValue::Integer(params.offset.unwrap_or(0).max(0)));
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(sql_params), |row| E::from_row(row))?;
        let results: Result<Vec<_>, _> = rows.collect();
        Ok(results?)
    }

    /// Update the supplied fields, refresh `updated_at` and return the new record
    pub fn update<E: Entity>(&self, id: i64, fields: &Fields) -> Result<E, StoreError> {
        let schema = E::SCHEMA;
        let mut values = update_values(schema, fields)?;
        values.push(("updated_at", SqlValue::Text(now())));

        let assignments: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("\"{}\" = ?{}", name, i + 1))
            .collect();
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE id = ?{}",
            schema.table,
            assignments.join(", "),
            values.len() + 1
        );

        let mut sql_params: Vec<SqlValue> = values.into_iter().map(|(_, v)| v).collect();
        sql_params.push(SqlValue::Integer(id));

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let affected = tx.execute(&sql, params_from_iter(sql_params))?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                entity: schema.entity,
                id,
            });
        }
        let record = read_in::<E>(&tx, id)?;
        tx.commit()?;

        debug!(table = schema.table, id = id, "Record updated");
        Ok(record)
    }

    /// Delete a record. Returns whether a row was removed; a missing id is not an error.
    pub fn delete<E: Entity>(&self, id: i64) -> Result<bool, StoreError> {
        let schema = E::SCHEMA;
        let conn = self.lock()?;
        let affected = conn.execute(
            &format!("DELETE FROM \"{}\" WHERE id = ?1", schema.table),
            [id],
        )?;

        debug!(
            table = schema.table,
            id = id,
            deleted = affected > 0,
            "Record delete attempted"
        );
        Ok(affected > 0)
    }

    /// Atomically flip a 0/1 flag column and return the new record
    pub fn toggle<E: Entity>(&self, id: i64, column: &str) -> Result<E, StoreError> {
        let schema = E::SCHEMA;
        let column = schema
            .column(column)
            .filter(|c| c.kind == ColumnKind::Flag)
            .ok_or_else(|| {
                StoreError::validation(format!("Field '{}' cannot be toggled", column))
            })?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let affected = tx.execute(
            &format!(
                "UPDATE \"{0}\" SET \"{1}\" = CASE WHEN \"{1}\" = 1 THEN 0 ELSE 1 END, \"updated_at\" = ?1 WHERE id = ?2",
                schema.table, column.name
            ),
            params![now(), id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                entity: schema.entity,
                id,
            });
        }
        let record = read_in::<E>(&tx, id)?;
        tx.commit()?;

        debug!(table = schema.table, id = id, column = column.name, "Record toggled");
        Ok(record)
    }

    /// Store feed articles, skipping urls already present. Returns the number inserted.
    pub fn insert_news(&self, articles: &[Article]) -> Result<usize, StoreError> {
        let table = NewsArticle::SCHEMA.table;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&format!(
                r#"
                INSERT OR IGNORE INTO "{}" (title, content, url, source, category, published_date, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                "#,
                table
            ))?;
            let timestamp = now();
            for article in articles {
                inserted += stmt.execute(params![
                    article.title,
                    article.content,
                    article.url,
                    article.source,
                    article.category,
                    article.published_date,
                    timestamp,
                ])?;
            }
        }
        tx.commit()?;

        debug!(fetched = articles.len(), inserted = inserted, "News articles stored");
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{BugReport, Note, Platform, ReconCampaign, Tip};
    use serde_json::{Value, json};

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn db() -> Database {
        Database::new(":memory:").expect("Failed to create database")
    }

    #[test]
    fn test_create_and_read() {
        let db = db();
        let id = db
            .create::<BugReport>(&fields(json!({
                "title": "XSS in login",
                "severity": "high",
                "bounty_amount": 500,
                "platform": "HackerOne"
            })))
            .expect("Failed to create");

        let bug: BugReport = db.read(id).expect("Failed to read");
        assert_eq!(bug.id, id);
        assert_eq!(bug.title, "XSS in login");
        assert_eq!(bug.severity.as_deref(), Some("high"));
        assert_eq!(bug.status.as_deref(), Some("draft"));
        assert_eq!(bug.bounty_amount, 500.0);
        assert_eq!(bug.platform.as_deref(), Some("HackerOne"));
        assert!(bug.created_at.is_some());
        assert_eq!(bug.created_at, bug.updated_at);
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let db = db();
        let a = db.create::<Tip>(&fields(json!({"title": "a"}))).unwrap();
        let b = db.create::<Tip>(&fields(json!({"title": "b"}))).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_create_validation_error() {
        let db = db();
        let err = db
            .create::<BugReport>(&fields(json!({"severity": "low"})))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(db.list::<BugReport>(&ListParams::default()).unwrap().is_empty());
    }

    #[test]
    fn test_read_not_found() {
        let db = db();
        let err = db.read::<Platform>(42).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 42, .. }));
    }

    #[test]
    fn test_list_empty() {
        let db = db();
        let notes = db.list::<Note>(&ListParams::default()).expect("Failed to list");
        assert!(notes.is_empty());
    }

    #[test]
    fn test_list_default_order_newest_first() {
        let db = db();
        let first = db.create::<Tip>(&fields(json!({"title": "first"}))).unwrap();
        let second = db.create::<Tip>(&fields(json!({"title": "second"}))).unwrap();

        let tips = db.list::<Tip>(&ListParams::default()).unwrap();
        let ids: Vec<i64> = tips.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_list_notes_pinned_first() {
        let db = db();
        let pinned = db
            .create::<Note>(&fields(json!({"title": "pinned", "is_pinned": true})))
            .unwrap();
        let newer = db.create::<Note>(&fields(json!({"title": "newer"}))).unwrap();

        let notes = db.list::<Note>(&ListParams::default()).unwrap();
        assert_eq!(notes[0].id, pinned);
        assert_eq!(notes[1].id, newer);
    }

    #[test]
    fn test_list_order_by_and_filter() {
        let db = db();
        db.create::<BugReport>(&fields(json!({"title": "a", "bounty_amount": 100, "status": "resolved"})))
            .unwrap();
        db.create::<BugReport>(&fields(json!({"title": "b", "bounty_amount": 900, "status": "resolved"})))
            .unwrap();
        db.create::<BugReport>(&fields(json!({"title": "c", "bounty_amount": 50})))
            .unwrap();

        let params = ListParams {
            order_by: Some("bounty_amount".to_string()),
            direction: Some(SortDirection::Asc),
            filters: vec![("status".to_string(), "resolved".to_string())],
            ..Default::default()
        };
        let bugs = db.list::<BugReport>(&params).unwrap();
        let titles: Vec<&str> = bugs.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn test_list_limit_offset() {
        let db = db();
        for i in 0..5 {
            db.create::<Tip>(&fields(json!({"title": format!("tip {}", i)})))
                .unwrap();
        }
        let params = ListParams {
            limit: Some(2),
            offset: Some(1),
            ..Default::default()
        };
        let tips = db.list::<Tip>(&params).unwrap();
        assert_eq!(tips.len(), 2);
        assert_eq!(tips[0].title, "tip 3");
    }

    #[test]
    fn test_list_filter_by_tag() {
        let db = db();
        db.create::<Note>(&fields(json!({"title": "a", "tags": ["xss", "recon"]})))
            .unwrap();
        db.create::<Note>(&fields(json!({"title": "b", "tags": ["sqli"]})))
            .unwrap();

        let params = ListParams {
            filters: vec![("tags".to_string(), "xss".to_string())],
            ..Default::default()
        };
        let notes = db.list::<Note>(&params).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "a");
        assert_eq!(notes[0].tags, vec!["xss".to_string(), "recon".to_string()]);
    }

    #[test]
    fn test_list_filter_treats_wildcards_literally() {
        let db = db();
        db.create::<Note>(&fields(json!({"title": "a", "tags": ["xss"]})))
            .unwrap();
        db.create::<Note>(&fields(json!({"title": "b", "tags": ["x_s", "100%"]})))
            .unwrap();

        let by_tag = |tag: &str| {
            let params = ListParams {
                filters: vec![("tags".to_string(), tag.to_string())],
                ..Default::default()
            };
            db.list::<Note>(&params)
                .unwrap()
                .into_iter()
                .map(|n| n.title)
                .collect::<Vec<_>>()
        };
        assert_eq!(by_tag("x_s"), vec!["b"]);
        assert_eq!(by_tag("100%"), vec!["b"]);
        assert!(by_tag("%").is_empty());
    }

    #[test]
    fn test_list_rejects_unknown_columns() {
        let db = db();
        let params = ListParams {
            order_by: Some("title; DROP TABLE tips".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            db.list::<Tip>(&params).unwrap_err(),
            StoreError::Validation(_)
        ));

        let params = ListParams {
            filters: vec![("nope".to_string(), "x".to_string())],
            ..Default::default()
        };
        assert!(matches!(
            db.list::<Tip>(&params).unwrap_err(),
            StoreError::Validation(_)
        ));
    }

    #[test]
    fn test_update_partial() {
        let db = db();
        let id = db
            .create::<BugReport>(&fields(json!({"title": "IDOR", "severity": "high"})))
            .unwrap();

        let bug: BugReport = db
            .update(id, &fields(json!({"status": "resolved", "bounty_amount": 250.5})))
            .expect("Failed to update");
        assert_eq!(bug.title, "IDOR");
        assert_eq!(bug.severity.as_deref(), Some("high"));
        assert_eq!(bug.status.as_deref(), Some("resolved"));
        assert_eq!(bug.bounty_amount, 250.5);
        assert!(bug.updated_at.is_some());
    }

    /// Move a record's timestamps into the past so changes are observable
    fn backdate(db: &Database, table: &str, id: i64) {
        db.lock()
            .unwrap()
            .execute(
                &format!(
                    "UPDATE \"{}\" SET created_at = '2000-01-01 00:00:00', updated_at = '2000-01-01 00:00:00' WHERE id = ?1",
                    table
                ),
                [id],
            )
            .unwrap();
    }

    #[test]
    fn test_update_refreshes_updated_at_only() {
        let db = db();
        let id = db.create::<BugReport>(&fields(json!({"title": "SSRF"}))).unwrap();
        backdate(&db, BugReport::SCHEMA.table, id);

        let bug: BugReport = db
            .update(id, &fields(json!({"status": "triaged"})))
            .unwrap();
        assert_eq!(bug.created_at.as_deref(), Some("2000-01-01 00:00:00"));
        assert_ne!(bug.updated_at.as_deref(), Some("2000-01-01 00:00:00"));
        assert!(bug.updated_at.unwrap().as_str() > "2000-01-01 00:00:00");
    }

    #[test]
    fn test_toggle_refreshes_updated_at_only() {
        let db = db();
        let id = db.create::<Note>(&fields(json!({"title": "n"}))).unwrap();
        backdate(&db, Note::SCHEMA.table, id);

        let note: Note = db.toggle(id, "is_pinned").unwrap();
        assert_eq!(note.created_at.as_deref(), Some("2000-01-01 00:00:00"));
        assert!(note.updated_at.unwrap().as_str() > "2000-01-01 00:00:00");
    }

    #[test]
    fn test_update_not_found() {
        let db = db();
        let err = db
            .update::<BugReport>(7, &fields(json!({"status": "x"})))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 7, .. }));
    }

    #[test]
    fn test_update_with_no_known_fields_touches_record() {
        let db = db();
        let id = db.create::<Tip>(&fields(json!({"title": "t"}))).unwrap();
        let tip: Tip = db.update(id, &fields(json!({"unknown": 1}))).unwrap();
        assert_eq!(tip.title, "t");
    }

    #[test]
    fn test_delete_idempotent() {
        let db = db();
        assert!(!db.delete::<Platform>(123).expect("Delete should not fail"));

        let id = db
            .create::<Platform>(&fields(json!({"name": "Bugcrowd"})))
            .unwrap();
        assert!(db.delete::<Platform>(id).unwrap());
        assert!(matches!(
            db.read::<Platform>(id).unwrap_err(),
            StoreError::NotFound { .. }
        ));
        assert!(!db.delete::<Platform>(id).unwrap());
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let db = db();
        let id = db.create::<Note>(&fields(json!({"title": "n"}))).unwrap();

        let note: Note = db.toggle(id, "is_pinned").unwrap();
        assert!(note.is_pinned);
        let note: Note = db.toggle(id, "is_pinned").unwrap();
        assert!(!note.is_pinned);
    }

    #[test]
    fn test_toggle_rejects_non_flag() {
        let db = db();
        let id = db.create::<Note>(&fields(json!({"title": "n"}))).unwrap();
        assert!(matches!(
            db.toggle::<Note>(id, "title").unwrap_err(),
            StoreError::Validation(_)
        ));
    }

    #[test]
    fn test_toggle_not_found() {
        let db = db();
        assert!(matches!(
            db.toggle::<Platform>(5, "is_active").unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[test]
    fn test_campaign_stop_via_update() {
        let db = db();
        let id = db
            .create::<ReconCampaign>(&fields(json!({"target_domain": "example.com", "status": "running"})))
            .unwrap();
        let campaign: ReconCampaign = db
            .update(id, &fields(json!({"status": "stopped", "is_stopped": true})))
            .unwrap();
        assert_eq!(campaign.status.as_deref(), Some("stopped"));
        assert_eq!(campaign.is_stopped, 1);
        assert_eq!(campaign.scope_size.as_deref(), Some("medium"));
    }

    #[test]
    fn test_insert_news_dedupes_by_url() {
        let db = db();
        let article = Article {
            title: "Hacktivity".to_string(),
            content: "summary".to_string(),
            url: Some("https://hackerone.com/reports/1".to_string()),
            source: "HackerOne Hacktivity".to_string(),
            category: "hacktivity".to_string(),
            published_date: "2026-10-01 10:00:00".to_string(),
            is_read: false,
            is_favorite: false,
        };

        assert_eq!(db.insert_news(std::slice::from_ref(&article)).unwrap(), 1);
        assert_eq!(db.insert_news(&[article]).unwrap(), 0);

        let stored = db.list::<NewsArticle>(&ListParams::default()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].is_read, 0);
    }

    #[test]
    fn test_insert_news_keeps_linkless_articles() {
        let db = db();
        let linkless = |title: &str| Article {
            title: title.to_string(),
            content: String::new(),
            url: None,
            source: "HackerOne Hacktivity".to_string(),
            category: "hacktivity".to_string(),
            published_date: "2026-10-01 10:00:00".to_string(),
            is_read: false,
            is_favorite: false,
        };

        assert_eq!(db.insert_news(&[linkless("first")]).unwrap(), 1);
        assert_eq!(db.insert_news(&[linkless("second")]).unwrap(), 1);

        let stored = db.list::<NewsArticle>(&ListParams::default()).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|a| a.url.is_none()));
    }
}
