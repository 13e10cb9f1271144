//! Conversion of JSON request fields into column values

use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};

use super::error::StoreError;
use super::schema::{ColumnDef, ColumnKind, TableSchema};

/// JSON object fields as received from the API
pub type Fields = Map<String, Value>;

/// Column values for an INSERT.
///
/// Absent columns take their descriptor default; absent required columns fail.
/// Keys that are not user-writable columns are ignored.
pub(super) fn insert_values(
    schema: &TableSchema,
    fields: &Fields,
) -> Result<Vec<(&'static str, SqlValue)>, StoreError> {
    let mut values = Vec::with_capacity(schema.columns.len());

    for column in schema.columns {
        match fields.get(column.name) {
            Some(value) => values.push((column.name, convert(column, value)?)),
            None if column.required => return Err(StoreError::missing_field(column.name)),
            None => {
                if let Some(default) = column.default {
                    values.push((column.name, default.to_sql_value()));
                }
            }
        }
    }

    Ok(values)
}

/// Column values for a partial UPDATE: only columns present in `fields`
pub(super) fn update_values(
    schema: &TableSchema,
    fields: &Fields,
) -> Result<Vec<(&'static str, SqlValue)>, StoreError> {
    schema
        .columns
        .iter()
        .filter_map(|column| {
            fields
                .get(column.name)
                .map(|value| convert(column, value).map(|v| (column.name, v)))
        })
        .collect()
}

/// Escape `LIKE` wildcards for use with `ESCAPE '\'`
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Convert a list filter or equality filter value given as query-string text
pub(super) fn filter_value(column: &ColumnDef, raw: &str) -> Result<SqlValue, StoreError> {
    match column.kind {
        ColumnKind::Text => Ok(SqlValue::Text(raw.to_string())),
        // Matches rows whose list contains the exact item
        ColumnKind::List => Ok(SqlValue::Text(format!(
            "%{}%",
            escape_like(&serde_json::to_string(raw)?)
        ))),
        ColumnKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(SqlValue::Integer)
            .map_err(|_| type_error(column.name, "an integer")),
        ColumnKind::Flag => parse_flag_text(raw)
            .map(SqlValue::Integer)
            .ok_or_else(|| type_error(column.name, "a boolean")),
        ColumnKind::Real => raw
            .trim()
            .parse::<f64>()
            .map(SqlValue::Real)
            .map_err(|_| type_error(column.name, "a number")),
    }
}

fn convert(column: &ColumnDef, value: &Value) -> Result<SqlValue, StoreError> {
    if value.is_null() {
        if column.required {
            return Err(StoreError::missing_field(column.name));
        }
        return Ok(match column.kind {
            ColumnKind::List => SqlValue::Text("[]".to_string()),
            ColumnKind::Flag => SqlValue::Integer(0),
            _ => SqlValue::Null,
        });
    }

    match column.kind {
        ColumnKind::Text => match value {
            Value::String(s) => {
                if column.required && s.trim().is_empty() {
                    Err(StoreError::missing_field(column.name))
                } else {
                    Ok(SqlValue::Text(s.clone()))
                }
            }
            _ => Err(type_error(column.name, "a string")),
        },
        ColumnKind::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(SqlValue::Integer)
                .ok_or_else(|| type_error(column.name, "an integer")),
            Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(SqlValue::Integer)
                .map_err(|_| type_error(column.name, "an integer")),
            _ => Err(type_error(column.name, "an integer")),
        },
        ColumnKind::Real => match value {
            Value::Number(n) => n
                .as_f64()
                .map(SqlValue::Real)
                .ok_or_else(|| type_error(column.name, "a number")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(SqlValue::Real)
                .map_err(|_| type_error(column.name, "a number")),
            _ => Err(type_error(column.name, "a number")),
        },
        ColumnKind::Flag => match value {
            Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
            Value::Number(n) => Ok(SqlValue::Integer(i64::from(
                n.as_f64().is_some_and(|f| f != 0.0),
            ))),
            Value::String(s) => parse_flag_text(s)
                .map(SqlValue::Integer)
                .ok_or_else(|| type_error(column.name, "a boolean")),
            _ => Err(type_error(column.name, "a boolean")),
        },
        ColumnKind::List => {
            let items: Vec<String> = match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s.trim().to_string()),
                        _ => Err(type_error(column.name, "a list of strings")),
                    })
                    .collect::<Result<Vec<_>, _>>()?
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect(),
                Value::String(s) => s
                    .split(',')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect(),
                _ => return Err(type_error(column.name, "a list of strings")),
            };
            Ok(SqlValue::Text(serde_json::to_string(&items)?))
        }
    }
}

fn parse_flag_text(raw: &str) -> Option<i64> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(1),
        "0" | "false" | "no" | "off" => Some(0),
        _ => None,
    }
}

fn type_error(field: &str, expected: &str) -> StoreError {
    StoreError::validation(format!("Field '{}' must be {}", field, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{BugReport, Entity, Note, Platform};
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn lookup<'a>(values: &'a [(&'static str, SqlValue)], name: &str) -> Option<&'a SqlValue> {
        values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    #[test]
    fn test_insert_applies_defaults() {
        let values = insert_values(
            BugReport::SCHEMA,
            &fields(json!({"title": "XSS in login", "severity": "high", "bounty_amount": 500})),
        )
        .unwrap();

        assert_eq!(lookup(&values, "status"), Some(&SqlValue::Text("draft".into())));
        assert_eq!(lookup(&values, "severity"), Some(&SqlValue::Text("high".into())));
        assert_eq!(lookup(&values, "bounty_amount"), Some(&SqlValue::Real(500.0)));
        // No default and not supplied
        assert_eq!(lookup(&values, "target_url"), None);
    }

    #[test]
    fn test_insert_missing_required() {
        let err = insert_values(BugReport::SCHEMA, &fields(json!({"severity": "high"})))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(msg) if msg.contains("title")));
    }

    #[test]
    fn test_insert_blank_required() {
        let err = insert_values(Platform::SCHEMA, &fields(json!({"name": "   "}))).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_insert_null_required() {
        let err = insert_values(Platform::SCHEMA, &fields(json!({"name": null}))).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_insert_ignores_unknown_and_system_fields() {
        let values = insert_values(
            Platform::SCHEMA,
            &fields(json!({"name": "Intigriti", "id": 99, "created_at": "x", "bogus": 1})),
        )
        .unwrap();
        assert!(lookup(&values, "id").is_none());
        assert!(lookup(&values, "created_at").is_none());
        assert!(lookup(&values, "bogus").is_none());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = insert_values(
            BugReport::SCHEMA,
            &fields(json!({"title": "t", "bounty_amount": "lots"})),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Validation(msg) if msg.contains("bounty_amount")));

        let err = insert_values(Platform::SCHEMA, &fields(json!({"name": 42}))).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_flag_conversion() {
        let values =
            insert_values(Note::SCHEMA, &fields(json!({"title": "n", "is_pinned": true})))
                .unwrap();
        assert_eq!(lookup(&values, "is_pinned"), Some(&SqlValue::Integer(1)));

        let values = insert_values(
            Platform::SCHEMA,
            &fields(json!({"name": "p", "is_active": false})),
        )
        .unwrap();
        assert_eq!(lookup(&values, "is_active"), Some(&SqlValue::Integer(0)));
    }

    #[test]
    fn test_list_conversion() {
        let values = insert_values(
            Note::SCHEMA,
            &fields(json!({"title": "n", "tags": ["recon", " xss "]})),
        )
        .unwrap();
        assert_eq!(
            lookup(&values, "tags"),
            Some(&SqlValue::Text(r#"["recon","xss"]"#.into()))
        );

        let values =
            insert_values(Note::SCHEMA, &fields(json!({"title": "n", "tags": "a, b"}))).unwrap();
        assert_eq!(lookup(&values, "tags"), Some(&SqlValue::Text(r#"["a","b"]"#.into())));

        let values = insert_values(Note::SCHEMA, &fields(json!({"title": "n"}))).unwrap();
        assert_eq!(lookup(&values, "tags"), Some(&SqlValue::Text("[]".into())));

        let err = insert_values(Note::SCHEMA, &fields(json!({"title": "n", "tags": [1, 2]})))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_update_values_only_supplied() {
        let values =
            update_values(BugReport::SCHEMA, &fields(json!({"status": "triaged"}))).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], ("status", SqlValue::Text("triaged".into())));
    }

    #[test]
    fn test_update_cannot_clear_required() {
        let err = update_values(BugReport::SCHEMA, &fields(json!({"title": null}))).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_filter_value() {
        let status = BugReport::SCHEMA.column("status").unwrap();
        assert_eq!(
            filter_value(status, "draft").unwrap(),
            SqlValue::Text("draft".into())
        );

        let pinned = Note::SCHEMA.column("is_pinned").unwrap();
        assert_eq!(filter_value(pinned, "true").unwrap(), SqlValue::Integer(1));
        assert!(filter_value(pinned, "maybe").is_err());

        let tags = Note::SCHEMA.column("tags").unwrap();
        assert_eq!(
            filter_value(tags, "xss").unwrap(),
            SqlValue::Text("%\"xss\"%".into())
        );
        assert_eq!(
            filter_value(tags, "50%_off").unwrap(),
            SqlValue::Text("%\"50\\%\\_off\"%".into())
        );
    }
}
