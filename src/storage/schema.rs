//! Table descriptors, schema initialization and migrations
//!
//! Every entity table is declared once as a [`TableSchema`]. The same
//! descriptor generates the `CREATE TABLE` statement, drives column
//! migrations for databases created by older dashboard builds, and tells the
//! generic accessor which JSON fields map to which columns.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::error::StoreError;
use super::models::ALL_TABLES;

/// Storage class of a column and how JSON input is converted into it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    /// 0/1 integer flag
    Flag,
    /// JSON-serialized list of strings stored as TEXT
    List,
}

impl ColumnKind {
    fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Text | ColumnKind::List => "TEXT",
            ColumnKind::Integer | ColumnKind::Flag => "INTEGER",
            ColumnKind::Real => "REAL",
        }
    }
}

/// Constant default applied when a field is absent on insert
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Text(&'static str),
    Integer(i64),
    Real(f64),
    EmptyList,
}

impl DefaultValue {
    fn sql_literal(self) -> String {
        match self {
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Real(r) => format!("{:?}", r),
            DefaultValue::EmptyList => "'[]'".to_string(),
        }
    }

    pub(super) fn to_sql_value(self) -> rusqlite::types::Value {
        use rusqlite::types::Value;
        match self {
            DefaultValue::Text(s) => Value::Text(s.to_string()),
            DefaultValue::Integer(i) => Value::Integer(i),
            DefaultValue::Real(r) => Value::Real(r),
            DefaultValue::EmptyList => Value::Text("[]".to_string()),
        }
    }
}

/// A user-writable column
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
}

impl ColumnDef {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Text)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Integer)
    }

    pub const fn real(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Real)
    }

    pub const fn flag(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Flag)
    }

    pub const fn list(name: &'static str) -> Self {
        Self {
            default: Some(DefaultValue::EmptyList),
            ..Self::new(name, ColumnKind::List)
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn default(self, value: DefaultValue) -> Self {
        Self {
            default: Some(value),
            ..self
        }
    }

    /// Column definition used in CREATE TABLE
    fn create_definition(&self) -> String {
        let mut def = format!("\"{}\" {}", self.name, self.kind.sql_type());
        if self.required {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = self.default {
            def.push_str(&format!(" DEFAULT {}", default.sql_literal()));
        }
        def
    }

    /// Column definition used in ALTER TABLE ADD COLUMN.
    /// SQLite rejects NOT NULL without a default there, so it is left out.
    fn migration_definition(&self) -> String {
        let mut def = format!("\"{}\" {}", self.name, self.kind.sql_type());
        if let Some(default) = self.default {
            def.push_str(&format!(" DEFAULT {}", default.sql_literal()));
        }
        def
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(StoreError::validation(format!(
                "Invalid direction '{}', expected asc or desc",
                other
            ))),
        }
    }
}

/// Columns every table carries in addition to its own
pub const SYSTEM_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Declarative description of one entity table
#[derive(Debug)]
pub struct TableSchema {
    pub table: &'static str,
    /// Human-readable entity name used in error messages
    pub entity: &'static str,
    pub columns: &'static [ColumnDef],
    pub default_order: &'static [(&'static str, SortDirection)],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether `name` is a sortable/filterable column of this table
    pub fn has_column(&self, name: &str) -> bool {
        SYSTEM_COLUMNS.contains(&name) || self.column(name).is_some()
    }

    pub fn create_table_sql(&self) -> String {
        let mut defs = vec![
            "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
        ];
        defs.extend(self.columns.iter().map(ColumnDef::create_definition));
        defs.push("\"created_at\" TEXT DEFAULT CURRENT_TIMESTAMP".to_string());
        defs.push("\"updated_at\" TEXT DEFAULT CURRENT_TIMESTAMP".to_string());

        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n)",
            self.table,
            defs.join(",\n    ")
        )
    }
}

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    debug!("Initializing database schema");

    rename_legacy_tables(conn)?;

    for schema in ALL_TABLES {
        if !table_exists(conn, schema.table)? {
            info!(table = schema.table, "Creating table");
        }
        conn.execute_batch(&schema.create_table_sql())?;
    }

    run_migrations(conn)?;
    create_indexes(conn);

    debug!(tables = ALL_TABLES.len(), "Database schema initialized");
    Ok(())
}

/// Older builds stored tips in `tips_tricks`
fn rename_legacy_tables(conn: &Connection) -> Result<(), StoreError> {
    if table_exists(conn, "tips_tricks")? && !table_exists(conn, "tips")? {
        info!("Migrating database: renaming tips_tricks to tips");
        conn.execute_batch("ALTER TABLE tips_tricks RENAME TO tips")?;
    }
    Ok(())
}

/// Add any descriptor column missing from an existing table
fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    for schema in ALL_TABLES {
        for column in schema.columns {
            if !column_exists(conn, schema.table, column.name)? {
                info!(
                    table = schema.table,
                    column = column.name,
                    "Migrating database: adding column"
                );
                conn.execute_batch(&format!(
                    "ALTER TABLE \"{}\" ADD COLUMN {}",
                    schema.table,
                    column.migration_definition()
                ))?;
            }
        }

        // Timestamp columns: ADD COLUMN cannot use CURRENT_TIMESTAMP as default
        if !column_exists(conn, schema.table, "created_at")? {
            info!(table = schema.table, "Migrating database: adding created_at column");
            conn.execute_batch(&format!(
                "ALTER TABLE \"{}\" ADD COLUMN \"created_at\" TEXT",
                schema.table
            ))?;
        }
        if !column_exists(conn, schema.table, "updated_at")? {
            info!(table = schema.table, "Migrating database: adding updated_at column");
            conn.execute_batch(&format!(
                "ALTER TABLE \"{0}\" ADD COLUMN \"updated_at\" TEXT;
                 UPDATE \"{0}\" SET \"updated_at\" = \"created_at\" WHERE \"updated_at\" IS NULL;",
                schema.table
            ))?;
        }
    }
    Ok(())
}

fn create_indexes(conn: &Connection) {
    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_bug_reports_created_at ON bug_reports(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_bug_reports_status ON bug_reports(status)",
        "CREATE INDEX IF NOT EXISTS idx_personal_notes_pinned ON personal_notes(is_pinned, created_at)",
        // Deduplicates stored feed articles; NULL urls are allowed to repeat
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_news_articles_url ON news_articles(url)",
    ];

    for sql in statements {
        // Legacy rows may violate the unique index
        if let Err(e) = conn.execute_batch(sql) {
            warn!(error = %e, sql = sql, "Failed to create index");
        }
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, StoreError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, StoreError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info(?1) WHERE name=?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(exists)
}
