//! Database connection and lifecycle management

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

use super::error::StoreError;
use super::schema::init_schema;

/// SQLite database handle shared across request handlers
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
    sqlite_version: String,
}

impl Database {
    /// Open (or create) the database and bring its schema up to date.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub fn new(db_path: &str) -> Result<Self> {
        info!(path = %db_path, "Initializing database");

        let in_memory = db_path == ":memory:";
        if !in_memory {
            if Path::new(db_path).exists() {
                let (_, size) = Self::file_size(db_path);
                info!(path = %db_path, size = %size, "Found existing database file");
            } else {
                info!(path = %db_path, "Creating new database file");
            }

            if let Some(parent) = Path::new(db_path).parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                info!(directory = %parent.display(), "Creating database directory");
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }

        debug!(path = %db_path, "Opening SQLite connection");
        let conn = Connection::open(db_path)
            .map_err(|e| {
                error!(path = %db_path, error = %e, "Failed to open SQLite database");
                e
            })
            .context("Failed to open SQLite database")?;

        let sqlite_version: String = conn
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .unwrap_or_else(|_| "unknown".to_string());

        init_schema(&conn).context("Failed to initialize database schema")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: db_path.to_string(),
            sqlite_version,
        };

        let (size_bytes, size_human) = db.get_db_size();
        info!(
            path = %db_path,
            size = %size_human,
            size_bytes = size_bytes,
            sqlite_version = %db.sqlite_version,
            "Database initialized successfully"
        );

        Ok(db)
    }

    /// Lock the shared connection for the duration of one store operation
    pub(super) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| {
            error!("SQLite connection mutex poisoned");
            StoreError::Lock
        })
    }

    pub fn sqlite_version(&self) -> &str {
        &self.sqlite_version
    }

    /// Get database file size
    pub fn get_db_size(&self) -> (u64, String) {
        Self::file_size(&self.db_path)
    }

    fn file_size(path: &str) -> (u64, String) {
        match std::fs::metadata(path) {
            Ok(metadata) => {
                let size = metadata.len();
                (size, format_bytes(size))
            }
            Err(_) => (0, "0 B".to_string()),
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            db_path: self.db_path.clone(),
            sqlite_version: self.sqlite_version.clone(),
        }
    }
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
