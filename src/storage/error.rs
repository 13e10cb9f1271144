use thiserror::Error;

/// Errors returned by the storage layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Missing or malformed required field
    #[error("{0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database connection lock poisoned")]
    Lock,
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }

    pub fn missing_field(field: &str) -> Self {
        StoreError::Validation(format!("Missing required field: {}", field))
    }
}
