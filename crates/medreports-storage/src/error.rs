use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("database error ({status}): {message}")]
    Postgrest {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("database request failed: {0}")]
    Http(String),

    #[error("unexpected database response: {0}")]
    Decode(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage config error: {0}")]
    Config(String),
}

impl StorageError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StorageError::NotFound { what: what.into() }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Http(e.to_string())
    }
}
