use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("OAuth error: {0}")]
    OAuth(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Credential store error: {0}")]
    Credential(String),
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
    #[error("Event not found: {0}")]
    EventNotFound(String),
}
