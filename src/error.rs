use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl CrmError {
    pub fn validation(message: impl Into<String>) -> Self {
        CrmError::Validation(message.into())
    }

    /// Stable code exposed through GraphQL error extensions.
    pub fn code(&self) -> &'static str {
        match self {
            CrmError::Validation(_) => "VALIDATION",
            _ => "INTERNAL",
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for CrmError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        CrmError::LockPoisoned
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;
