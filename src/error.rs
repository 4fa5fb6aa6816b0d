use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source error: {message}")]
    Source { message: String },

    #[error("Update store is unreadable: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
