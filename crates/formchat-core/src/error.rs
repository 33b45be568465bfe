//! Error types for formchat-core

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The server answered with a non-2xx status. `info` holds the parsed
    /// JSON error body (or the raw text as a JSON string).
    #[error("An error occurred while fetching data (HTTP {status})")]
    Request {
        status: u16,
        info: serde_json::Value,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Invalid form status: {0} (expected 1, 2 or 3)")]
    InvalidStatus(i64),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// HTTP status of a failed request, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Request { status, .. } => Some(*status),
            Error::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Server-provided `detail` message from the error body, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::Request { info, .. } => info.get("detail").and_then(serde_json::Value::as_str),
            _ => None,
        }
    }

    /// The server detail when present, otherwise `fallback`.
    pub fn detail_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.detail().unwrap_or(fallback)
    }
}

/// Result type alias using Error.
pub type Result<T> = std::result::Result<T, Error>;
