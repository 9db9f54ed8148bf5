//! Error types for the sift curation engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Server error: status {status}")]
    Server { status: u16 },

    #[error("Inference library error: {0}")]
    Library(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Sort an opaque failure message into the acquisition error taxonomy.
    ///
    /// Provider construction goes through third-party code whose errors
    /// arrive as strings; everything produced locally is already typed.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") || lower.contains("deadline") {
            Error::Timeout(message)
        } else if lower.contains("network")
            || lower.contains("connection")
            || lower.contains("connect")
            || lower.contains("dns")
            || lower.contains("fetch")
        {
            Error::Network(message)
        } else if let Some(status) = extract_status(&lower) {
            Error::Server { status }
        } else {
            Error::Library(message)
        }
    }

    /// Short category name reported to the UI alongside the full message.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Network(_) => "NetworkError",
            Error::Timeout(_) => "TimeoutError",
            Error::Server { .. } => "ServerError",
            Error::Library(_) => "LibraryError",
            Error::InvalidInput(_) => "InvalidInputError",
            Error::Delivery(_) => "DeliveryError",
            Error::Storage(_) => "StorageError",
            Error::Io(_) => "IoError",
            Error::Json(_) => "SerializationError",
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

fn extract_status(message: &str) -> Option<u16> {
    let idx = message.find("status")?;
    message[idx..]
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| s.len() == 3)
        .and_then(|s| s.parse().ok())
        .filter(|s| (100..600).contains(s))
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            Error::Server {
                status: status.as_u16(),
            }
        } else {
            Error::Network(e.to_string())
        }
    }
}

impl From<hf_hub::api::sync::ApiError> for Error {
    fn from(e: hf_hub::api::sync::ApiError) -> Self {
        Error::classify(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_sorts_by_message() {
        assert!(matches!(
            Error::classify("request timed out after 30s"),
            Error::Timeout(_)
        ));
        assert!(matches!(
            Error::classify("connection refused"),
            Error::Network(_)
        ));
        assert!(matches!(
            Error::classify("unexpected status 503 from host"),
            Error::Server { status: 503 }
        ));
        assert!(matches!(
            Error::classify("tokenizer file is corrupt"),
            Error::Library(_)
        ));
    }

    #[test]
    fn categories_are_stable() {
        assert_eq!(Error::Network("x".into()).category(), "NetworkError");
        assert_eq!(Error::Server { status: 500 }.category(), "ServerError");
    }
}
