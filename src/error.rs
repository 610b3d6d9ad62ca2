//! Error types for the timeline-downloader application.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // API errors
    #[error("API error: {0}")]
    Api(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Download errors
    #[error("Corrupt content: {0}")]
    CorruptContent(String),

    #[error("Video materialization failed: {0}")]
    Materialize(String),

    #[error("{0} not found. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Operation cancelled")]
    Cancelled,

    // State errors
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    // File system errors
    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(", retry after {} seconds", d.as_secs()),
        None => String::new(),
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// How a failure should be handled by the retry policy and the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Auth or configuration problem: abort the run.
    Fatal,
    /// Network blip or 5xx: retry with backoff.
    RetryableTransient,
    /// Server asked us to slow down: retry with the hinted or exponential delay.
    RateLimited,
    /// 404/403/corrupt payload on one item: record as failed, keep going.
    PermanentItemFailure,
}

impl Error {
    /// Classify this error into the failure taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Config(_)
            | Error::ConfigValidation { .. }
            | Error::MissingConfig(_)
            | Error::Unauthorized(_)
            | Error::Manifest(_)
            | Error::InvalidFilename(_)
            | Error::TomlParse(_) => ErrorClass::Fatal,

            Error::RateLimited { .. } => ErrorClass::RateLimited,

            Error::Transient(_) => ErrorClass::RetryableTransient,
            Error::Http(e) if is_retryable_reqwest_error(e) => ErrorClass::RetryableTransient,

            Error::Api(_)
            | Error::NotFound(_)
            | Error::Forbidden(_)
            | Error::CorruptContent(_)
            | Error::Materialize(_)
            | Error::ToolNotFound(_)
            | Error::Cancelled
            | Error::InvalidTransition(_)
            | Error::Io(_)
            | Error::Http(_)
            | Error::Json(_)
            | Error::UrlParse(_) => ErrorClass::PermanentItemFailure,
        }
    }

    /// Server-provided retry-after hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether the retry policy may try this operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::RetryableTransient | ErrorClass::RateLimited
        )
    }
}

/// Classify a reqwest error as retryable or non-retryable.
///
/// Connect, timeout, request and body errors are retryable. Redirect,
/// builder and decode errors are not.
pub fn is_retryable_reqwest_error(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
}

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const API_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const UNEXPECTED_ERROR: i32 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            Error::Unauthorized("bad key".into()).class(),
            ErrorClass::Fatal
        );
        assert_eq!(
            Error::Transient("HTTP 503".into()).class(),
            ErrorClass::RetryableTransient
        );
        assert_eq!(
            Error::RateLimited { retry_after: None }.class(),
            ErrorClass::RateLimited
        );
        assert_eq!(
            Error::NotFound("gone".into()).class(),
            ErrorClass::PermanentItemFailure
        );
        assert_eq!(
            Error::CorruptContent("empty".into()).class(),
            ErrorClass::PermanentItemFailure
        );
    }

    #[test]
    fn test_retry_after_hint() {
        let err = Error::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
        assert_eq!(Error::Forbidden("x".into()).retry_after(), None);
        assert!(!Error::Forbidden("x".into()).is_retryable());
    }
}
