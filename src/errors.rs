use thiserror::Error;

/// All errors that can occur when talking to a Nira server.
#[derive(Error, Debug)]
pub enum NiraError {
    /// The API key is missing or was rejected (HTTP 401).
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The credentials are valid but lack access to the resource (HTTP 403).
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// The requested record was not found (HTTP 404).
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The request was rate-limited (HTTP 429).
    #[error("rate limited (retry after {retry_after:?}s): {message}")]
    RateLimit {
        message: String,
        retry_after: Option<f64>,
    },

    /// Any other non-success response, with the status code and parsed body.
    #[error("API error {status_code}: {message}")]
    Api {
        status_code: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// A transport-level HTTP error from reqwest.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An I/O error while reading upload files or writing a download.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A response body that did not have the expected JSON shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Arguments rejected before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No Nira account matches the given email address.
    #[error("no user found with email {0}")]
    UserNotFound(String),
}

/// A convenience alias for `Result<T, NiraError>`.
pub type Result<T> = std::result::Result<T, NiraError>;
