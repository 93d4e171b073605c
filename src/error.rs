use std::result;

use crate::retry::RetryableError;
use thiserror::Error;

/// Error types for fetching, parsing and reporting PubMed papers
#[derive(Error, Debug)]
pub enum PubMedError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The EFetch document could not be parsed
    #[error("XML parsing error: {message}")]
    XmlParseError { message: String },

    /// Invalid PMID format
    #[error("Invalid PMID format: {pmid}")]
    InvalidPmid { pmid: String },

    /// Generic API error with HTTP status code
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// A remote call kept failing with transient errors until the retry budget ran out
    #[error("PubMed unavailable after {attempts} attempts: {source}")]
    UpstreamUnavailable {
        attempts: u32,
        #[source]
        source: Box<PubMedError>,
    },

    /// Search limit exceeded
    /// ESearch cannot page past the first 9,999 results.
    #[error("Search limit exceeded: requested {requested}, maximum is {maximum}")]
    SearchLimitExceeded { requested: usize, maximum: usize },

    /// Writing the CSV report failed
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// IO error for file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = result::Result<T, PubMedError>;

impl RetryableError for PubMedError {
    fn is_retryable(&self) -> bool {
        match self {
            PubMedError::RequestError(err) => {
                if err.is_timeout() || err.is_connect() {
                    return true;
                }

                if let Some(status) = err.status() {
                    return status.is_server_error() || status.as_u16() == 429;
                }

                // DNS failures, dropped connections and truncated bodies
                !err.is_builder() && !err.is_redirect() && !err.is_decode()
            }

            PubMedError::ApiError { status, .. } => (500..600).contains(status) || *status == 429,

            PubMedError::JsonError(_)
            | PubMedError::XmlParseError { .. }
            | PubMedError::InvalidPmid { .. }
            | PubMedError::UpstreamUnavailable { .. }
            | PubMedError::SearchLimitExceeded { .. }
            | PubMedError::CsvError(_)
            | PubMedError::IoError(_) => false,
        }
    }

    fn retry_reason(&self) -> &str {
        if self.is_retryable() {
            match self {
                PubMedError::RequestError(err) if err.is_timeout() => "Request timeout",
                PubMedError::RequestError(err) if err.is_connect() => "Connection error",
                PubMedError::RequestError(_) => "Network error",
                PubMedError::ApiError { status, .. } => match status {
                    429 => "Rate limit exceeded",
                    _ => "Server error",
                },
                _ => "Transient error",
            }
        } else {
            match self {
                PubMedError::JsonError(_) => "Invalid JSON response",
                PubMedError::XmlParseError { .. } => "Invalid XML response",
                PubMedError::InvalidPmid { .. } => "Invalid input",
                PubMedError::ApiError { .. } => "Rejected request",
                PubMedError::UpstreamUnavailable { .. } => "Retries exhausted",
                PubMedError::SearchLimitExceeded { .. } => "Invalid query",
                PubMedError::CsvError(_) | PubMedError::IoError(_) => "File system error",
                PubMedError::RequestError(_) => "Non-transient error",
            }
        }
    }
}
