use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScanError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP error: status {0}")]
    HttpError(u16),

    #[error("Parse degraded: {0} malformed link(s) skipped")]
    ParseDegraded(usize),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScanError::Timeout
        } else if err.is_builder() {
            ScanError::InvalidUrl(err.to_string())
        } else if let Some(status) = err.status() {
            ScanError::HttpError(status.as_u16())
        } else {
            // connect, redirect, body and decode failures all mean the page could not be read
            ScanError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<url::ParseError> for ScanError {
    fn from(err: url::ParseError) -> Self {
        ScanError::InvalidUrl(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
