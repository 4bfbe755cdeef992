use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Download failed: {code} {reason}")]
    Status { code: u16, reason: String },

    #[error("Page load failed: {code} {reason}")]
    PageStatus { code: u16, reason: String },

    #[error(
        "Couldn't find the {} link on this page.",
        file_kind(.extension)
    )]
    LinkNotFound { extension: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Refusing to overwrite existing file: {}", .0.display())]
    AlreadyExists(PathBuf),
}

impl FetchError {
    /// Builds a `Status` error from a non-success download response.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        FetchError::Status {
            code: status.as_u16(),
            reason: reason(status),
        }
    }

    /// Builds a `PageStatus` error from a non-success page response.
    pub fn from_page_status(status: reqwest::StatusCode) -> Self {
        FetchError::PageStatus {
            code: status.as_u16(),
            reason: reason(status),
        }
    }
}

fn reason(status: reqwest::StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

/// Short display name for an extension, e.g. `.xlsx` -> `XLSX`
pub fn file_kind(extension: &str) -> String {
    extension.trim_start_matches('.').to_uppercase()
}

pub type Result<T> = std::result::Result<T, FetchError>;
