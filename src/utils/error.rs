// src/utils/error.rs
use thiserror::Error;

/// A single header field could not be located. Never fatal for the record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("label cell containing '{0}' not found")]
    MissingLabel(String),

    #[error("no value cell follows label '{0}'")]
    MissingSibling(String),

    #[error("value cell for '{0}' has no emphasized text")]
    MissingEmphasis(String),

    #[error("no row follows the row labelled '{0}'")]
    MissingNextRow(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Empty HTML document")]
    EmptyDocument,

    #[error("HTML parsing error: {0}")]
    HtmlParseError(String),

    #[error("No usable contract header data found")]
    NoUsableData,

    #[error("Malformed row: {0}")]
    MalformedRow(String),

    #[error("Invalid tier value '{0}'")]
    InvalidTier(String),
}

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found, 500 Internal Server Error

    #[error("Portal rate limit exceeded")]
    RateLimited,

    #[error("All {attempts} attempts failed for {target}")]
    RetriesExhausted { target: String, attempts: u32 },

    #[error("Invalid portal URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Input file not found: {0}")]
    InputMissing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Portal interaction failed: {0}")]
    Portal(#[from] PortalError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}
