//! Error types for the step verifier

use thiserror::Error;

/// Result type alias for verifier operations
pub type Result<T> = std::result::Result<T, VerifierError>;

#[derive(Error, Debug)]
pub enum VerifierError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Task \"{task}\" failed after {attempts} attempts: {last_error}")]
    TaskExhausted {
        task: String,
        attempts: u32,
        last_error: Box<VerifierError>,
    },

    #[error("Invalid task at row {row}: {message}")]
    InvalidTask { row: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Result sink error: {0}")]
    Sink(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet read error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Spreadsheet write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}
