use minibuf_schema::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MinibufError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error("Parse error in {file} at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        file:   String,
        line:   usize,
        column: usize,
    },

    #[error("Verifier error: {0}")]
    VerifierError(String),

    #[error("Unknown schema \"{0}\"")]
    UnknownSchema(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),
}
