use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the engine and its collaborators.
///
/// Content-quality problems (no keyword hits, thin or noisy text, documents
/// without pages) are never errors; they lower scores instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Document not found at: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("Failed to extract text from {document}: {reason}")]
    Extraction { document: String, reason: String },

    #[error("Invalid knowledge tables: {0}")]
    InvalidKnowledge(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_input_message() {
        let err = Error::MalformedInput("no documents".to_string());
        assert_eq!(err.to_string(), "Malformed input: no documents");
    }

    #[test]
    fn test_document_not_found_shows_path() {
        let err = Error::DocumentNotFound(PathBuf::from("pdfs/a.pdf"));
        assert_eq!(err.to_string(), "Document not found at: pdfs/a.pdf");
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("nope");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
