//! Error types surfaced by the reader session

use thiserror::Error;

use crate::engine::EngineError;

/// Why an open attempt did not end with a rendered book.
///
/// None of these are retried. A fresh `select_file` plus
/// `begin_validation_and_render` is needed after any of them.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file format: expected application/epub+zip, got {declared_type:?}")]
    InvalidFormat { declared_type: String },

    #[error("Failed to read file: {0}")]
    ReadFailure(#[from] std::io::Error),

    #[error("Corrupt EPUB: {0}")]
    CorruptFile(#[source] EngineError),

    /// A newer attempt or a teardown started while this one was suspended.
    #[error("Open attempt superseded by a newer request")]
    Superseded,
}

impl SessionError {
    /// Short machine-readable code, used at the JS boundary.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NoFileSelected => "no_file_selected",
            SessionError::InvalidFormat { .. } => "invalid_format",
            SessionError::ReadFailure(_) => "read_failure",
            SessionError::CorruptFile(_) => "corrupt_file",
            SessionError::Superseded => "superseded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_format_message_names_both_types() {
        let err = SessionError::InvalidFormat {
            declared_type: "text/plain".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("application/epub+zip"));
        assert!(msg.contains("text/plain"));
        assert_eq!(err.code(), "invalid_format");
    }

    #[test]
    fn test_read_failure_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: SessionError = io.into();
        assert!(matches!(err, SessionError::ReadFailure(_)));
        assert!(err.to_string().contains("short read"));
    }
}
