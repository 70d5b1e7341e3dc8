//! Error types for Generar
//!
//! This module defines the error types used throughout the library.
//! Startup validation (grammar construction, template self-tests) is the
//! only fallible surface; generation itself is infallible once a
//! [`Generator`](crate::session::Generator) has been built.

use thiserror::Error;

/// Result type alias for Generar operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during Generar operations
#[derive(Error, Debug)]
pub enum Error {
    /// A grammar table was malformed at construction time
    #[error("grammar error: {0}")]
    Grammar(String),

    /// A recursive-function template failed its startup self-test
    #[error("template self-test failed for `{name}`: {reason}\n--- template source ---\n{source_text}")]
    Template {
        /// Template identifier
        name: &'static str,
        /// Why the self-test failed
        reason: String,
        /// Full template text, attached so the broken template is identifiable
        source_text: String,
    },

    /// Configuration error (bad seed file, bad capability description, ...)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O error (regression-corpus reads, CLI output)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_error_display() {
        let err = Error::Grammar("zero total weight".to_string());
        assert_eq!(format!("{err}"), "grammar error: zero total weight");
    }

    #[test]
    fn test_template_error_carries_source() {
        let err = Error::Template {
            name: "factorial",
            reason: "expected 3628800, got 0".to_string(),
            source_text: "(function factorial(N) { ... })".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("factorial"));
        assert!(msg.contains("template source"));
        assert!(msg.contains("(function factorial(N) { ... })"));
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
