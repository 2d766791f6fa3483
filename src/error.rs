//! Error types for field parsing

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, FieldError>;

/// Errors raised while configuring or reading a [`TextFieldParser`](crate::TextFieldParser)
#[derive(Debug, Error)]
pub enum FieldError {
    /// Delimiters, field widths or comment tokens are unusable for the current mode
    #[error("Invalid parser configuration: {0}")]
    InvalidConfig(String),

    /// A line could not be split under the current configuration.
    ///
    /// The parser stays usable; the next read starts at the following line.
    #[error("Line {line_number} cannot be parsed using the current configuration: {line:?}")]
    MalformedLine {
        /// 1-based physical line number where the offending record starts
        line_number: u64,
        /// Offending text, line terminator stripped
        line: String,
    },

    /// Buffered text grew beyond the hard cap
    #[error("Buffered text exceeds the maximum of {limit} characters")]
    LimitExceeded { limit: usize },

    /// Failure opening a path or archive
    #[error("Read error: {0}")]
    ReadError(String),

    /// Caller passed an argument outside the accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error from the underlying source, passed through unchanged
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FieldError {
    /// Whether the parser can keep reading after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FieldError::MalformedLine { .. })
    }

    /// Whether this error ends the session
    pub(crate) fn is_terminal(&self) -> bool {
        matches!(self, FieldError::LimitExceeded { .. } | FieldError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable() {
        let malformed = FieldError::MalformedLine {
            line_number: 3,
            line: "abc".to_string(),
        };
        assert!(malformed.is_recoverable());
        assert!(!malformed.is_terminal());

        let limit = FieldError::LimitExceeded { limit: 10 };
        assert!(!limit.is_recoverable());
        assert!(limit.is_terminal());

        let config = FieldError::InvalidConfig("empty delimiter".to_string());
        assert!(!config.is_recoverable());
        assert!(!config.is_terminal());
    }

    #[test]
    fn test_display() {
        let err = FieldError::MalformedLine {
            line_number: 7,
            line: "\"open".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Line 7 cannot be parsed using the current configuration: \"\\\"open\""
        );
    }
}
