//! Structured error types for the quire layout engine.
//!
//! Layout itself never fails: CSS layout always produces *some* result.
//! Errors only come from reading and validating the input document.

use thiserror::Error;

/// The unified error type returned by all public quire API functions.
#[derive(Debug, Error)]
pub enum QuireError {
    /// JSON input failed to parse as a valid quire document.
    #[error("Failed to parse document: {source}{}", format_hint(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
    /// The document parsed but describes something layout cannot accept.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for QuireError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the quire document schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        QuireError::Parse { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_carry_a_hint() {
        let err: QuireError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let message = err.to_string();
        assert!(message.starts_with("Failed to parse document"));
        assert!(message.contains("trailing commas"), "got: {}", message);
    }

    #[test]
    fn invalid_document_message() {
        let err = QuireError::InvalidDocument("column-count must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid document: column-count must be positive"
        );
    }
}
