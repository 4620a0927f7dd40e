//! Error types for the glue parser

use thiserror::Error;

/// Result type for glue parsing operations
pub type GlueResult<T> = Result<T, GlueError>;

/// Byte range in the markup source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<std::ops::Range<usize>> for TextSpan {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Markup format error. Always fatal to the parse.
#[derive(Debug, Clone, Error)]
pub enum GlueError {
    #[error("Unexpected token at {span:?}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: TextSpan,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Mismatched closing tag at {span:?}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        span: TextSpan,
        expected: String,
        found: String,
    },

    #[error("Invalid syntax at {span:?}: {message}")]
    InvalidSyntax { span: TextSpan, message: String },

    #[error("Lexer error at {span:?}: {message}")]
    LexError { span: TextSpan, message: String },
}

impl GlueError {
    pub fn unexpected_token(span: impl Into<TextSpan>, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            span: span.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            expected: expected.into(),
        }
    }

    pub fn invalid_syntax(span: impl Into<TextSpan>, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            span: span.into(),
            message: message.into(),
        }
    }

    pub fn lex_error(span: impl Into<TextSpan>, message: impl Into<String>) -> Self {
        Self::LexError {
            span: span.into(),
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<TextSpan> {
        match self {
            GlueError::UnexpectedToken { span, .. } => Some(*span),
            GlueError::UnexpectedEof { .. } => None,
            GlueError::MismatchedTag { span, .. } => Some(*span),
            GlueError::InvalidSyntax { span, .. } => Some(*span),
            GlueError::LexError { span, .. } => Some(*span),
        }
    }
}

/// Pretty-print a format error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &GlueError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span().unwrap_or(TextSpan {
        start: source.len().saturating_sub(1),
        end: source.len(),
    });

    let mut output = Vec::new();
    let report = Report::build(ReportKind::Error, filename, span.start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_color(Color::Red)
                .with_message(match error {
                    GlueError::UnexpectedToken { expected, .. } => format!("expected {}", expected),
                    GlueError::UnexpectedEof { expected } => format!("expected {}", expected),
                    GlueError::MismatchedTag { expected, .. } => format!("expected </{}>", expected),
                    GlueError::InvalidSyntax { message, .. } => message.clone(),
                    GlueError::LexError { message, .. } => message.clone(),
                }),
        )
        .finish();

    if report
        .write((filename, Source::from(source)), &mut output)
        .is_err()
    {
        return error.to_string();
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_accessor() {
        let err = GlueError::invalid_syntax(3..7, "bad");
        assert_eq!(err.span(), Some(TextSpan::new(3, 7)));
        assert_eq!(GlueError::unexpected_eof("</a>").span(), None);
    }

    #[cfg(feature = "pretty-errors")]
    #[test]
    fn test_format_error_mentions_message() {
        let source = "<a></b>";
        let err = GlueError::MismatchedTag {
            span: TextSpan::new(3, 6),
            expected: "a".to_string(),
            found: "b".to_string(),
        };
        let rendered = format_error(source, "test.fxml", &err);
        assert!(rendered.contains("Mismatched closing tag"));
    }
}
