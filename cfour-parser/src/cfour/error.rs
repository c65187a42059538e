//! Recoverable parsing failures
//!
//! Every failure the engine can detect is one of four kinds. None of them aborts a run:
//! they are raised by the component that detects them and recovered at the nearest
//! region boundary, where they are turned into a [`Diagnostic`](super::Diagnostic).

use super::diagnostics::DiagnosticKind;
use thiserror::Error;

/// A failure tied to one absolute (1-indexed) line of the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Paired markers disagree about identity or role.
    #[error("structural mismatch at line {line}: {message}")]
    StructuralMismatch { line: usize, message: String },

    /// A start marker whose end could not be found in the scanned range.
    #[error("unresolved boundary at line {line}: {message}")]
    UnresolvedBoundary { line: usize, message: String },

    /// A single data line that does not match its grammar.
    #[error("cannot parse line {line}: {message}")]
    FieldParseFailure { line: usize, message: String },

    /// A line an extractor depends on is absent.
    #[error("missing precondition at line {line}: {message}")]
    FatalPrecondition { line: usize, message: String },
}

impl ParseError {
    pub fn mismatch(line: usize, message: impl Into<String>) -> Self {
        ParseError::StructuralMismatch {
            line,
            message: message.into(),
        }
    }

    pub fn unresolved(line: usize, message: impl Into<String>) -> Self {
        ParseError::UnresolvedBoundary {
            line,
            message: message.into(),
        }
    }

    pub fn field(line: usize, message: impl Into<String>) -> Self {
        ParseError::FieldParseFailure {
            line,
            message: message.into(),
        }
    }

    pub fn precondition(line: usize, message: impl Into<String>) -> Self {
        ParseError::FatalPrecondition {
            line,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            ParseError::StructuralMismatch { .. } => DiagnosticKind::StructuralMismatch,
            ParseError::UnresolvedBoundary { .. } => DiagnosticKind::UnresolvedBoundary,
            ParseError::FieldParseFailure { .. } => DiagnosticKind::FieldParseFailure,
            ParseError::FatalPrecondition { .. } => DiagnosticKind::FatalPrecondition,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            ParseError::StructuralMismatch { line, .. }
            | ParseError::UnresolvedBoundary { line, .. }
            | ParseError::FieldParseFailure { line, .. }
            | ParseError::FatalPrecondition { line, .. } => *line,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::StructuralMismatch { message, .. }
            | ParseError::UnresolvedBoundary { message, .. }
            | ParseError::FieldParseFailure { message, .. }
            | ParseError::FatalPrecondition { message, .. } => message,
        }
    }
}
