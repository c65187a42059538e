//! Diagnostic channel
//!
//! Structural anomalies are reported on a side channel that is separate from the
//! returned region tree. Diagnostics are pushed into a [`DiagnosticSink`] at the moment
//! they are detected rather than collected and returned at the end, so a long log shows
//! its problems while it is still being processed.
//!
//! Each diagnostic carries the program name and an absolute line number, which is
//! enough to find the offending text in the log. Messages contain nothing else that
//! could change between runs, so two runs over the same input produce byte-identical
//! diagnostics.
//!
//! ## Sinks
//!
//! - `Vec<Diagnostic>` collects everything, which is what tests and
//!   [`LogLoader::parse`](super::LogLoader::parse) use
//! - [`TracingSink`] logs each diagnostic through `tracing` and forwards it to an inner sink

use super::error::ParseError;
use std::fmt;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Information,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Information => write!(f, "info"),
        }
    }
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    StructuralMismatch,
    UnresolvedBoundary,
    FieldParseFailure,
    FatalPrecondition,
    /// The log ends while a program is still running.
    IncompleteProgram,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::StructuralMismatch => "structural-mismatch",
            DiagnosticKind::UnresolvedBoundary => "unresolved-boundary",
            DiagnosticKind::FieldParseFailure => "field-parse-failure",
            DiagnosticKind::FatalPrecondition => "fatal-precondition",
            DiagnosticKind::IncompleteProgram => "incomplete-program",
        }
    }

    /// Severity used when a diagnostic of this kind is created without an explicit one.
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticKind::StructuralMismatch | DiagnosticKind::FatalPrecondition => {
                Severity::Error
            }
            DiagnosticKind::UnresolvedBoundary
            | DiagnosticKind::FieldParseFailure
            | DiagnosticKind::IncompleteProgram => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One reported anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Name of the program the anomaly was found in.
    pub program: String,
    /// Absolute 1-indexed line number.
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        program: impl Into<String>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: kind.default_severity(),
            kind,
            program: program.into(),
            line,
            message: message.into(),
        }
    }

    pub fn from_error(error: &ParseError, program: impl Into<String>) -> Self {
        Self::new(error.kind(), program, error.line(), error.message())
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}:{}: {}",
            self.severity, self.kind, self.program, self.line, self.message
        )
    }
}

/// Receiver of diagnostics as they occur.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic);
    }
}

/// Sink that logs every diagnostic with `tracing` before handing it on.
#[derive(Debug, Default)]
pub struct TracingSink<S> {
    inner: S,
}

impl<S: DiagnosticSink> TracingSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: DiagnosticSink> DiagnosticSink for TracingSink<S> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        let kind = diagnostic.kind.code();
        let program = diagnostic.program.as_str();
        let line = diagnostic.line;
        match diagnostic.severity {
            Severity::Error => {
                tracing::error!(program, line, kind, "{}", diagnostic.message)
            }
            Severity::Warning => {
                tracing::warn!(program, line, kind, "{}", diagnostic.message)
            }
            Severity::Information => {
                tracing::info!(program, line, kind, "{}", diagnostic.message)
            }
        }
        self.inner.emit(diagnostic);
    }
}
