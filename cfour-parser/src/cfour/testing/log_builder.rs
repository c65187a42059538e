//! Synthetic logs for program pairing tests
//!
//! Only the invocation markers are synthesized; program bodies are passed in verbatim.

use crate::cfour::programs::{BEGIN_MARKER, END_MARKER};

/// Directory the begin marker reports executables in.
const BIN_DIR: &str = "/opt/cfour/bin";

/// Builder for a log made of invocation blocks.
///
/// ```rust,ignore
/// let lines = LogBuilder::new()
///     .line("  CFOUR job started")
///     .finished("alpha", &["  working"], 0, 1.23)
///     .mismatched("gamma", "delta", &[])
///     .lines();
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogBuilder {
    lines: Vec<String>,
}

impl LogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw line.
    pub fn line(mut self, text: &str) -> Self {
        self.lines.push(text.to_string());
        self
    }

    /// Append a begin marker for `name`.
    pub fn begin(mut self, name: &str) -> Self {
        self.lines.push(BEGIN_MARKER.to_string());
        self.lines.push(format!("{}/{}", BIN_DIR, name));
        self
    }

    /// Append an end marker for `name`.
    pub fn end(mut self, name: &str, status: i64, seconds: f64) -> Self {
        self.lines.push(format!(
            "{} {} finished with status {:>6} in {:>12.2} seconds (walltime).",
            END_MARKER, name, status, seconds
        ));
        self
    }

    fn body(mut self, body: &[&str]) -> Self {
        self.lines.extend(body.iter().map(|s| s.to_string()));
        self
    }

    /// A completed invocation returning status 0 after one second.
    pub fn program(self, name: &str, body: &[&str]) -> Self {
        self.finished(name, body, 0, 1.0)
    }

    pub fn finished(self, name: &str, body: &[&str], status: i64, seconds: f64) -> Self {
        self.begin(name).body(body).end(name, status, seconds)
    }

    /// An invocation opened as `opened` whose end marker names `closed`.
    pub fn mismatched(self, opened: &str, closed: &str, body: &[&str]) -> Self {
        self.begin(opened).body(body).end(closed, 0, 1.0)
    }

    /// An invocation that never reports completion.
    pub fn unfinished(self, name: &str, body: &[&str]) -> Self {
        self.begin(name).body(body)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(self) -> Vec<String> {
        self.lines
    }

    pub fn text(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}
