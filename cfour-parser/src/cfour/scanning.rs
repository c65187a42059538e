//! Marker scanning
//!
//! The scanner walks a line sequence once and records every line recognized by one of
//! an ordered list of highlight patterns. Each line is trimmed and matched as an
//! anchored prefix, not as a full line. Patterns are tried in the order given and the
//! first hit wins, so a caller can put the more specific pattern first when two
//! patterns share a prefix.
//!
//! Scanning is a pure function: it never fails and an input without any highlight
//! simply yields no markers.

use regex::Regex;
use std::fmt;

/// Role of a recognized line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// Opens a program invocation.
    Begin,
    /// Closes a program invocation.
    End,
    /// Opens a sub-region inside a program.
    Section,
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerKind::Begin => write!(f, "begin"),
            MarkerKind::End => write!(f, "end"),
            MarkerKind::Section => write!(f, "section"),
        }
    }
}

/// A pattern the scanner looks for, with the label and role it reports.
#[derive(Debug, Clone)]
pub struct Highlight {
    pattern: Regex,
    pub label: String,
    pub kind: MarkerKind,
}

impl Highlight {
    /// Compile `pattern` as an anchored prefix match.
    pub fn new(
        pattern: &str,
        label: impl Into<String>,
        kind: MarkerKind,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&format!("^(?:{pattern})"))?,
            label: label.into(),
            kind,
        })
    }

    /// Highlight for a fixed literal prefix.
    pub fn literal(text: &str, label: impl Into<String>, kind: MarkerKind) -> Self {
        Self {
            pattern: Regex::new(&format!("^{}", regex::escape(text)))
                .expect("escaped literal is a valid pattern"),
            label: label.into(),
            kind,
        }
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    fn capture(&self, text: &str) -> Option<Vec<Option<String>>> {
        self.pattern.captures(text).map(|caps| {
            caps.iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect()
        })
    }
}

/// A recognized line.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Index of the highlight that matched, in the caller's list.
    pub pattern: usize,
    /// 0-indexed position in the scanned line sequence.
    pub line: usize,
    pub label: String,
    pub kind: MarkerKind,
    /// The trimmed line text.
    pub text: String,
    /// Capture groups of the match, group 1 first.
    pub captures: Vec<Option<String>>,
}

impl Marker {
    /// Capture group `index` (1-based, as in the pattern).
    pub fn capture(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.captures.get(i))
            .and_then(|group| group.as_deref())
    }

    /// The same marker with its position moved by `offset` lines towards the start.
    pub fn rebased(&self, offset: usize) -> Marker {
        Marker {
            line: self.line.saturating_sub(offset),
            ..self.clone()
        }
    }
}

/// Scan `lines` for `highlights`, returning the markers in document order.
pub fn scan<S: AsRef<str>>(lines: &[S], highlights: &[Highlight]) -> Vec<Marker> {
    let mut markers = Vec::new();
    for (line, raw) in lines.iter().enumerate() {
        let text = raw.as_ref().trim();
        for (pattern, highlight) in highlights.iter().enumerate() {
            if let Some(captures) = highlight.capture(text) {
                markers.push(Marker {
                    pattern,
                    line,
                    label: highlight.label.clone(),
                    kind: highlight.kind,
                    text: text.to_string(),
                    captures,
                });
                break;
            }
        }
    }
    markers
}
