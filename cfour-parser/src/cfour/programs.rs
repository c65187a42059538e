//! Program boundary matching
//!
//! A log is the concatenated output of many independently invoked executables. Each
//! invocation is announced by a begin marker followed by the path of the executable:
//!
//! ```text
//! --invoking executable--
//! /opt/cfour/bin/xvscf
//! ...
//! --executable xvscf finished with status     0 in        0.41 seconds (walltime).
//! ```
//!
//! The matcher pairs begin and end markers like brackets. All markers go on a pending
//! stack in document order. The stack is then popped from the top (the textually latest
//! marker first) into an `active` buffer of ends waiting for their begin:
//!
//! - with an empty buffer, the popped marker is parked in it
//! - an end marker is parked as well, queueing behind the ends already waiting
//! - anything else is taken as the begin that closes the most recently parked marker
//!
//! Pairs are therefore produced latest first; the list is reversed at the end to
//! restore execution order. Every pair is checked for correct roles and equal names;
//! a failed check keeps the region but flags it `ok = false`. Markers still parked
//! after the stack is exhausted belong to programs that never finished and are
//! reported, then dropped.

use super::data::{record, Value};
use super::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
use super::region::{Region, RegionKind};
use super::scanning::{scan, Highlight, MarkerKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// Literal prefix of the line announcing an invocation.
pub const BEGIN_MARKER: &str = "--invoking executable--";

/// Literal prefix of the line reporting an invocation's completion.
pub const END_MARKER: &str = "--executable";

static BOUNDARY_HIGHLIGHTS: Lazy<Vec<Highlight>> = Lazy::new(|| {
    vec![
        Highlight::literal(BEGIN_MARKER, "invocation begin", MarkerKind::Begin),
        Highlight::literal(END_MARKER, "invocation end", MarkerKind::End),
    ]
});

static FINISH_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^--executable (\w+) finished with status\s+(-?\d+) in\s+(\d+\.\d+)").unwrap()
});

/// Name used for a program whose markers carry no readable name.
pub const UNKNOWN_PROGRAM: &str = "unknown";

/// Statistics reported on an end marker line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Finish {
    pub exit_status: i64,
    pub walltime_seconds: f64,
}

/// A begin or end marker with the facts read from it.
#[derive(Debug, Clone, PartialEq)]
struct Boundary {
    line: usize,
    kind: MarkerKind,
    name: Option<String>,
    finish: Option<Finish>,
    ok: bool,
}

impl Boundary {
    fn describe(&self) -> String {
        match &self.name {
            Some(name) => format!("{} marker of `{}`", self.kind, name),
            None => format!("{} marker", self.kind),
        }
    }

    /// The report for a marker whose name or statistics could not be read, filed under
    /// `program`.
    fn unreadable(&self, program: &str) -> Option<Diagnostic> {
        match self.kind {
            MarkerKind::Begin if self.name.is_none() => Some(Diagnostic::new(
                DiagnosticKind::StructuralMismatch,
                program,
                self.line + 1,
                "invocation begin is not followed by an executable name",
            )),
            MarkerKind::End if self.finish.is_none() => Some(Diagnostic::new(
                DiagnosticKind::FieldParseFailure,
                program,
                self.line + 1,
                "cannot read executable name, exit status and wall time from invocation end",
            )),
            _ => None,
        }
    }
}

/// Read the executable name, exit status and wall time from an end marker line.
pub fn parse_finish_line(text: &str) -> Option<(String, Finish)> {
    let caps = FINISH_LINE.captures(text.trim())?;
    let exit_status = caps.get(2)?.as_str().parse().ok()?;
    let walltime_seconds = caps.get(3)?.as_str().parse().ok()?;
    Some((
        caps.get(1)?.as_str().to_string(),
        Finish {
            exit_status,
            walltime_seconds,
        },
    ))
}

/// Executable name announced on the line after a begin marker, without its directory.
fn basename(path: &str) -> &str {
    let path = path.trim().trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}

fn read_boundaries(lines: &[String]) -> Vec<Boundary> {
    scan(lines, &BOUNDARY_HIGHLIGHTS)
        .into_iter()
        .map(|marker| match marker.kind {
            MarkerKind::Begin => {
                let name = lines
                    .get(marker.line + 1)
                    .map(|next| basename(next))
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                Boundary {
                    line: marker.line,
                    kind: MarkerKind::Begin,
                    ok: name.is_some(),
                    name,
                    finish: None,
                }
            }
            _ => match parse_finish_line(&marker.text) {
                Some((name, finish)) => Boundary {
                    line: marker.line,
                    kind: MarkerKind::End,
                    name: Some(name),
                    finish: Some(finish),
                    ok: true,
                },
                None => Boundary {
                    line: marker.line,
                    kind: MarkerKind::End,
                    name: None,
                    finish: None,
                    ok: false,
                },
            },
        })
        .collect()
}

/// Build the program region for one begin/end pair, checking roles and names.
fn pair(
    lines: &[String],
    begin: &Boundary,
    end: &Boundary,
    sink: &mut dyn DiagnosticSink,
) -> Region {
    let name = end
        .name
        .clone()
        .or_else(|| begin.name.clone())
        .unwrap_or_else(|| UNKNOWN_PROGRAM.to_string());
    let mut ok = begin.ok && end.ok;
    for boundary in [begin, end] {
        if let Some(diagnostic) = boundary.unreadable(&name) {
            sink.emit(diagnostic);
        }
    }

    if begin.kind != MarkerKind::Begin || end.kind != MarkerKind::End {
        ok = false;
        sink.emit(Diagnostic::new(
            DiagnosticKind::StructuralMismatch,
            name.as_str(),
            begin.line + 1,
            format!(
                "{} at line {} is paired with {} at line {}",
                begin.describe(),
                begin.line + 1,
                end.describe(),
                end.line + 1
            ),
        ));
    }

    if let (Some(opened), Some(closed)) = (&begin.name, &end.name) {
        if opened != closed {
            ok = false;
            sink.emit(Diagnostic::new(
                DiagnosticKind::StructuralMismatch,
                name.as_str(),
                begin.line + 1,
                format!(
                    "invocation of `{}` at line {} is closed by `{}` at line {}",
                    opened,
                    begin.line + 1,
                    closed,
                    end.line + 1
                ),
            ));
        }
    }

    let mut region = Region::new(
        name,
        RegionKind::Program,
        begin.line + 1,
        lines[begin.line..=end.line].to_vec(),
    );
    if let Some(finish) = end.finish {
        region.merge_data(record([
            ("exit_status", Value::from(finish.exit_status)),
            ("walltime_seconds", Value::from(finish.walltime_seconds)),
        ]));
    }
    if !ok {
        region.mark_failed();
    }
    region
}

/// Partition a whole log into program invocations, in execution order.
///
/// Completed programs are returned even when a consistency check failed (their
/// `metadata.ok` is `false`); programs that never finished are reported as
/// [`DiagnosticKind::IncompleteProgram`] and left out.
pub fn find_programs(lines: &[String], sink: &mut dyn DiagnosticSink) -> Vec<Region> {
    let mut pending = read_boundaries(lines);
    let mut active: Vec<Boundary> = Vec::new();
    let mut programs = Vec::new();

    while let Some(node) = pending.pop() {
        if active.is_empty() || node.kind == MarkerKind::End {
            active.push(node);
            continue;
        }
        if let Some(end) = active.pop() {
            programs.push(pair(lines, &node, &end, sink));
        }
    }

    active.sort_by_key(|boundary| boundary.line);
    for boundary in &active {
        let program = boundary.name.as_deref().unwrap_or(UNKNOWN_PROGRAM);
        if let Some(diagnostic) = boundary.unreadable(program) {
            sink.emit(diagnostic);
        }
        let diagnostic = match boundary.kind {
            MarkerKind::Begin => Diagnostic::new(
                DiagnosticKind::IncompleteProgram,
                program,
                boundary.line + 1,
                format!(
                    "invocation of `{}` at line {} did not finish before the end of the log",
                    program,
                    boundary.line + 1
                ),
            ),
            _ => Diagnostic::new(
                DiagnosticKind::StructuralMismatch,
                program,
                boundary.line + 1,
                format!(
                    "invocation end at line {} has no matching begin",
                    boundary.line + 1
                ),
            ),
        };
        sink.emit(diagnostic);
    }

    programs.reverse();
    tracing::debug!(
        programs = programs.len(),
        unmatched = active.len(),
        "matched program boundaries"
    );
    programs
}

/// Drop completed programs flagged as unreliable, reporting each one.
pub fn retain_completed(programs: Vec<Region>, sink: &mut dyn DiagnosticSink) -> Vec<Region> {
    programs
        .into_iter()
        .filter(|program| {
            if !program.is_ok() {
                sink.emit(
                    Diagnostic::new(
                        DiagnosticKind::StructuralMismatch,
                        program.name.as_str(),
                        program.start,
                        format!(
                            "dropping unreliable invocation at lines {}-{}",
                            program.start, program.end
                        ),
                    )
                    .with_severity(Severity::Information),
                );
            }
            program.is_ok()
        })
        .collect()
}
