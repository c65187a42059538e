//! Field extraction
//!
//! Once a region tree is bounded, every region is handed to the [`Extractor`] registered
//! for its [`RegionKind`]. An extractor reads the region's raw lines (and the capture
//! groups of its start marker) and returns the fields it found; the dispatcher merges
//! them into the region. Extractors never touch other regions.
//!
//! ## Failure handling
//!
//! - a line that does not parse is skipped through [`ExtractContext::skip_line`], which
//!   reports a `FieldParseFailure` and lets the extractor carry on with the next line
//! - a shape inconsistency found while extracting is reported with
//!   [`ExtractContext::mismatch`] and flags the region `ok = false` once the extractor
//!   returns, keeping whatever data it produced
//! - an `Err` from the extractor is reported, flags the region, and leaves its data empty
//!
//! None of these affect sibling or parent regions.

pub mod columns;
pub mod convergence;

use super::data::DataMap;
use super::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
use super::error::ParseError;
use super::region::{Region, RegionKind};
use std::collections::HashMap;

/// Per-call state handed to an extractor.
pub struct ExtractContext<'a> {
    program: &'a str,
    sink: &'a mut dyn DiagnosticSink,
    degraded: bool,
    skipped: usize,
}

impl<'a> ExtractContext<'a> {
    pub fn new(program: &'a str, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            program,
            sink,
            degraded: false,
            skipped: 0,
        }
    }

    /// Report an unparsable data line at relative position `rel` of `region`.
    pub fn skip_line(&mut self, region: &Region, rel: usize, message: impl Into<String>) {
        self.skipped += 1;
        self.sink.emit(Diagnostic::new(
            DiagnosticKind::FieldParseFailure,
            self.program,
            region.absolute(rel),
            message,
        ));
    }

    /// Report a shape inconsistency; the region will be flagged `ok = false`.
    pub fn mismatch(&mut self, line: usize, message: impl Into<String>) {
        self.degraded = true;
        self.sink.emit(
            Diagnostic::new(DiagnosticKind::StructuralMismatch, self.program, line, message)
                .with_severity(Severity::Warning),
        );
    }

    /// Report an error without giving up on the region.
    pub fn report(&mut self, error: &ParseError) {
        self.sink.emit(Diagnostic::from_error(error, self.program));
    }

    /// Flag the region `ok = false` without emitting anything.
    pub fn degrade(&mut self) {
        self.degraded = true;
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Number of lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Turns the raw lines of one region kind into data.
pub trait Extractor: Send + Sync {
    fn extract(&self, region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError>;
}

impl<F> Extractor for F
where
    F: Fn(&Region, &mut ExtractContext<'_>) -> Result<DataMap, ParseError> + Send + Sync,
{
    fn extract(&self, region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
        self(region, cx)
    }
}

/// Extractors keyed by the region kind they handle.
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<RegionKind, Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `extractor` for `kind`, replacing any previous one.
    pub fn register<E: Extractor + 'static>(&mut self, kind: RegionKind, extractor: E) {
        self.extractors.insert(kind, Box::new(extractor));
    }

    pub fn get(&self, kind: RegionKind) -> Option<&dyn Extractor> {
        self.extractors.get(&kind).map(|e| e.as_ref())
    }

    pub fn contains(&self, kind: RegionKind) -> bool {
        self.extractors.contains_key(&kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<RegionKind> {
        let mut kinds: Vec<_> = self.extractors.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Run the extractor of `region` and of every descendant, parents first.
    pub fn extract_tree(&self, region: &mut Region, program: &str, sink: &mut dyn DiagnosticSink) {
        self.extract_one(region, program, sink);
        for child in region.sections.iter_mut() {
            self.extract_tree(child, program, sink);
        }
    }

    fn extract_one(&self, region: &mut Region, program: &str, sink: &mut dyn DiagnosticSink) {
        let Some(extractor) = self.get(region.kind) else {
            return;
        };
        let mut cx = ExtractContext::new(program, sink);
        match extractor.extract(region, &mut cx) {
            Ok(data) => {
                let degraded = cx.is_degraded();
                tracing::debug!(
                    program,
                    region = %region.name,
                    fields = data.len(),
                    skipped = cx.skipped(),
                    "extracted fields"
                );
                region.merge_data(data);
                if degraded {
                    region.mark_failed();
                }
            }
            Err(err) => {
                cx.report(&err);
                region.mark_failed();
            }
        }
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfour::data::{record, Value};

    fn region(kind: RegionKind, texts: &[&str]) -> Region {
        Region::new(
            kind.name(),
            kind,
            5,
            texts.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn count_lines(region: &Region, _cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
        Ok(record([("lines", Value::from(region.len()))]))
    }

    fn always_fails(region: &Region, _cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
        Err(ParseError::precondition(region.start, "header missing"))
    }

    fn odd_shape(region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
        cx.mismatch(region.start, "odd shape");
        Ok(record([("partial", Value::from(1_i64))]))
    }

    fn bad_second_row(region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
        cx.skip_line(region, 1, "bad row");
        Ok(DataMap::new())
    }

    #[test]
    fn test_dispatch_by_kind() {
        let mut registry = ExtractorRegistry::new();
        registry.register(RegionKind::Qcomp, count_lines);

        let mut program = region(RegionKind::Program, &["a", "b", "c"]);
        let child = program.slice("qcomp", RegionKind::Qcomp, 1, 2).unwrap();
        program.sections.push(child);

        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        registry.extract_tree(&mut program, "xjoda", &mut diagnostics);
        assert!(program.data.is_empty());
        assert_eq!(program.sections[0].data.get("lines"), Some(&Value::Integer(2)));
        assert!(program.sections[0].is_ok());
    }

    #[test]
    fn test_error_flags_only_that_region() {
        let mut registry = ExtractorRegistry::new();
        registry.register(RegionKind::Qcomp, always_fails);
        registry.register(RegionKind::ScfEnergy, count_lines);

        let mut program = region(RegionKind::Program, &["a", "b", "c"]);
        let failing = program.slice("qcomp", RegionKind::Qcomp, 0, 0).unwrap();
        let fine = program.slice("scf energy", RegionKind::ScfEnergy, 1, 2).unwrap();
        program.sections.extend([failing, fine]);

        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        registry.extract_tree(&mut program, "xjoda", &mut diagnostics);
        assert!(!program.sections[0].is_ok());
        assert!(program.sections[0].data.is_empty());
        assert!(program.sections[1].is_ok());
        assert!(program.is_ok());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::FatalPrecondition);
        assert_eq!(diagnostics[0].line, 5);
    }

    #[test]
    fn test_mismatch_keeps_data_and_degrades() {
        let mut registry = ExtractorRegistry::new();
        registry.register(RegionKind::Qcomp, odd_shape);
        let mut qcomp = region(RegionKind::Qcomp, &["x"]);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        registry.extract_tree(&mut qcomp, "xjoda", &mut diagnostics);
        assert!(!qcomp.is_ok());
        assert_eq!(qcomp.data.len(), 1);
    }

    #[test]
    fn test_skipped_lines_do_not_degrade() {
        let mut registry = ExtractorRegistry::new();
        registry.register(RegionKind::Qcomp, bad_second_row);
        let mut qcomp = region(RegionKind::Qcomp, &["x", "y"]);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        registry.extract_tree(&mut qcomp, "xjoda", &mut diagnostics);
        assert!(qcomp.is_ok());
        assert_eq!(diagnostics[0].line, 6);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::FieldParseFailure);
    }
}
