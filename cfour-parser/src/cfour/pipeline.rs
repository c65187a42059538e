//! Processing pipeline
//!
//! Ties the stages together for one log:
//!
//! ```text
//! lines ─► find_programs ─► [retain_completed] ─► per program: build sections ─► extract
//! ```
//!
//! Every stage reports through the same [`DiagnosticSink`], in the order the anomalies
//! are found. No stage aborts the run.

use super::diagnostics::DiagnosticSink;
use super::grammars::GrammarRegistry;
use super::programs::{find_programs, retain_completed};
use super::region::Region;

/// Switches for the optional stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Keep completed programs whose pairing failed a consistency check.
    pub keep_failed: bool,
    /// Build section trees and run extractors; otherwise only program regions are returned.
    pub extract: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            keep_failed: true,
            extract: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct Pipeline {
    grammars: GrammarRegistry,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(grammars: GrammarRegistry, options: PipelineOptions) -> Self {
        Self { grammars, options }
    }

    /// Built-in grammars with default options.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn grammars(&self) -> &GrammarRegistry {
        &self.grammars
    }

    /// Recover the program regions of a whole log, in execution order.
    pub fn run(&self, lines: &[String], sink: &mut dyn DiagnosticSink) -> Vec<Region> {
        let mut programs = find_programs(lines, sink);
        if !self.options.keep_failed {
            programs = retain_completed(programs, sink);
        }

        if self.options.extract {
            for program in programs.iter_mut() {
                self.grammars.process_program(program, sink);
            }
        }

        tracing::debug!(
            lines = lines.len(),
            programs = programs.len(),
            regions = programs.iter().map(Region::count).sum::<usize>(),
            "pipeline finished"
        );
        programs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfour::diagnostics::{Diagnostic, DiagnosticKind};
    use crate::cfour::testing::LogBuilder;

    fn log() -> Vec<String> {
        LogBuilder::new()
            .program("xvcc", &[
                " A miracle has come to pass. The CC iterations have converged.",
                " The reference energy is    -76.02663273 a.u.",
                " The correlation energy is   -0.21366458 a.u.",
                " The total energy is        -76.24029731 a.u.",
            ])
            .mismatched("alpha", "beta", &["noise"])
            .lines()
    }

    #[test]
    fn test_default_pipeline_extracts() {
        let pipeline = Pipeline::with_defaults();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let programs = pipeline.run(&log(), &mut diagnostics);

        assert_eq!(programs.len(), 2);
        let summary = programs[0].child("cc summary").unwrap();
        assert!(summary.data.contains_key("energy"));
        assert!(!programs[1].is_ok());
    }

    #[test]
    fn test_drop_failed_programs() {
        let options = PipelineOptions {
            keep_failed: false,
            ..PipelineOptions::default()
        };
        let pipeline = Pipeline::new(GrammarRegistry::with_defaults(), options);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let programs = pipeline.run(&log(), &mut diagnostics);

        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].name, "xvcc");
        assert!(diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::StructuralMismatch && d.program == "beta"));
    }

    #[test]
    fn test_without_extraction_programs_are_leaves() {
        let options = PipelineOptions {
            extract: false,
            ..PipelineOptions::default()
        };
        let pipeline = Pipeline::new(GrammarRegistry::with_defaults(), options);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let programs = pipeline.run(&log(), &mut diagnostics);

        assert!(programs.iter().all(|p| p.sections.is_empty()));
        assert_eq!(programs[0].data["exit_status"].as_i64(), Some(0));
    }
}
