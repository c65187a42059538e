//! Log loading utilities
//!
//! This module provides [`LogLoader`], which reads a CFOUR log from a file or a string and
//! hands its lines to a [`Pipeline`]. It is used by the command-line tool and by tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use cfour_parser::cfour::loader::LogLoader;
//!
//! // From file
//! let parsed = LogLoader::from_path("water.out")?.parse();
//! for program in &parsed.programs {
//!     println!("{} {}-{}", program.name, program.start, program.end);
//! }
//!
//! // From string, with a custom pipeline
//! let parsed = LogLoader::from_string(text).parse_with(&pipeline);
//! ```

use super::diagnostics::{Diagnostic, TracingSink};
use super::pipeline::Pipeline;
use super::region::Region;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error that can occur when loading logs
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of running a pipeline over one log.
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    /// Program regions in execution order.
    pub programs: Vec<Region>,
    /// Every diagnostic, in the order it was reported.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedLog {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// First program with the given name.
    pub fn program(&self, name: &str) -> Option<&Region> {
        self.programs.iter().find(|program| program.name == name)
    }
}

/// Log loader with pipeline shortcuts
#[derive(Debug, Clone)]
pub struct LogLoader {
    source: String,
}

impl LogLoader {
    /// Load from a file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoaderError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(LogLoader { source })
    }

    /// Load from a string
    pub fn from_string<S: Into<String>>(source: S) -> Self {
        LogLoader {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The log split into lines, without line terminators.
    pub fn lines(&self) -> Vec<String> {
        self.source.lines().map(str::to_string).collect()
    }

    /// Run the built-in grammars over the log.
    pub fn parse(&self) -> ParsedLog {
        self.parse_with(&Pipeline::with_defaults())
    }

    /// Run `pipeline` over the log, collecting its diagnostics.
    ///
    /// Diagnostics are also logged through `tracing` as they occur.
    pub fn parse_with(&self, pipeline: &Pipeline) -> ParsedLog {
        let mut sink = TracingSink::new(Vec::<Diagnostic>::new());
        let programs = pipeline.run(&self.lines(), &mut sink);
        ParsedLog {
            programs,
            diagnostics: sink.into_inner(),
        }
    }
}
