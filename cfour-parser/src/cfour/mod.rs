//! Main module for cfour-parser library functionality

pub mod building;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod grammars;
pub mod loader;
pub mod pipeline;
pub mod programs;
pub mod region;
pub mod scanning;
pub mod testing;

pub use data::{DataMap, Value};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity, TracingSink};
pub use error::ParseError;
pub use loader::{LogLoader, ParsedLog};
pub use pipeline::{Pipeline, PipelineOptions};
pub use region::{Metadata, Region, RegionKind};
