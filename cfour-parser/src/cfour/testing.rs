//! Testing utilities for region assertions
//!
//!     CFOUR output is column-sensitive and full of near-identical lines. A log typed by
//!     hand into a test is very likely to be slightly off (a missing space before a
//!     column, a delimiter one dash short), and a test against such a log tunes the
//!     grammars to text CFOUR never prints. Tests therefore follow two rules:
//!
//!         1. Whole logs come from the curated sample files (via [samples])
//!         2. Region trees are checked with the fluent assertions (via [assert_region])
//!
//!     Small synthetic logs that only exercise program pairing are built with
//!     [LogBuilder], which writes the begin and end markers exactly as CFOUR does.
//!
//! Usage
//!
//!     ```rust,ignore
//!     use cfour_parser::cfour::testing::{assert_region, samples};
//!
//!     let parsed = samples::xvscf().parse();
//!     assert_region(&parsed.programs[0])
//!         .name("xvscf")
//!         .ok()
//!         .child_named("molecular orbitals", |mo| {
//!             mo.data_len(&["occupied"], 5).data_len(&["virtual"], 2);
//!         });
//!     ```

pub mod log_builder;
pub mod region_assertions;
pub mod samples;

pub use log_builder::LogBuilder;
pub use region_assertions::{assert_programs, assert_region, ProgramsAssertion, RegionAssertion};
