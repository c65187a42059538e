//! # cfour-parser
//!
//! Recovers the latent structure of a CFOUR output log.
//!
//! A CFOUR run is a sequence of independently invoked executables (xjoda, xvscf, xncc, ...)
//! all writing to one shared text stream. This crate scans that stream, pairs the
//! invocation markers into program regions, splits every program into a tree of named
//! sub-regions, and runs a per-region field extractor over each of them.
//!
//! File Layout
//!
//! src/cfour
//!   ├── scanning      Marker scanner (first matching pattern per line wins)
//!   ├── programs      Invocation begin/end pairing
//!   ├── building      Region tree builder and end-of-region rules
//!   ├── extraction    Extractor trait, registry and shared table helpers
//!   ├── grammars      Program layouts and their field extractors
//!   ├── formats       Provenance, summary and outline rendering
//!   └── testing       Sample logs and region assertions
//!
//! See [pipeline](cfour::pipeline) for the entry point that ties the stages together.

pub mod cfour;
