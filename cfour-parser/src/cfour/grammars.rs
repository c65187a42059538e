//! Program grammars
//!
//! A grammar describes one CFOUR executable: the [`Layout`] of sections its output
//! contains and the extractors for the region kinds that layout produces. The
//! [`GrammarRegistry`] maps program names to layouts and holds every registered
//! extractor, and drives both stages for one program region.

pub mod common;
pub mod xdqcscf;
pub mod xjoda;
pub mod xncc;
pub mod xsim;
pub mod xvcc;
pub mod xvee;
pub mod xvscf;

use super::building::{build_sections, Layout};
use super::diagnostics::DiagnosticSink;
use super::extraction::ExtractorRegistry;
use super::region::Region;
use std::collections::HashMap;

/// Layout and extractors of one executable.
pub trait Grammar {
    /// Executable name as printed in the invocation markers.
    fn program(&self) -> &str;

    fn layout(&self) -> Layout;

    fn register_extractors(&self, extractors: &mut ExtractorRegistry);
}

/// Registry of program grammars
///
/// # Examples
///
/// ```ignore
/// let registry = GrammarRegistry::with_defaults();
/// registry.process_program(&mut program, &mut diagnostics);
/// ```
#[derive(Debug)]
pub struct GrammarRegistry {
    layouts: HashMap<String, Layout>,
    extractors: ExtractorRegistry,
}

impl GrammarRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        GrammarRegistry {
            layouts: HashMap::new(),
            extractors: ExtractorRegistry::new(),
        }
    }

    /// Register a grammar
    ///
    /// A grammar for an already registered program replaces its layout; extractors of
    /// the same region kind are replaced as well.
    pub fn register<G: Grammar>(&mut self, grammar: G) {
        self.layouts
            .insert(grammar.program().to_string(), grammar.layout());
        grammar.register_extractors(&mut self.extractors);
    }

    pub fn layout(&self, program: &str) -> Option<&Layout> {
        self.layouts.get(program)
    }

    pub fn extractors(&self) -> &ExtractorRegistry {
        &self.extractors
    }

    /// Program names with a layout (sorted)
    pub fn programs(&self) -> Vec<String> {
        let mut names: Vec<_> = self.layouts.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the section tree of `program` and extract the fields of every region in it.
    ///
    /// Programs without a layout stay leaf regions.
    pub fn process_program(&self, program: &mut Region, sink: &mut dyn DiagnosticSink) {
        let name = program.name.clone();
        if let Some(layout) = self.layouts.get(&name) {
            build_sections(program, layout, &name, sink);
        }
        self.extractors.extract_tree(program, &name, sink);
    }

    /// Create a registry with the built-in grammars
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(xjoda::XjodaGrammar);
        registry.register(xvscf::XvscfGrammar);
        registry.register(xdqcscf::XdqcscfGrammar);
        registry.register(xncc::XnccGrammar);
        registry.register(xvcc::XvccGrammar);
        registry.register(xvee::XveeGrammar);
        registry.register(xsim::XsimGrammar);

        registry
    }
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
