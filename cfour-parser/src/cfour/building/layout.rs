//! Section layouts
//!
//! A [`Layout`] is the ordered list of sub-region rules for one program (or for the
//! inside of one region). Rule order is the scanner's priority order.

use super::end_rules::EndRule;
use crate::cfour::region::RegionKind;
use crate::cfour::scanning::{Highlight, MarkerKind};

/// How to recognize and bound one kind of sub-region.
#[derive(Debug, Clone)]
pub struct SectionRule {
    pub name: String,
    pub kind: RegionKind,
    /// Anchored prefix pattern matched against trimmed lines.
    pub pattern: String,
    /// Lines above the start marker that belong to the region.
    pub lead: usize,
    pub end_rule: EndRule,
    /// Rules applied to the lines of each region built by this rule.
    pub children: Layout,
}

impl SectionRule {
    pub fn new(kind: RegionKind, pattern: impl Into<String>, end_rule: EndRule) -> Self {
        Self {
            name: kind.name().to_string(),
            kind,
            pattern: pattern.into(),
            lead: 0,
            end_rule,
            children: Layout::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_lead(mut self, lead: usize) -> Self {
        self.lead = lead;
        self
    }

    pub fn with_children(mut self, children: Layout) -> Self {
        self.children = children;
        self
    }
}

/// Ordered rules plus their compiled highlights.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    rules: Vec<SectionRule>,
    highlights: Vec<Highlight>,
}

impl Layout {
    /// Compile the start patterns of `rules`; highlight `i` belongs to rule `i`.
    pub fn new(rules: Vec<SectionRule>) -> Result<Self, regex::Error> {
        let highlights = rules
            .iter()
            .map(|rule| Highlight::new(&rule.pattern, rule.name.clone(), MarkerKind::Section))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules, highlights })
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn rule(&self, index: usize) -> Option<&SectionRule> {
        self.rules.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Region kinds this layout can produce, nested layouts included.
    pub fn kinds(&self) -> Vec<RegionKind> {
        let mut kinds = Vec::new();
        for rule in &self.rules {
            kinds.push(rule.kind);
            kinds.extend(rule.children.kinds());
        }
        kinds
    }
}
