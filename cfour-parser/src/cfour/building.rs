//! Region tree building
//!
//! Given a region and the [`Layout`] that applies to it, the builder scans the region's
//! lines for the layout's start patterns, resolves each start marker's end line with the
//! rule's [`EndRule`], and appends the resulting child regions to `sections` in
//! document order. Each child is then built recursively with the rule's own nested
//! layout, which is how hierarchies such as EOM block, irrep, root and converged root
//! are recovered from text without any nesting syntax.
//!
//! Failures stay local to the highlight that caused them:
//!
//! - an unresolved end drops that one child and reports `UnresolvedBoundary`
//! - a failed shape check keeps the child with `ok = false` and reports `StructuralMismatch`
//! - a marker that would start inside an already accepted sibling is skipped, keeping
//!   siblings disjoint
//!
//! Siblings after a failure are built as usual.

pub mod end_rules;
pub mod layout;

pub use end_rules::{resolve, Bounds, EndRule};
pub use layout::{Layout, SectionRule};

use super::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
use super::region::Region;
use super::scanning::scan;

/// Build the sub-regions of `parent` described by `layout`.
///
/// `program` names the enclosing program invocation in diagnostics.
pub fn build_sections(
    parent: &mut Region,
    layout: &Layout,
    program: &str,
    sink: &mut dyn DiagnosticSink,
) {
    if layout.is_empty() {
        return;
    }

    let markers = scan(&parent.lines, layout.highlights());
    let mut children: Vec<Region> = Vec::new();

    for (index, marker) in markers.iter().enumerate() {
        let Some(rule) = layout.rule(marker.pattern) else {
            continue;
        };

        let bounds = match resolve(
            &rule.end_rule,
            rule.lead,
            &rule.name,
            marker,
            &markers[index + 1..],
            parent,
        ) {
            Ok(bounds) => bounds,
            Err(err) => {
                sink.emit(Diagnostic::from_error(&err, program));
                continue;
            }
        };

        if let Some(previous) = children.last() {
            let previous_end = previous.end - parent.start;
            if bounds.start <= previous_end {
                sink.emit(
                    Diagnostic::new(
                        DiagnosticKind::StructuralMismatch,
                        program,
                        parent.absolute(marker.line),
                        format!(
                            "`{}` starts inside `{}` (lines {}-{}) and is skipped",
                            rule.name, previous.name, previous.start, previous.end
                        ),
                    )
                    .with_severity(Severity::Warning),
                );
                continue;
            }
        }

        let Some(child) = parent.slice(rule.name.clone(), rule.kind, bounds.start, bounds.end)
        else {
            continue;
        };
        let mut child = child.with_marker(marker.rebased(bounds.start));

        if !bounds.violations.is_empty() {
            child.mark_failed();
            for violation in &bounds.violations {
                sink.emit(Diagnostic::from_error(violation, program));
            }
        }

        build_sections(&mut child, &rule.children, program, sink);
        children.push(child);
    }

    tracing::debug!(
        program,
        region = %parent.name,
        markers = markers.len(),
        sections = children.len(),
        "built sections"
    );
    parent.sections.extend(children);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfour::region::RegionKind;

    fn program(texts: &[&str]) -> Region {
        Region::new(
            "xtest",
            RegionKind::Program,
            1,
            texts.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn fixed(kind: RegionKind, pattern: &str, n: usize) -> SectionRule {
        SectionRule::new(kind, pattern, EndRule::FixedOffset(n))
    }

    #[test]
    fn test_children_in_document_order() {
        let layout = Layout::new(vec![
            fixed(RegionKind::Named("b"), "B", 0),
            fixed(RegionKind::Named("a"), "A", 1),
        ])
        .unwrap();
        let mut parent = program(&["begin", "A", "a", "B", "end"]);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        build_sections(&mut parent, &layout, "xtest", &mut diagnostics);

        assert!(diagnostics.is_empty());
        let spans: Vec<_> = parent
            .sections
            .iter()
            .map(|s| (s.name.as_str(), s.start, s.end))
            .collect();
        assert_eq!(spans, vec![("a", 2, 3), ("b", 4, 4)]);
        assert_eq!(parent.sections[0].marker.as_ref().map(|m| m.line), Some(0));
    }

    #[test]
    fn test_unresolved_child_is_dropped_and_siblings_survive() {
        let layout = Layout::new(vec![
            fixed(RegionKind::Named("a"), "A", 5),
            fixed(RegionKind::Named("b"), "B", 0),
        ])
        .unwrap();
        let mut parent = program(&["A", "B", "x"]);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        build_sections(&mut parent, &layout, "xtest", &mut diagnostics);

        assert_eq!(parent.sections.len(), 1);
        assert_eq!(parent.sections[0].name, "b");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnresolvedBoundary);
        assert_eq!(diagnostics[0].program, "xtest");
        assert_eq!(diagnostics[0].line, 1);
    }

    #[test]
    fn test_overlapping_marker_is_skipped() {
        let layout = Layout::new(vec![fixed(RegionKind::Named("a"), "A", 2)]).unwrap();
        let mut parent = program(&["A", "A", "x", "y"]);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        build_sections(&mut parent, &layout, "xtest", &mut diagnostics);

        assert_eq!(parent.sections.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::StructuralMismatch);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_nested_layout_and_provenance() {
        let inner = Layout::new(vec![SectionRule::new(
            RegionKind::Named("root"),
            r"root \d",
            EndRule::Open,
        )])
        .unwrap();
        let layout = Layout::new(vec![SectionRule::new(
            RegionKind::Named("irrep"),
            "irrep",
            EndRule::Open,
        )
        .with_children(inner)])
        .unwrap();
        let mut parent = program(&["pre", "irrep", "root 1", "x", "root 2", "y"]);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        build_sections(&mut parent, &layout, "xtest", &mut diagnostics);

        let irrep = &parent.sections[0];
        assert_eq!((irrep.start, irrep.end), (2, 6));
        let roots: Vec<_> = irrep.sections.iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(roots, vec![(3, 4), (5, 6)]);
        assert_eq!(irrep.sections[1].lines, vec!["root 2", "y"]);
    }
}
