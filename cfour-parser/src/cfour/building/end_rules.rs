//! End-line resolution
//!
//! Start markers say where a region begins; an [`EndRule`] says where it stops. All
//! positions here are 0-indexed and relative to the lines of the region being scanned.
//! Errors and violations are reported with absolute line numbers.

use crate::cfour::error::ParseError;
use crate::cfour::region::Region;
use crate::cfour::scanning::Marker;
use regex::Regex;

/// Rule locating the last line of a region.
#[derive(Debug, Clone)]
pub enum EndRule {
    /// Ends on the next line equal (after trimming) to `delimiter`, searched from
    /// `search_from` lines below the marker. `checks` are marker-relative offsets
    /// whose lines must also be the delimiter.
    Delimiter {
        delimiter: String,
        checks: Vec<isize>,
        search_from: usize,
    },
    /// Ends on the `count`-th blank line at or after `skip` lines below the marker.
    BlankLine { skip: usize, count: usize },
    /// The marker line plus this many following lines.
    FixedOffset(usize),
    /// Ends on the first later line matching the closing pattern.
    Pattern(Regex),
    /// Ends before the next marker of the same rule, or at the last line.
    Open,
}

impl EndRule {
    /// A delimiter made of `width` copies of `fill`.
    pub fn delimiter(fill: char, width: usize, checks: &[isize], search_from: usize) -> Self {
        EndRule::Delimiter {
            delimiter: std::iter::repeat(fill).take(width).collect(),
            checks: checks.to_vec(),
            search_from,
        }
    }

    /// A closing pattern, anchored at the start of the trimmed line.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(EndRule::Pattern(Regex::new(&format!("^(?:{pattern})"))?))
    }
}

/// Relative bounds of a region about to be built.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub start: usize,
    pub end: usize,
    /// Shape checks that failed; the region is still built but flagged.
    pub violations: Vec<ParseError>,
}

/// Resolve the bounds of the region opened by `marker`.
///
/// `later` holds the markers found after `marker` in the same scan.
pub fn resolve(
    rule: &EndRule,
    lead: usize,
    name: &str,
    marker: &Marker,
    later: &[Marker],
    parent: &Region,
) -> Result<Bounds, ParseError> {
    let at = marker.line;
    let last = parent.len().saturating_sub(1);
    let start = at.checked_sub(lead).ok_or_else(|| {
        ParseError::unresolved(
            parent.absolute(at),
            format!("`{name}` expects {lead} line(s) above its marker"),
        )
    })?;
    let mut violations = Vec::new();

    let end = match rule {
        EndRule::Delimiter {
            delimiter,
            checks,
            search_from,
        } => {
            for offset in checks {
                let expected = at as isize + offset;
                let holds = usize::try_from(expected)
                    .ok()
                    .and_then(|rel| parent.line(rel))
                    .is_some_and(|text| text.trim() == delimiter);
                if !holds {
                    let line = usize::try_from(expected)
                        .map(|rel| parent.absolute(rel))
                        .unwrap_or(parent.start);
                    violations.push(ParseError::mismatch(
                        line,
                        format!(
                            "`{}` expects a delimiter line at marker offset {}",
                            name, offset
                        ),
                    ));
                }
            }
            find_from(parent, at + search_from, |text| text == delimiter).ok_or_else(|| {
                ParseError::unresolved(
                    parent.absolute(at),
                    format!(
                        "closing delimiter of `{}` ({} characters) not found",
                        name,
                        delimiter.len()
                    ),
                )
            })?
        }
        EndRule::BlankLine { skip, count } => {
            let wanted = (*count).max(1);
            let mut seen = 0;
            let mut found = None;
            for rel in (at + skip)..parent.len() {
                if parent.lines[rel].trim().is_empty() {
                    seen += 1;
                    if seen == wanted {
                        found = Some(rel);
                        break;
                    }
                }
            }
            found.ok_or_else(|| {
                ParseError::unresolved(
                    parent.absolute(at),
                    format!("`{}` expects {} blank line(s) before its end", name, wanted),
                )
            })?
        }
        EndRule::FixedOffset(length) => {
            let end = at + length;
            if end > last {
                return Err(ParseError::unresolved(
                    parent.absolute(at),
                    format!("`{}` needs {} line(s) after its marker", name, length),
                ));
            }
            end
        }
        EndRule::Pattern(closing) => {
            find_from(parent, at + 1, |text| closing.is_match(text)).ok_or_else(|| {
                ParseError::unresolved(
                    parent.absolute(at),
                    format!("closing line of `{}` not found", name),
                )
            })?
        }
        EndRule::Open => later
            .iter()
            .find(|next| next.pattern == marker.pattern)
            .map(|next| next.line.saturating_sub(1))
            .unwrap_or(last)
            .max(at),
    };

    Ok(Bounds {
        start,
        end,
        violations,
    })
}

fn find_from<F>(parent: &Region, from: usize, predicate: F) -> Option<usize>
where
    F: Fn(&str) -> bool,
{
    parent
        .lines
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, line)| predicate(line.trim()))
        .map(|(rel, _)| rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfour::region::RegionKind;
    use crate::cfour::scanning::MarkerKind;

    fn region(texts: &[&str]) -> Region {
        Region::new(
            "xjoda",
            RegionKind::Program,
            11,
            texts.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn marker(pattern: usize, line: usize) -> Marker {
        Marker {
            pattern,
            line,
            label: "test".into(),
            kind: MarkerKind::Section,
            text: String::new(),
            captures: Vec::new(),
        }
    }

    #[test]
    fn test_delimiter_with_checks() {
        let parent = region(&["-----", "Title", "-----", "h", "h", "-----", "row", "-----", "tail"]);
        let rule = EndRule::delimiter('-', 5, &[-1, 1, 4], 5);
        let bounds = resolve(&rule, 1, "t", &marker(0, 1), &[], &parent).unwrap();
        assert_eq!((bounds.start, bounds.end), (0, 7));
        assert!(bounds.violations.is_empty());
    }

    #[test]
    fn test_delimiter_check_violation_keeps_bounds() {
        let parent = region(&["=====", "Title", "-----", "h", "h", "-----", "row", "-----"]);
        let rule = EndRule::delimiter('-', 5, &[-1, 1, 4], 5);
        let bounds = resolve(&rule, 1, "t", &marker(0, 1), &[], &parent).unwrap();
        assert_eq!(bounds.end, 7);
        assert_eq!(bounds.violations.len(), 1);
        assert_eq!(bounds.violations[0].line(), 11);
    }

    #[test]
    fn test_missing_delimiter_is_unresolved() {
        let parent = region(&["Title", "-----", "row", "row"]);
        let rule = EndRule::delimiter('-', 5, &[], 2);
        let err = resolve(&rule, 0, "t", &marker(0, 0), &[], &parent).unwrap_err();
        assert!(matches!(err, ParseError::UnresolvedBoundary { line: 11, .. }));
    }

    #[test]
    fn test_blank_line_counting() {
        let parent = region(&["Converged root:", "", "a", "", "b", "", "c"]);
        let rule = EndRule::BlankLine { skip: 1, count: 3 };
        let bounds = resolve(&rule, 0, "t", &marker(0, 0), &[], &parent).unwrap();
        assert_eq!(bounds.end, 5);

        let rule = EndRule::BlankLine { skip: 1, count: 4 };
        assert!(resolve(&rule, 0, "t", &marker(0, 0), &[], &parent).is_err());
    }

    #[test]
    fn test_fixed_offset_overrun() {
        let parent = region(&["a", "b", "c"]);
        let ok = resolve(&EndRule::FixedOffset(2), 0, "t", &marker(0, 0), &[], &parent).unwrap();
        assert_eq!(ok.end, 2);
        assert!(resolve(&EndRule::FixedOffset(3), 0, "t", &marker(0, 0), &[], &parent).is_err());
    }

    #[test]
    fn test_pattern_rule() {
        let parent = region(&["MP2 correlation energy: -0.2", "x", "  Total MP2 energy: -76.3"]);
        let rule = EndRule::pattern(r"Total MP2 energy:").unwrap();
        let bounds = resolve(&rule, 0, "t", &marker(0, 0), &[], &parent).unwrap();
        assert_eq!(bounds.end, 2);
    }

    #[test]
    fn test_open_rule_stops_before_next_of_same_rule() {
        let parent = region(&["irrep 1", "a", "other", "irrep 2", "b"]);
        let later = [marker(1, 2), marker(0, 3)];
        let first = resolve(&EndRule::Open, 0, "t", &marker(0, 0), &later, &parent).unwrap();
        assert_eq!(first.end, 2);
        let second = resolve(&EndRule::Open, 0, "t", &marker(0, 3), &[], &parent).unwrap();
        assert_eq!(second.end, 4);
    }

    #[test]
    fn test_lead_before_start_is_unresolved() {
        let parent = region(&["Title", "-----"]);
        let rule = EndRule::FixedOffset(1);
        assert!(resolve(&rule, 1, "t", &marker(0, 0), &[], &parent).is_err());
    }
}
