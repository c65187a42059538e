//! Fluent assertion API for region trees
//!
//!     Tests that walk `sections[2].sections[0].data["..."]` by hand break whenever a
//!     layout gains a section, and they tend to check only counts. The assertions here
//!     address children by index or by name, follow data paths, and report the full
//!     path of the region that failed (e.g. `xncc:eom:irrep[0]`).
//!
//!     ```rust,ignore
//!     assert_programs(&parsed.programs)
//!         .names(&["xjoda", "xvscf"])
//!         .program(1, |scf| {
//!             scf.span(66, 92)
//!                 .child_named("scf energy", |energy| {
//!                     energy.data_f64(&["energy", "au"], -76.026632734);
//!                 });
//!         });
//!     ```

use crate::cfour::data::Value;
use crate::cfour::region::{Region, RegionKind};

/// Create an assertion builder for one region
pub fn assert_region(region: &Region) -> RegionAssertion<'_> {
    RegionAssertion {
        region,
        context: region.name.clone(),
    }
}

/// Create an assertion builder for a list of program regions
pub fn assert_programs(programs: &[Region]) -> ProgramsAssertion<'_> {
    ProgramsAssertion {
        programs,
        context: "programs".to_string(),
    }
}

fn summarize(regions: &[Region]) -> String {
    regions
        .iter()
        .map(|r| format!("{} {}-{}", r.name, r.start, r.end))
        .collect::<Vec<_>>()
        .join(", ")
}

fn approx_eq(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0)
}

pub struct ProgramsAssertion<'a> {
    programs: &'a [Region],
    context: String,
}

impl<'a> ProgramsAssertion<'a> {
    pub fn count(self, expected: usize) -> Self {
        assert_eq!(
            self.programs.len(),
            expected,
            "{}: Expected {} programs, found [{}]",
            self.context,
            expected,
            summarize(self.programs)
        );
        self
    }

    pub fn names(self, expected: &[&str]) -> Self {
        let actual: Vec<&str> = self.programs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            actual, expected,
            "{}: Expected programs {:?}, found {:?}",
            self.context, expected, actual
        );
        self
    }

    /// Programs are ordered by start line and do not overlap.
    pub fn ordered(self) -> Self {
        for pair in self.programs.windows(2) {
            assert!(
                pair[0].end < pair[1].start,
                "{}: {} {}-{} is not strictly before {} {}-{}",
                self.context,
                pair[0].name,
                pair[0].start,
                pair[0].end,
                pair[1].name,
                pair[1].start,
                pair[1].end
            );
        }
        self
    }

    pub fn all_ok(self) -> Self {
        for program in self.programs {
            assert!(
                program.is_ok(),
                "{}: Expected {} {}-{} to be ok",
                self.context,
                program.name,
                program.start,
                program.end
            );
        }
        self
    }

    pub fn program<F>(self, index: usize, assertion: F) -> Self
    where
        F: FnOnce(RegionAssertion<'a>),
    {
        assert!(
            index < self.programs.len(),
            "{}: Program index {} out of bounds ({} programs)",
            self.context,
            index,
            self.programs.len()
        );
        let program = &self.programs[index];
        assertion(RegionAssertion {
            region: program,
            context: format!("{}[{}]:{}", self.context, index, program.name),
        });
        self
    }
}

pub struct RegionAssertion<'a> {
    region: &'a Region,
    context: String,
}

impl<'a> RegionAssertion<'a> {
    pub fn name(self, expected: &str) -> Self {
        assert_eq!(
            self.region.name, expected,
            "{}: Expected region name to be '{}', but got '{}'",
            self.context, expected, self.region.name
        );
        self
    }

    pub fn kind(self, expected: RegionKind) -> Self {
        assert_eq!(
            self.region.kind, expected,
            "{}: Expected region kind {:?}, but got {:?}",
            self.context, expected, self.region.kind
        );
        self
    }

    /// Absolute, inclusive line range.
    pub fn span(self, start: usize, end: usize) -> Self {
        assert_eq!(
            (self.region.start, self.region.end),
            (start, end),
            "{}: Expected lines {}-{}, but got {}-{}",
            self.context,
            start,
            end,
            self.region.start,
            self.region.end
        );
        self
    }

    pub fn ok(self) -> Self {
        assert!(
            self.region.is_ok(),
            "{}: Expected region to be ok",
            self.context
        );
        self
    }

    pub fn failed(self) -> Self {
        assert!(
            !self.region.is_ok(),
            "{}: Expected region to be flagged as failed",
            self.context
        );
        self
    }

    pub fn first_line_contains(self, substring: &str) -> Self {
        let first = self.region.line(0).unwrap_or_default();
        assert!(
            first.contains(substring),
            "{}: Expected first line to contain '{}', but got '{}'",
            self.context,
            substring,
            first
        );
        self
    }

    pub fn child_count(self, expected: usize) -> Self {
        assert_eq!(
            self.region.sections.len(),
            expected,
            "{}: Expected {} children, found [{}]",
            self.context,
            expected,
            summarize(&self.region.sections)
        );
        self
    }

    pub fn child_names(self, expected: &[&str]) -> Self {
        let actual: Vec<&str> = self.region.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            actual, expected,
            "{}: Expected children {:?}, found {:?}",
            self.context, expected, actual
        );
        self
    }

    pub fn leaf(self) -> Self {
        self.child_count(0)
    }

    pub fn child<F>(self, index: usize, assertion: F) -> Self
    where
        F: FnOnce(RegionAssertion<'a>),
    {
        let sections = &self.region.sections;
        assert!(
            index < sections.len(),
            "{}: Child index {} out of bounds (region has {} children)",
            self.context,
            index,
            sections.len()
        );
        let child = &sections[index];
        assertion(RegionAssertion {
            region: child,
            context: format!("{}:{}[{}]", self.context, child.name, index),
        });
        self
    }

    /// First child with the given name.
    pub fn child_named<F>(self, name: &str, assertion: F) -> Self
    where
        F: FnOnce(RegionAssertion<'a>),
    {
        let region: &'a Region = self.region;
        let child = region.child(name).unwrap_or_else(|| {
            panic!(
                "{}: No child named '{}' in [{}]",
                self.context,
                name,
                summarize(&region.sections)
            )
        });
        assertion(RegionAssertion {
            region: child,
            context: format!("{}:{}", self.context, name),
        });
        self
    }

    fn value(&self, path: &[&str]) -> &'a Value {
        let region: &'a Region = self.region;
        let found = path.split_first().and_then(|(first, rest)| {
            region.data.get(*first).and_then(|value| value.path(rest))
        });
        match found {
            Some(value) => value,
            None => panic!(
                "{}: No data at {:?}; top-level keys are {:?}",
                self.context,
                path,
                region.data.keys().collect::<Vec<_>>()
            ),
        }
    }

    pub fn has_data(self, key: &str) -> Self {
        assert!(
            self.region.data.contains_key(key),
            "{}: Expected data key '{}', found {:?}",
            self.context,
            key,
            self.region.data.keys().collect::<Vec<_>>()
        );
        self
    }

    pub fn no_data(self) -> Self {
        assert!(
            self.region.data.is_empty(),
            "{}: Expected no data, found {:?}",
            self.context,
            self.region.data.keys().collect::<Vec<_>>()
        );
        self
    }

    pub fn data_f64(self, path: &[&str], expected: f64) -> Self {
        let actual = self.value(path).as_f64();
        assert!(
            actual.is_some_and(|actual| approx_eq(actual, expected)),
            "{}: Expected {:?} to be {}, but got {:?}",
            self.context,
            path,
            expected,
            actual
        );
        self
    }

    pub fn data_i64(self, path: &[&str], expected: i64) -> Self {
        let actual = self.value(path).as_i64();
        assert_eq!(
            actual,
            Some(expected),
            "{}: Expected {:?} to be {}, but got {:?}",
            self.context,
            path,
            expected,
            actual
        );
        self
    }

    pub fn data_str(self, path: &[&str], expected: &str) -> Self {
        let actual = self.value(path).as_str();
        assert_eq!(
            actual,
            Some(expected),
            "{}: Expected {:?} to be '{}', but got {:?}",
            self.context,
            path,
            expected,
            actual
        );
        self
    }

    /// Length of the list at `path`.
    pub fn data_len(self, path: &[&str], expected: usize) -> Self {
        let actual = self.value(path).as_list().map(<[Value]>::len);
        assert_eq!(
            actual,
            Some(expected),
            "{}: Expected {:?} to hold {} items, but got {:?}",
            self.context,
            path,
            expected,
            actual
        );
        self
    }

    /// Every descendant lies within its parent's range and carries exactly the lines of it.
    pub fn contained(self) -> Self {
        fn check(parent: &Region, context: &str) {
            for child in &parent.sections {
                assert!(
                    parent.contains(child),
                    "{}: child {} {}-{} escapes {}-{}",
                    context,
                    child.name,
                    child.start,
                    child.end,
                    parent.start,
                    parent.end
                );
                let offset = child.start - parent.start;
                assert_eq!(
                    child.lines.as_slice(),
                    &parent.lines[offset..offset + child.len()],
                    "{}: lines of child {} differ from the parent's",
                    context,
                    child.name
                );
                check(child, &format!("{}:{}", context, child.name));
            }
        }
        check(self.region, &self.context);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfour::data::record;

    fn tree() -> Region {
        let lines = (1..=6).map(|i| format!("line {}", i)).collect();
        let mut root = Region::new("root", RegionKind::Program, 10, lines);
        let mut child = root
            .slice("energy", RegionKind::ScfEnergy, 1, 2)
            .unwrap();
        child.merge_data(record([(
            "energy",
            Value::Map(record([("au", Value::from(-76.5))])),
        )]));
        root.sections.push(child);
        root
    }

    #[test]
    fn test_region_assertions() {
        assert_region(&tree())
            .name("root")
            .span(10, 15)
            .ok()
            .child_names(&["energy"])
            .contained()
            .child(0, |energy| {
                energy
                    .kind(RegionKind::ScfEnergy)
                    .span(11, 12)
                    .first_line_contains("line 2")
                    .data_f64(&["energy", "au"], -76.5)
                    .leaf();
            });
    }

    #[test]
    #[should_panic(expected = "root:energy: Expected lines 1-2")]
    fn test_failure_names_the_path() {
        assert_region(&tree()).child_named("energy", |energy| {
            energy.span(1, 2);
        });
    }
}
