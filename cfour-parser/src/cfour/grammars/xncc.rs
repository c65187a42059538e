//! xncc: MP2, coupled-cluster and EOM solutions
//!
//! The EOM part has no nesting syntax of its own. It is recovered as a hierarchy of
//! open-ended regions, each running until the next sibling header:
//!
//! ```text
//! eom                  Formation of H took ...
//! └── irrep            Searching for N roots in irrep M
//!     └── eom root     EOMEE-CCSD guess vector:
//!         ├── guess vector
//!         ├── iterative solution
//!         ├── eom energy
//!         └── converged root
//! ```

use super::common::{energy_au, expect_line, group_f64, group_str, marker_capture};
use super::Grammar;
use crate::cfour::building::{EndRule, Layout, SectionRule};
use crate::cfour::data::{record, DataMap, Value};
use crate::cfour::error::ParseError;
use crate::cfour::extraction::columns::FLOAT;
use crate::cfour::extraction::convergence::{
    Convergence, ConvergencePatterns, ConvergenceState, ConvergenceTracker,
};
use crate::cfour::extraction::{ExtractContext, ExtractorRegistry};
use crate::cfour::region::{Region, RegionKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

const CC_BEGIN: &str = r"Beginning iterative solution of (CCSD|CCSDT|CCSDTQ) equations:";
const EOM_BEGIN: &str = r"Beginning iterative solution of (EOMEE-CCSDT?Q?) equations";
const GUESS_VECTOR: &str = r"(EOMEE-CCSDT?) guess vector:";

static LAYOUT: Lazy<Layout> = Lazy::new(|| {
    let root = Layout::new(vec![
        SectionRule::new(
            RegionKind::GuessVector,
            GUESS_VECTOR,
            EndRule::BlankLine { skip: 2, count: 1 },
        ),
        SectionRule::new(
            RegionKind::IterativeSolution,
            EOM_BEGIN,
            EndRule::pattern(r"EOMEE-CCSDT?Q? iterations converged in").unwrap(),
        ),
        SectionRule::new(
            RegionKind::EomEnergy,
            format!(r"(EOMEE-CCSDT?Q?) excitation energy:\s*{FLOAT}\s*\(\s*{FLOAT}\s*eV\)"),
            EndRule::FixedOffset(1),
        ),
        SectionRule::new(
            RegionKind::ConvergedRoot,
            r"Converged root:",
            EndRule::BlankLine { skip: 1, count: 3 },
        ),
    ])
    .unwrap();

    let irrep = Layout::new(vec![SectionRule::new(
        RegionKind::EomRoot,
        GUESS_VECTOR,
        EndRule::Open,
    )
    .with_children(root)])
    .unwrap();

    let eom = Layout::new(vec![SectionRule::new(
        RegionKind::EomIrrep,
        r"Searching for\s*(\d+)\s*roots in irrep\s*(\d+)",
        EndRule::Open,
    )
    .with_children(irrep)])
    .unwrap();

    let cc = Layout::new(vec![SectionRule::new(
        RegionKind::Iterations,
        CC_BEGIN,
        EndRule::pattern(r"CC(?:SD|SDT|SDTQ) iterations converged in").unwrap(),
    )])
    .unwrap();

    Layout::new(vec![
        SectionRule::new(
            RegionKind::Mp2Energy,
            format!(r"MP2 correlation energy:\s*{FLOAT}"),
            EndRule::pattern(&format!(r"Total MP2 energy:\s*{FLOAT}")).unwrap(),
        ),
        SectionRule::new(
            RegionKind::CcSolution,
            CC_BEGIN,
            EndRule::pattern(&format!(r"Total CC(?:SD|SDT|SDTQ) energy:\s*{FLOAT}")).unwrap(),
        )
        .with_children(cc),
        SectionRule::new(
            RegionKind::EomSolution,
            format!(r"Formation of H took\s*{FLOAT}\s*seconds at\s*{FLOAT}\s*Gflops/sec"),
            EndRule::Open,
        )
        .with_children(eom),
    ])
    .unwrap()
});

static CC_CONVERGENCE: Lazy<ConvergencePatterns> = Lazy::new(|| ConvergencePatterns {
    begin: Regex::new(
        r"^Beginning iterative solution of (?P<model>CCSD|CCSDT|CCSDTQ) equations:",
    )
    .unwrap(),
    converged: Regex::new(&converged_pattern("CC(?:SD|SDT|SDTQ)")).unwrap(),
});

static EOM_CONVERGENCE: Lazy<ConvergencePatterns> = Lazy::new(|| ConvergencePatterns {
    begin: Regex::new(r"^Beginning iterative solution of (?P<model>EOMEE-CCSDT?Q?) equations")
        .unwrap(),
    converged: Regex::new(&converged_pattern("EOMEE-CCSDT?Q?")).unwrap(),
});

fn converged_pattern(model: &str) -> String {
    format!(
        r"^{model} iterations converged in\s*(?P<cycles>\d+)\s*cycles and\s*(?P<seconds>\d+\.\d+)\s*seconds(?:\s*\(\s*\d+\.\d+\s*s/it\.\)\s*at\s*(?P<gflops>\d+\.\d+)\s*Gflops/sec)?"
    )
}

static MP2_CORRELATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^MP2 correlation energy:\s*{FLOAT}")).unwrap());
static MP2_TOTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^Total MP2 energy:\s*{FLOAT}")).unwrap());
static CC_TOTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^Total (CC(?:SD|SDT|SDTQ)) energy:\s*{FLOAT}")).unwrap());
static FORMATION_OF_H: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^Formation of H took\s*{FLOAT}\s*seconds at\s*{FLOAT}\s*Gflops/sec"))
        .unwrap()
});
static EOM_EXCITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(EOMEE-CCSDT?Q?) excitation energy:\s*{FLOAT}\s*\(\s*{FLOAT}\s*eV\)"
    ))
    .unwrap()
});
static EOM_TOTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^Total (EOMEE-CCSDT?Q?) energy:\s*{FLOAT}")).unwrap());

static SINGLES_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\s*A\s+I){3}").unwrap());
static SINGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(\d+)\s+(\d+)\s+([+-]?\d+\.\d+)").unwrap());
static DOUBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+([+-]?\d+\.\d+)").unwrap()
});

pub struct XnccGrammar;

impl Grammar for XnccGrammar {
    fn program(&self) -> &str {
        "xncc"
    }

    fn layout(&self) -> Layout {
        LAYOUT.clone()
    }

    fn register_extractors(&self, extractors: &mut ExtractorRegistry) {
        extractors.register(RegionKind::Mp2Energy, mp2_energy);
        extractors.register(RegionKind::CcSolution, cc_solution);
        extractors.register(RegionKind::Iterations, iterations);
        extractors.register(RegionKind::EomSolution, eom_solution);
        extractors.register(RegionKind::EomIrrep, eom_irrep);
        extractors.register(RegionKind::EomRoot, eom_root);
        extractors.register(RegionKind::GuessVector, guess_vector);
        extractors.register(RegionKind::IterativeSolution, iterations);
        extractors.register(RegionKind::EomEnergy, eom_energy);
        extractors.register(RegionKind::ConvergedRoot, converged_root);
    }
}

fn mp2_energy(region: &Region, _cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let correlation = expect_line(region, 0, &MP2_CORRELATION, "the MP2 correlation energy")?;
    let last = region.len() - 1;
    let total = expect_line(region, last, &MP2_TOTAL, "the total MP2 energy")?;
    Ok(record([
        ("correlation", energy_au(group_f64(&correlation, 1, region.start)?)),
        ("total", energy_au(group_f64(&total, 1, region.end)?)),
    ]))
}

/// Track the solver trace of `region`, reporting a trace that never converges.
fn converge(
    region: &Region,
    patterns: &ConvergencePatterns,
    cx: &mut ExtractContext<'_>,
) -> Convergence {
    let outcome = ConvergenceTracker::track(patterns, &region.lines);
    if outcome.state == ConvergenceState::Failed {
        let line = region.absolute(outcome.began_at.unwrap_or(0));
        cx.report(&ParseError::unresolved(
            line,
            format!("iterations in `{}` end without converging", region.name),
        ));
        cx.degrade();
    }
    outcome
}

fn convergence_patterns(region: &Region) -> &'static ConvergencePatterns {
    match marker_capture(region, 1) {
        Some(model) if model.starts_with("EOM") => &*EOM_CONVERGENCE,
        _ => &*CC_CONVERGENCE,
    }
}

fn cc_solution(region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let last = region.len() - 1;
    let total = expect_line(region, last, &CC_TOTAL, "the total CC energy")?;
    let outcome = converge(region, &CC_CONVERGENCE, cx);

    let mut data = record([
        ("status", Value::from(outcome.state.to_string())),
        (
            "energy",
            Value::Map(record([("total", energy_au(group_f64(&total, 2, region.end)?))])),
        ),
    ]);
    let model = outcome.model.unwrap_or_else(|| group_str(&total, 1));
    data.insert("model".into(), Value::from(model));
    Ok(data)
}

/// Iteration trace of a CC or EOM solver.
fn iterations(region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    Ok(converge(region, convergence_patterns(region), cx).to_data())
}

fn eom_solution(region: &Region, _cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let caps = expect_line(region, 0, &FORMATION_OF_H, "the formation of H timing")?;
    Ok(record([
        (
            "formation_of_h",
            Value::Map(record([
                ("seconds", Value::from(group_f64(&caps, 1, region.start)?)),
                ("gflops", Value::from(group_f64(&caps, 2, region.start)?)),
            ])),
        ),
        ("irreps", Value::from(region.sections.len())),
    ]))
}

fn eom_irrep(region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let requested = marker_capture(region, 1)
        .and_then(|n| n.parse::<i64>().ok())
        .ok_or_else(|| ParseError::field(region.start, "requested root count is missing"))?;
    let irrep = marker_capture(region, 2)
        .and_then(|n| n.parse::<i64>().ok())
        .ok_or_else(|| ParseError::field(region.start, "irrep number is missing"))?;
    let found = region
        .sections
        .iter()
        .filter(|section| section.kind == RegionKind::EomRoot)
        .count();

    if found as i64 != requested {
        cx.mismatch(
            region.start,
            format!(
                "irrep {} requested {} root(s) but {} were found",
                irrep, requested, found
            ),
        );
    }

    Ok(record([
        ("irrep", Value::from(irrep)),
        ("requested_roots", Value::from(requested)),
        ("found_roots", Value::from(found)),
    ]))
}

fn eom_root(region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let outcome = converge(region, &EOM_CONVERGENCE, cx);
    let model = outcome
        .model
        .clone()
        .or_else(|| marker_capture(region, 1).map(str::to_string))
        .unwrap_or_default();
    Ok(record([
        ("model", Value::from(model)),
        ("status", Value::from(outcome.state.to_string())),
    ]))
}

/// Singles amplitudes of the starting vector, largest first.
fn guess_vector(region: &Region, _cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let mut amplitudes: Vec<Value> = region
        .lines
        .iter()
        .skip(1)
        .flat_map(|line| SINGLE.captures_iter(line))
        .filter_map(|caps| single(&caps))
        .collect();
    amplitudes.sort_by(by_magnitude);
    Ok(record([
        ("model", Value::from(marker_capture(region, 1).unwrap_or_default())),
        ("amplitudes", Value::List(amplitudes)),
    ]))
}

fn eom_energy(region: &Region, _cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let excitation = expect_line(region, 0, &EOM_EXCITATION, "the EOM excitation energy")?;
    let total = expect_line(region, 1, &EOM_TOTAL, "the total EOM energy")?;
    let model = group_str(&excitation, 1);
    if group_str(&total, 1) != model {
        return Err(ParseError::mismatch(
            region.absolute(1),
            format!(
                "total energy of `{}` follows an excitation energy of `{}`",
                group_str(&total, 1),
                model
            ),
        ));
    }

    Ok(record([
        ("model", Value::from(model)),
        (
            "excitation",
            Value::Map(record([
                ("au", Value::from(group_f64(&excitation, 2, region.start)?)),
                ("eV", Value::from(group_f64(&excitation, 3, region.start)?)),
            ])),
        ),
        ("total", energy_au(group_f64(&total, 2, region.absolute(1))?)),
    ]))
}

fn is_rule(line: &str) -> bool {
    let text = line.trim();
    text.starts_with('-') && text.chars().all(|c| c == '-' || c.is_whitespace())
}

fn by_magnitude(a: &Value, b: &Value) -> Ordering {
    let magnitude = |v: &Value| v.get("amplitude").and_then(Value::as_f64).map_or(0.0, f64::abs);
    magnitude(b)
        .partial_cmp(&magnitude(a))
        .unwrap_or(Ordering::Equal)
}

/// Read amplitude rows starting at `from` until a line without any; returns the rows and
/// the first line after them.
fn amplitude_rows<F>(region: &Region, from: usize, pattern: &Regex, row: F) -> (Vec<Value>, usize)
where
    F: Fn(&regex::Captures<'_>) -> Option<Value>,
{
    let mut rows = Vec::new();
    let mut rel = from;
    while let Some(line) = region.line(rel) {
        let before = rows.len();
        rows.extend(pattern.captures_iter(line).filter_map(|caps| row(&caps)));
        if rows.len() == before {
            break;
        }
        rel += 1;
    }
    rows.sort_by(by_magnitude);
    (rows, rel)
}

fn single(caps: &regex::Captures<'_>) -> Option<Value> {
    Some(Value::Map(record([
        ("a", Value::from(caps[1].parse::<i64>().ok()?)),
        ("i", Value::from(caps[2].parse::<i64>().ok()?)),
        ("amplitude", Value::from(caps[3].parse::<f64>().ok()?)),
    ])))
}

fn double(caps: &regex::Captures<'_>) -> Option<Value> {
    Some(Value::Map(record([
        ("a", Value::from(caps[1].parse::<i64>().ok()?)),
        ("b", Value::from(caps[2].parse::<i64>().ok()?)),
        ("i", Value::from(caps[3].parse::<i64>().ok()?)),
        ("j", Value::from(caps[4].parse::<i64>().ok()?)),
        ("amplitude", Value::from(caps[5].parse::<f64>().ok()?)),
    ])))
}

/// Largest singles and doubles amplitudes of a converged root, largest first.
fn converged_root(region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let rule = (1..region.len())
        .find(|&rel| is_rule(&region.lines[rel]))
        .ok_or_else(|| {
            ParseError::precondition(region.start, "singles listing has no header rule")
        })?;
    expect_line(region, rule - 1, &SINGLES_HEADER, "the singles column header")?;
    let (singles, next) = amplitude_rows(region, rule + 1, &SINGLE, single);

    let doubles = match (next..region.len()).find(|&rel| is_rule(&region.lines[rel])) {
        Some(rule) => amplitude_rows(region, rule + 1, &DOUBLE, double).0,
        None => {
            cx.mismatch(region.absolute(next), "doubles listing has no header rule");
            Vec::new()
        }
    };

    Ok(record([
        ("singles", Value::List(singles)),
        ("doubles", Value::List(doubles)),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfour::building::build_sections;
    use crate::cfour::diagnostics::{Diagnostic, DiagnosticKind};

    fn lines(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    fn converged_root_lines() -> Vec<String> {
        lines(&[
            " Converged root:",
            "",
            "        A    I                  A    I                  A    I",
            "     ---------------------------------------------------------------",
            "        5    3  -0.1100         6    2   0.9500",
            "        7    3   0.0200",
            "",
            "        A    B    I    J              A    B    I    J",
            "     ---------------------------------------------------------------",
            "        5    5    3    3   0.0300     6    5    2    3  -0.0700",
            "",
        ])
    }

    #[test]
    fn test_converged_root_amplitudes_sorted_by_magnitude() {
        let region = Region::new("converged root", RegionKind::ConvergedRoot, 100, converged_root_lines());
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut cx = ExtractContext::new("xncc", &mut diagnostics);
        let data = converged_root(&region, &mut cx).unwrap();

        let singles = data["singles"].as_list().unwrap();
        assert_eq!(singles.len(), 3);
        assert_eq!(singles[0].get("amplitude").and_then(Value::as_f64), Some(0.95));
        assert_eq!(singles[1].get("amplitude").and_then(Value::as_f64), Some(-0.11));
        assert_eq!(singles[0].get("a"), Some(&Value::Integer(6)));

        let doubles = data["doubles"].as_list().unwrap();
        assert_eq!(doubles.len(), 2);
        assert_eq!(doubles[0].get("amplitude").and_then(Value::as_f64), Some(-0.07));
        assert_eq!(doubles[1].get("j"), Some(&Value::Integer(3)));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_converged_root_without_singles_header_is_fatal() {
        let mut texts = converged_root_lines();
        texts[2] = "   nonsense".to_string();
        let region = Region::new("converged root", RegionKind::ConvergedRoot, 100, texts);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut cx = ExtractContext::new("xncc", &mut diagnostics);
        let err = converged_root(&region, &mut cx).unwrap_err();
        assert_eq!(err.kind(), DiagnosticKind::FatalPrecondition);
        assert_eq!(err.line(), 102);
    }

    #[test]
    fn test_irrep_root_count_mismatch_degrades() {
        let texts = lines(&[
            "--invoking executable--",
            "/opt/cfour/bin/xncc",
            " Formation of H took    0.50 seconds at    1.20 Gflops/sec",
            " Searching for 2 roots in irrep 3",
            "",
            " EOMEE-CCSD guess vector:",
            "",
        ]);
        let mut program = Region::new("xncc", RegionKind::Program, 1, texts);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        build_sections(&mut program, &LAYOUT, "xncc", &mut diagnostics);

        let irrep = program.find(RegionKind::EomIrrep).unwrap();
        assert_eq!((irrep.start, irrep.end), (4, 7));
        assert_eq!(irrep.find_all(RegionKind::EomRoot).len(), 1);

        let mut cx = ExtractContext::new("xncc", &mut diagnostics);
        let data = eom_irrep(irrep, &mut cx).unwrap();
        assert!(cx.is_degraded());
        assert_eq!(data["requested_roots"], Value::Integer(2));
        assert_eq!(data["found_roots"], Value::Integer(1));
        assert_eq!(data["irrep"], Value::Integer(3));
    }

    #[test]
    fn test_unconverged_cc_trace_is_reported() {
        let region = Region::new(
            "iterations",
            RegionKind::Iterations,
            20,
            lines(&[
                " Beginning iterative solution of CCSD equations:",
                "   1   -0.2   0.1",
                "   2   -0.21  0.01",
            ]),
        );
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut cx = ExtractContext::new("xncc", &mut diagnostics);
        let data = iterations(&region, &mut cx).unwrap();
        assert!(cx.is_degraded());
        assert_eq!(data["status"], Value::from("failed"));
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnresolvedBoundary);
        assert_eq!(diagnostics[0].line, 20);
    }

    #[test]
    fn test_converged_pattern_reads_timings() {
        let pattern = Regex::new(&converged_pattern("CC(?:SD|SDT|SDTQ)")).unwrap();
        let caps = pattern
            .captures("CCSD iterations converged in  12 cycles and    1.234 seconds (   0.103 s/it.) at    5.678 Gflops/sec")
            .unwrap();
        assert_eq!(&caps["cycles"], "12");
        assert_eq!(&caps["seconds"], "1.234");
        assert_eq!(&caps["gflops"], "5.678");
    }
}
