//! xsim: vibronic spectrum simulation
//!
//! xsim echoes its input file and then prints the simulated stick spectrum as a
//! whitespace table framed by 72-dash rules:
//!
//! ```text
//! Input file used for run reproduced below
//!
//! water cation, first band
//! Basis Functions
//! 20 20 20
//! Lanczos
//! 1000 1
//!
//! Dataset number    1
//! ...
//! ------------------------------------------------------------------------
//!     Energy (eV)   Energy (cm-1)   Offset (cm-1)   Relative intensity
//! ------------------------------------------------------------------------
//!    12.61960000    101784.3000          0.0000          1.00000000
//!    13.00640000    104903.9000       3119.6000          ********
//!
//! ------------------------------------------------------------------------
//! ```
//!
//! An intensity column overflowing to stars is recorded as 10.

use super::Grammar;
use crate::cfour::building::{EndRule, Layout, SectionRule};
use crate::cfour::data::{record, DataMap, Value};
use crate::cfour::error::ParseError;
use crate::cfour::extraction::columns::{parse_f64, parse_floats, tokens};
use crate::cfour::extraction::{ExtractContext, ExtractorRegistry};
use crate::cfour::region::{Region, RegionKind};
use once_cell::sync::Lazy;

static LAYOUT: Lazy<Layout> = Lazy::new(|| {
    Layout::new(vec![
        SectionRule::new(
            RegionKind::XsimInput,
            r"Input file used for run reproduced below",
            EndRule::pattern("Dataset number").unwrap(),
        ),
        SectionRule::new(
            RegionKind::Spectrum,
            r"Energy \(eV\)\s+Energy \(cm-1\)",
            EndRule::delimiter('-', 72, &[-1, 1], 2),
        )
        .with_lead(1),
    ])
    .unwrap()
});

/// Intensity recorded for an overflowed column.
const OVERFLOW_INTENSITY: f64 = 10.0;

const COLUMNS: [&str; 4] = ["energy_ev", "energy_cm", "offset_cm", "relative_intensity"];

pub struct XsimGrammar;

impl Grammar for XsimGrammar {
    fn program(&self) -> &str {
        "xsim"
    }

    fn layout(&self) -> Layout {
        LAYOUT.clone()
    }

    fn register_extractors(&self, extractors: &mut ExtractorRegistry) {
        extractors.register(RegionKind::XsimInput, input_file);
        extractors.register(RegionKind::Spectrum, spectrum);
    }
}

/// Echoed input lines, plus the entries following the `Basis Functions` and `Lanczos`
/// keywords.
fn input_file(region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    // The last line is the `Dataset number` banner.
    let body = &region.lines[1..region.len().saturating_sub(1).max(1)];
    let mut echoed: Vec<&str> = body.iter().map(|line| line.trim_end()).collect();
    while echoed.last().is_some_and(|line| line.is_empty()) {
        echoed.pop();
    }

    let mut data = record([(
        "lines",
        Value::from(echoed.iter().map(|&line| Value::from(line)).collect::<Vec<_>>()),
    )]);
    for (keyword, key) in [("Basis Functions", "basis_functions"), ("Lanczos", "lanczos")] {
        let entry = echoed
            .iter()
            .position(|line| line.trim_start().starts_with(keyword))
            .and_then(|at| echoed.get(at + 1));
        match entry {
            Some(entry) => {
                data.insert(key.to_string(), Value::from(entry.trim()));
            }
            None => cx.mismatch(
                region.start,
                format!("echoed input has no `{}` entry", keyword),
            ),
        }
    }
    Ok(data)
}

fn spectrum(region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let mut peaks = Vec::new();
    // Rows sit between the rule under the column titles and the closing rule.
    for rel in 3..region.len().saturating_sub(1) {
        let line = &region.lines[rel];
        if line.trim().is_empty() {
            continue;
        }
        let fields = tokens(line);
        if fields.len() != COLUMNS.len() {
            cx.skip_line(
                region,
                rel,
                format!("expected {} columns, found {}", COLUMNS.len(), fields.len()),
            );
            continue;
        }
        let Some(mut values) = parse_floats(&fields[..3]) else {
            cx.skip_line(region, rel, "energy columns are not numbers");
            continue;
        };
        let intensity = if fields[3].chars().all(|c| c == '*') {
            cx.report(&ParseError::field(
                region.absolute(rel),
                format!("relative intensity overflows, recorded as {}", OVERFLOW_INTENSITY),
            ));
            OVERFLOW_INTENSITY
        } else if let Some(intensity) = parse_f64(fields[3]) {
            intensity
        } else {
            cx.skip_line(region, rel, "relative intensity is not a number");
            continue;
        };
        values.push(intensity);

        peaks.push(Value::Map(record(
            COLUMNS.iter().zip(values).map(|(&key, v)| (key, Value::from(v))),
        )));
    }

    if peaks.is_empty() {
        cx.mismatch(region.start, "spectrum table has no rows");
    }
    Ok(record([("peaks", Value::from(peaks))]))
}
