//! xvcc: coupled-cluster summary
//!
//! After convergence xvcc prints a four-line summary:
//!
//! ```text
//! A miracle has come to pass. The CC iterations have converged.
//! The reference energy is    -76.02663273 a.u.
//! The correlation energy is   -0.21366458 a.u.
//! The total energy is        -76.24029731 a.u.
//! ```

use super::common::{energy_au, match_line};
use super::Grammar;
use crate::cfour::building::{EndRule, Layout, SectionRule};
use crate::cfour::data::{DataMap, Value};
use crate::cfour::error::ParseError;
use crate::cfour::extraction::columns::{parse_f64, FLOAT};
use crate::cfour::extraction::{ExtractContext, ExtractorRegistry};
use crate::cfour::region::{Region, RegionKind};
use once_cell::sync::Lazy;
use regex::Regex;

static LAYOUT: Lazy<Layout> = Lazy::new(|| {
    Layout::new(vec![SectionRule::new(
        RegionKind::CcSummary,
        r"A miracle has come to pass\. The CC iterations have converged\.",
        EndRule::FixedOffset(3),
    )])
    .unwrap()
});

static ENERGY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^The (reference|correlation|total) energy is\s*{FLOAT}\s*a\.u\."
    ))
    .unwrap()
});

const COMPONENTS: [&str; 3] = ["reference", "correlation", "total"];

pub struct XvccGrammar;

impl Grammar for XvccGrammar {
    fn program(&self) -> &str {
        "xvcc"
    }

    fn layout(&self) -> Layout {
        LAYOUT.clone()
    }

    fn register_extractors(&self, extractors: &mut ExtractorRegistry) {
        extractors.register(RegionKind::CcSummary, cc_summary);
    }
}

fn cc_summary(region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let mut energy = DataMap::new();
    for rel in 1..region.len() {
        let Some(caps) = match_line(region, rel, &ENERGY) else {
            cx.skip_line(region, rel, "expected a reference, correlation or total energy");
            continue;
        };
        match parse_f64(&caps[2]) {
            Some(au) => {
                energy.insert(caps[1].to_string(), energy_au(au));
            }
            None => cx.skip_line(region, rel, "energy is not a number"),
        }
    }

    for component in COMPONENTS {
        if !energy.contains_key(component) {
            cx.mismatch(
                region.start,
                format!("CC summary has no {} energy", component),
            );
        }
    }

    let mut data = DataMap::new();
    data.insert("energy".into(), Value::Map(energy));
    Ok(data)
}
