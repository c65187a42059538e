//! xvee: EOM solutions per symmetry block and transition properties
//!
//! Transition properties are a fixed eight-line record starting at the right transition
//! moment:
//!
//! ```text
//! +0  Right Transition Moment     x y z
//! +1  Left Transition Moment      x y z
//! +2  Dipole Strength             x y z
//! +3  Oscillator Strength         x y z
//! +5  Transition energy   <eV> eV (   <nm> nm; <cm-1> cm-1)
//! +6  Total EOMEE-CCSD electronic energy   <au> a.u.
//! +7  Norm of oscillator strength :   <f>
//! ```

use super::common::{energy_au, expect_line, group_f64, group_i64, group_str, group_xyz};
use super::Grammar;
use crate::cfour::building::{EndRule, Layout, SectionRule};
use crate::cfour::data::{record, DataMap, Value};
use crate::cfour::error::ParseError;
use crate::cfour::extraction::columns::FLOAT;
use crate::cfour::extraction::{ExtractContext, ExtractorRegistry};
use crate::cfour::region::{Region, RegionKind};
use once_cell::sync::Lazy;
use regex::Regex;

static LAYOUT: Lazy<Layout> = Lazy::new(|| {
    Layout::new(vec![
        SectionRule::new(
            RegionKind::EomBlock,
            BLOCK_BEGIN,
            EndRule::pattern(&format!(
                r"Total (EOMEE-CCSDT?) electronic energy\s+{FLOAT}\s+a\.u\."
            ))
            .unwrap(),
        ),
        SectionRule::new(
            RegionKind::TransitionProperties,
            format!(r"Right Transition Moment\s+{FLOAT}\s+{FLOAT}\s+{FLOAT}"),
            EndRule::FixedOffset(7),
        ),
    ])
    .unwrap()
});

const BLOCK_BEGIN: &str = r"Beginning symmetry block\s*(\d+)\.\s*(\d+)\s*roots requested\.";

static BLOCK_START: Lazy<Regex> = Lazy::new(|| Regex::new(&format!("^{BLOCK_BEGIN}")).unwrap());

static TOTAL_ENERGY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^Total\s+(EOM..-CCSDT?)\s+electronic energy\s+{FLOAT}\s+a\.u\."
    ))
    .unwrap()
});

static VECTORS: Lazy<[(&'static str, &'static str, Regex); 4]> = Lazy::new(|| {
    let vector = |label: &str| Regex::new(&format!(r"^{label}\s+{FLOAT}\s+{FLOAT}\s+{FLOAT}")).unwrap();
    [
        ("right_tdm", "the right transition moment", vector("Right Transition Moment")),
        ("left_tdm", "the left transition moment", vector("Left Transition Moment")),
        ("dipole_strength", "the dipole strength", vector("Dipole Strength")),
        ("oscillator_strength", "the oscillator strength", vector("Oscillator Strength")),
    ]
});

static TRANSITION_ENERGY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^Transition energy\s+{FLOAT} eV\s+\(\s+{FLOAT}\s+nm;\s+{FLOAT}\s+cm-1\)"
    ))
    .unwrap()
});

static OSCILLATOR_NORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^Norm of oscillator strength :\s+{FLOAT}")).unwrap());

/// Offsets of the scalar lines below the right transition moment.
const TRANSITION_ENERGY_OFFSET: usize = 5;
const TOTAL_ENERGY_OFFSET: usize = 6;
const OSCILLATOR_NORM_OFFSET: usize = 7;

pub struct XveeGrammar;

impl Grammar for XveeGrammar {
    fn program(&self) -> &str {
        "xvee"
    }

    fn layout(&self) -> Layout {
        LAYOUT.clone()
    }

    fn register_extractors(&self, extractors: &mut ExtractorRegistry) {
        extractors.register(RegionKind::EomBlock, eom_block);
        extractors.register(RegionKind::TransitionProperties, transition_properties);
    }
}

fn eom_block(region: &Region, _cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let start = expect_line(region, 0, &BLOCK_START, "a symmetry block header")?;
    let last = region.len() - 1;
    let total = expect_line(region, last, &TOTAL_ENERGY, "the total EOM energy")?;
    Ok(record([
        ("irrep", Value::from(group_i64(&start, 1, region.start)?)),
        ("requested_roots", Value::from(group_i64(&start, 2, region.start)?)),
        ("model", Value::from(group_str(&total, 1))),
        (
            "energy",
            Value::Map(record([("total", energy_au(group_f64(&total, 2, region.end)?))])),
        ),
    ]))
}

fn transition_properties(
    region: &Region,
    _cx: &mut ExtractContext<'_>,
) -> Result<DataMap, ParseError> {
    let mut data = DataMap::new();
    for (rel, (key, what, pattern)) in VECTORS.iter().enumerate() {
        let caps = expect_line(region, rel, pattern, what)?;
        data.insert(key.to_string(), group_xyz(&caps, 1, region.absolute(rel))?);
    }

    let line = region.absolute(TRANSITION_ENERGY_OFFSET);
    let transition = expect_line(
        region,
        TRANSITION_ENERGY_OFFSET,
        &TRANSITION_ENERGY,
        "the transition energy",
    )?;
    let transition = record([
        ("eV", Value::from(group_f64(&transition, 1, line)?)),
        ("nm", Value::from(group_f64(&transition, 2, line)?)),
        ("cm-1", Value::from(group_f64(&transition, 3, line)?)),
    ]);

    let total = expect_line(region, TOTAL_ENERGY_OFFSET, &TOTAL_ENERGY, "the total EOM energy")?;
    data.insert("model".into(), Value::from(group_str(&total, 1)));
    data.insert(
        "energy".into(),
        Value::Map(record([
            ("transition", Value::Map(transition)),
            (
                "total",
                energy_au(group_f64(&total, 2, region.absolute(TOTAL_ENERGY_OFFSET))?),
            ),
        ])),
    );

    let norm = expect_line(
        region,
        OSCILLATOR_NORM_OFFSET,
        &OSCILLATOR_NORM,
        "the norm of the oscillator strength",
    )?;
    data.insert(
        "oscillator_strength_norm".into(),
        Value::from(group_f64(&norm, 1, region.absolute(OSCILLATOR_NORM_OFFSET))?),
    );
    Ok(data)
}
