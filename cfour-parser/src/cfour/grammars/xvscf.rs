//! xvscf: SCF energy and orbital eigenvalues
//!
//! The orbital listing is a fixed-column table. Its numeric half ends at column 57 and
//! is read with a pattern; the symmetry half is cut at fixed offsets because irrep
//! labels may contain spaces. Occupied and virtual orbitals are separated by a line of
//! 77 `+` characters and the listing ends at the first blank line.

use super::common::{energy_au, expect_line, group_f64};
use super::Grammar;
use crate::cfour::building::{EndRule, Layout, SectionRule};
use crate::cfour::data::{record, DataMap, Value};
use crate::cfour::error::ParseError;
use crate::cfour::extraction::columns::{
    column, column_from, parse_fortran_f64, parse_i64, split_at_column, FLOAT, FORTRAN_FLOAT, INT,
};
use crate::cfour::extraction::{ExtractContext, ExtractorRegistry};
use crate::cfour::region::{Region, RegionKind};
use once_cell::sync::Lazy;
use regex::Regex;

static LAYOUT: Lazy<Layout> = Lazy::new(|| {
    Layout::new(vec![
        SectionRule::new(
            RegionKind::ScfEnergy,
            format!(r"E\(SCF\)=\s+{FLOAT}\s+{FORTRAN_FLOAT}"),
            EndRule::FixedOffset(0),
        ),
        SectionRule::new(
            RegionKind::MolecularOrbitals,
            r"ORBITAL EIGENVALUES \(ALPHA\)  \(1H = 27\.2113819 eV\)",
            EndRule::BlankLine { skip: 4, count: 1 },
        ),
    ])
    .unwrap()
});

static SCF_ENERGY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^E\(SCF\)\s*=\s*{FLOAT}(?:\s+{FORTRAN_FLOAT})?")).unwrap()
});

static MO_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^MO\s*#\s*E\(hartree\)\s*E\(eV\)\s*FULLSYM\s*COMPSYM").unwrap());

static MO_NUMBERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^\s*{INT}\s+{INT}\s+{FLOAT}\s+{FLOAT}")).unwrap());

/// Column where the symmetry labels of an orbital row begin.
const SYMMETRY_COLUMN: usize = 57;

/// Offsets inside the symmetry half: full-group label, computational irrep, irrep index.
const FULLSYM: (usize, usize) = (0, 8);
const COMPSYM: (usize, usize) = (8, 19);
const COMPSYM_INDEX: usize = 19;

const OCCUPIED_SEPARATOR_WIDTH: usize = 77;

pub struct XvscfGrammar;

impl Grammar for XvscfGrammar {
    fn program(&self) -> &str {
        "xvscf"
    }

    fn layout(&self) -> Layout {
        LAYOUT.clone()
    }

    fn register_extractors(&self, extractors: &mut ExtractorRegistry) {
        extractors.register(RegionKind::ScfEnergy, scf_energy);
        extractors.register(RegionKind::MolecularOrbitals, molecular_orbitals);
    }
}

/// Final SCF energy, with the convergence measure when it is printed.
pub fn scf_energy(region: &Region, _cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let caps = expect_line(region, 0, &SCF_ENERGY, "an E(SCF) line")?;
    let mut data = record([("energy", energy_au(group_f64(&caps, 1, region.start)?))]);
    if let Some(convergence) = caps.get(2).and_then(|m| parse_fortran_f64(m.as_str())) {
        data.insert("energy_convergence".into(), Value::from(convergence));
    }
    Ok(data)
}

/// Parse one orbital row.
pub fn parse_orbital(line: &str) -> Option<Value> {
    let (numbers, symmetry) = split_at_column(line, SYMMETRY_COLUMN);
    let caps = MO_NUMBERS.captures(numbers)?;
    let energy_index: i64 = caps.get(1)?.as_str().parse().ok()?;
    let index: i64 = caps.get(2)?.as_str().parse().ok()?;
    let au: f64 = caps.get(3)?.as_str().parse().ok()?;
    let ev: f64 = caps.get(4)?.as_str().parse().ok()?;

    let irrep_index = column_from(symmetry, COMPSYM_INDEX)
        .trim_start_matches('(')
        .trim_end_matches(')');
    let irrep_index = parse_i64(irrep_index)?;

    Some(Value::Map(record([
        ("energy_index", Value::from(energy_index)),
        ("index", Value::from(index)),
        (
            "energy",
            Value::Map(record([("au", Value::from(au)), ("eV", Value::from(ev))])),
        ),
        ("fullsym", Value::from(column(symmetry, FULLSYM.0, FULLSYM.1))),
        (
            "compsym",
            Value::Map(record([
                ("name", Value::from(column(symmetry, COMPSYM.0, COMPSYM.1))),
                ("index", Value::from(irrep_index)),
            ])),
        ),
    ])))
}

/// Orbital eigenvalue listing, split into occupied and virtual orbitals.
pub fn molecular_orbitals(
    region: &Region,
    cx: &mut ExtractContext<'_>,
) -> Result<DataMap, ParseError> {
    expect_line(region, 2, &MO_HEADER, "the orbital column header")?;

    let separator = "+".repeat(OCCUPIED_SEPARATOR_WIDTH);
    let mut occupied = Vec::new();
    let mut virtuals = Vec::new();
    let mut seen_separator = false;

    for rel in 4..region.len() {
        let line = &region.lines[rel];
        let text = line.trim();
        if text.is_empty() {
            break;
        }
        if text == separator {
            seen_separator = true;
            continue;
        }
        match parse_orbital(line) {
            Some(orbital) if seen_separator => virtuals.push(orbital),
            Some(orbital) => occupied.push(orbital),
            None => cx.skip_line(region, rel, "orbital row does not match the listing columns"),
        }
    }

    if !seen_separator {
        cx.mismatch(
            region.start,
            "orbital listing has no separator between occupied and virtual orbitals",
        );
    }

    Ok(record([
        ("occupied", Value::List(occupied)),
        ("virtual", Value::List(virtuals)),
    ]))
}
