//! xjoda: input processing and geometry
//!
//! Recognized sections:
//!
//! - control parameters: fixed-column keyword table framed by 67-dash delimiters,
//!   with the title line sitting between two of them
//! - qcomp: Cartesian geometry used in the calculation, one atom per line
//! - normal coordinate gradient: one vibrational mode per line
//! - normal coordinates: blocks of up to three modes; every block repeats the
//!   symmetry / frequency / kind header rows, followed by one row per atom holding
//!   three displacements per mode

use super::Grammar;
use crate::cfour::building::{EndRule, Layout, SectionRule};
use crate::cfour::data::{record, DataMap, Value};
use crate::cfour::error::ParseError;
use crate::cfour::extraction::columns::{
    column, column_from, parse_f64, parse_floats, parse_i64, split_at_column, tokens,
};
use crate::cfour::extraction::{ExtractContext, ExtractorRegistry};
use crate::cfour::region::{Region, RegionKind};
use once_cell::sync::Lazy;

static LAYOUT: Lazy<Layout> = Lazy::new(|| {
    Layout::new(vec![
        SectionRule::new(
            RegionKind::ControlParameters,
            r"CFOUR Control Parameters",
            EndRule::delimiter('-', 67, &[-1, 1, 4], 5),
        )
        .with_lead(1),
        SectionRule::new(
            RegionKind::Qcomp,
            r"Coordinates used in calculation \(QCOMP\)",
            EndRule::delimiter('-', 64, &[-1, 1, 4], 5),
        )
        .with_lead(1),
        SectionRule::new(
            RegionKind::NormalCoordinateGradient,
            r"Normal Coordinate Gradient",
            EndRule::delimiter('-', 71, &[1, 4], 5),
        ),
        SectionRule::new(
            RegionKind::NormalCoordinates,
            r"Normal Coordinates",
            EndRule::delimiter('-', 74, &[], 1),
        ),
    ])
    .unwrap()
});

/// Column boundaries of the control parameter table.
const EXTERNAL_NAME: (usize, usize) = (0, 28);
const INTERNAL_NAME: (usize, usize) = (28, 34);
const VALUE_FROM: usize = 34;

/// Atom symbol width in the normal coordinate rows.
const ATOM_SYMBOL_WIDTH: usize = 7;

/// Width of the first displacement, which may run into the second one.
const FIRST_DISPLACEMENT_WIDTH: usize = 6;

pub struct XjodaGrammar;

impl Grammar for XjodaGrammar {
    fn program(&self) -> &str {
        "xjoda"
    }

    fn layout(&self) -> Layout {
        LAYOUT.clone()
    }

    fn register_extractors(&self, extractors: &mut ExtractorRegistry) {
        extractors.register(RegionKind::ControlParameters, control_parameters);
        extractors.register(RegionKind::Qcomp, qcomp);
        extractors.register(RegionKind::NormalCoordinateGradient, normal_coordinate_gradient);
        extractors.register(RegionKind::NormalCoordinates, normal_coordinates);
    }
}

/// Relative positions of the table rows between a header of `header` lines and the
/// closing delimiter.
fn table_rows(region: &Region, header: usize) -> std::ops::Range<usize> {
    header..region.len().saturating_sub(1).max(header)
}

pub fn control_parameters(
    region: &Region,
    cx: &mut ExtractContext<'_>,
) -> Result<DataMap, ParseError> {
    let mut parameters = DataMap::new();
    for rel in table_rows(region, 6) {
        let line = &region.lines[rel];
        if line.trim().is_empty() {
            continue;
        }
        let external = column(line, EXTERNAL_NAME.0, EXTERNAL_NAME.1);
        let internal = column(line, INTERNAL_NAME.0, INTERNAL_NAME.1);
        if external.is_empty() || internal.is_empty() {
            cx.skip_line(region, rel, "control parameter row lacks a keyword name");
            continue;
        }
        parameters.insert(
            external.to_string(),
            Value::Map(record([
                ("internal_name", Value::from(internal)),
                ("value", Value::from(column_from(line, VALUE_FROM))),
            ])),
        );
    }
    Ok(record([("parameters", Value::Map(parameters))]))
}

pub fn qcomp(region: &Region, cx: &mut ExtractContext<'_>) -> Result<DataMap, ParseError> {
    let mut atoms = Vec::new();
    for rel in table_rows(region, 6) {
        let line = &region.lines[rel];
        if line.trim().is_empty() {
            continue;
        }
        let fields = tokens(line);
        let atom = match fields.as_slice() {
            [symbol, number, x, y, z, ..] => parse_i64(number)
                .zip(parse_floats(&[*x, *y, *z]))
                .map(|(number, xyz)| {
                    record([
                        ("symbol", Value::from(*symbol)),
                        ("atomic_number", Value::from(number)),
                        (
                            "coordinates",
                            Value::List(xyz.into_iter().map(Value::from).collect()),
                        ),
                    ])
                }),
            _ => None,
        };
        match atom {
            Some(atom) => atoms.push(Value::Map(atom)),
            None => cx.skip_line(region, rel, "expected symbol, atomic number and three coordinates"),
        }
    }
    Ok(record([("geometry_au", Value::List(atoms))]))
}

pub fn normal_coordinate_gradient(
    region: &Region,
    cx: &mut ExtractContext<'_>,
) -> Result<DataMap, ParseError> {
    const FIELDS: [&str; 5] = ["omega", "de_dq_au", "de_dq_cm", "de_dq_ev", "ratio"];
    let mut modes = Vec::new();
    for rel in table_rows(region, 5) {
        let line = &region.lines[rel];
        if line.trim().is_empty() {
            continue;
        }
        let fields = tokens(line);
        let parsed = match fields.as_slice() {
            [mode, rest @ ..] if rest.len() >= FIELDS.len() => {
                parse_i64(mode).zip(parse_floats(&rest[..FIELDS.len()]))
            }
            _ => None,
        };
        let Some((mode, values)) = parsed else {
            cx.skip_line(region, rel, "expected mode number and five gradient values");
            continue;
        };
        let mut row = record([("mode", Value::from(mode))]);
        for (key, value) in FIELDS.iter().zip(values) {
            row.insert(key.to_string(), Value::from(value));
        }
        modes.push(Value::Map(row));
    }
    Ok(record([("gradient", Value::List(modes))]))
}

/// Split the rows of the normal coordinate listing into blank-separated blocks.
fn blocks(region: &Region) -> Vec<Vec<(usize, &str)>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for rel in table_rows(region, 2) {
        let line = region.lines[rel].as_str();
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push((rel, line));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Displacements of one atom row; the first two numbers may be printed without a gap.
fn displacements(line: &str) -> Option<(String, Vec<f64>)> {
    let (symbol, rest) = split_at_column(line, ATOM_SYMBOL_WIDTH);
    let (first, others) = split_at_column(rest, FIRST_DISPLACEMENT_WIDTH);
    let joined = format!("{} {}", first, others);
    let values = parse_floats(&tokens(&joined))?;
    Some((symbol.trim().to_string(), values))
}

pub fn normal_coordinates(
    region: &Region,
    cx: &mut ExtractContext<'_>,
) -> Result<DataMap, ParseError> {
    let mut modes = Vec::new();
    // Atom rows per block, taken from the first block with a complete header
    let mut atom_rows: Option<usize> = None;

    for block in blocks(region) {
        let (header_rel, first) = block[0];
        if displacements(first).is_some() {
            cx.mismatch(
                region.absolute(header_rel),
                format!(
                    "{} atom rows follow a blank line without a block header",
                    block.len()
                ),
            );
            continue;
        }
        if block.len() < 3 {
            cx.mismatch(
                region.absolute(header_rel),
                "normal coordinate block is missing its symmetry, frequency or kind row",
            );
            continue;
        }
        let symmetries = tokens(block[0].1);
        let Some(frequencies) = tokens(block[1].1)
            .into_iter()
            .map(parse_f64)
            .collect::<Option<Vec<_>>>()
        else {
            cx.skip_line(region, block[1].0, "frequency row is not numeric");
            continue;
        };
        let kinds = tokens(block[2].1);

        let rows = block.len() - 3;
        match atom_rows {
            None => atom_rows = Some(rows),
            Some(expected) if expected != rows => cx.mismatch(
                region.absolute(header_rel),
                format!(
                    "block lists {} atoms where the first block lists {}",
                    rows, expected
                ),
            ),
            Some(_) => {}
        }

        let mut width = symmetries.len();
        if frequencies.len() != width || kinds.len() != width {
            cx.mismatch(
                region.absolute(header_rel),
                format!(
                    "block header lists {} symmetries, {} frequencies and {} kinds",
                    symmetries.len(),
                    frequencies.len(),
                    kinds.len()
                ),
            );
            width = width.min(frequencies.len()).min(kinds.len());
        }

        let mut coordinates: Vec<Vec<Value>> = vec![Vec::new(); width];
        for &(rel, line) in &block[3..] {
            let Some((symbol, values)) = displacements(line) else {
                cx.skip_line(region, rel, "atom row holds a non-numeric displacement");
                continue;
            };
            if values.len() != 3 * width {
                cx.mismatch(
                    region.absolute(rel),
                    format!(
                        "atom row holds {} displacements for {} modes",
                        values.len(),
                        width
                    ),
                );
            }
            for (mode, xyz) in coordinates.iter_mut().zip(values.chunks_exact(3)) {
                let mut atom = record([("symbol", Value::from(symbol.as_str()))]);
                atom.insert("x".into(), Value::from(xyz[0]));
                atom.insert("y".into(), Value::from(xyz[1]));
                atom.insert("z".into(), Value::from(xyz[2]));
                mode.push(Value::Map(atom));
            }
        }

        for (index, atoms) in coordinates.into_iter().enumerate() {
            modes.push(Value::Map(record([
                ("symmetry", Value::from(symmetries[index])),
                ("frequency_cm", Value::from(frequencies[index])),
                ("kind", Value::from(kinds[index])),
                ("coordinates", Value::List(atoms)),
            ])));
        }
    }

    Ok(record([("modes", Value::List(modes))]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfour::building::build_sections;
    use crate::cfour::diagnostics::{Diagnostic, DiagnosticKind};

    fn region(kind: RegionKind, texts: &[String]) -> Region {
        Region::new(kind.name(), kind, 100, texts.to_vec())
    }

    fn run(
        extractor: fn(&Region, &mut ExtractContext<'_>) -> Result<DataMap, ParseError>,
        region: &Region,
    ) -> (DataMap, Vec<Diagnostic>) {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut cx = ExtractContext::new("xjoda", &mut diagnostics);
        let data = extractor(region, &mut cx).unwrap();
        drop(cx);
        (data, diagnostics)
    }

    fn control_table(rows: &[String]) -> Vec<String> {
        let delim = "-".repeat(67);
        let mut lines = vec![
            format!("  {delim}"),
            "               CFOUR Control Parameters".to_string(),
            format!("  {delim}"),
            "        External           Internal           Value".to_string(),
            "          Name               Name".to_string(),
            format!("  {delim}"),
        ];
        lines.extend(rows.iter().cloned());
        lines.push(format!("  {delim}"));
        lines
    }

    #[test]
    fn test_control_parameters_fixed_columns() {
        let rows = vec![
            format!("{:<28}{:<6}{}", "  CALCLEVEL", "ICLLVL", "CCSD  [ 10]"),
            format!("{:<28}{:<6}{}", "  BASIS", "IBASIS", "PVDZ"),
        ];
        let (data, diagnostics) = run(
            control_parameters,
            &region(RegionKind::ControlParameters, &control_table(&rows)),
        );
        assert!(diagnostics.is_empty());
        let parameters = data["parameters"].as_map().unwrap();
        assert_eq!(parameters.len(), 2);
        assert_eq!(
            parameters["CALCLEVEL"].get("value"),
            Some(&Value::from("CCSD  [ 10]"))
        );
        assert_eq!(
            parameters["BASIS"].get("internal_name"),
            Some(&Value::from("IBASIS"))
        );
    }

    #[test]
    fn test_control_parameters_layout_bounds() {
        let rows = vec![format!("{:<28}{:<6}{}", "  BASIS", "IBASIS", "PVDZ")];
        let mut lines = vec!["--invoking executable--".to_string(), "xjoda".to_string()];
        lines.extend(control_table(&rows));
        lines.push("trailer".to_string());
        let mut program = Region::new("xjoda", RegionKind::Program, 1, lines);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        build_sections(&mut program, &LAYOUT, "xjoda", &mut diagnostics);
        assert!(diagnostics.is_empty());
        let table = &program.sections[0];
        assert_eq!(table.kind, RegionKind::ControlParameters);
        assert_eq!((table.start, table.end), (3, 10));
        assert!(table.is_ok());
    }

    #[test]
    fn test_qcomp_skips_bad_row() {
        let delim = "-".repeat(64);
        let lines = vec![
            format!(" {delim}"),
            "         Coordinates used in calculation (QCOMP)".to_string(),
            format!(" {delim}"),
            " Z-matrix   Atomic            Coordinates (in bohr)".to_string(),
            "  Symbol    Number           X              Y              Z".to_string(),
            format!(" {delim}"),
            "     O         8         0.00000000     0.00000000    -0.12000000".to_string(),
            "     H         1         0.00000000    -1.43000000    broken".to_string(),
            "     H         1         0.00000000     1.43000000     0.98000000".to_string(),
            format!(" {delim}"),
        ];
        let (data, diagnostics) = run(qcomp, &region(RegionKind::Qcomp, &lines));
        let atoms = data["geometry_au"].as_list().unwrap();
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms[0].get("atomic_number"), Some(&Value::Integer(8)));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::FieldParseFailure);
        assert_eq!(diagnostics[0].line, 107);
    }

    #[test]
    fn test_gradient_ratio_is_last_column() {
        let delim = "-".repeat(71);
        let lines = vec![
            "                     Normal Coordinate Gradient".to_string(),
            format!(" {delim}"),
            "  Mode    Omega        dE/dQ".to_string(),
            "                a.u.   cm-1   eV   ratio".to_string(),
            format!(" {delim}"),
            "     1   1650.10   0.00120   263.40   0.03266   0.15962".to_string(),
            format!(" {delim}"),
        ];
        let (data, _) = run(
            normal_coordinate_gradient,
            &region(RegionKind::NormalCoordinateGradient, &lines),
        );
        let row = &data["gradient"].as_list().unwrap()[0];
        assert_eq!(row.get("mode"), Some(&Value::Integer(1)));
        assert_eq!(row.get("ratio").and_then(Value::as_f64), Some(0.15962));
        assert_eq!(row.get("de_dq_ev").and_then(Value::as_f64), Some(0.03266));
    }

    #[test]
    fn test_normal_coordinates_merged_columns() {
        let lines = vec![
            "                                   Normal Coordinates".to_string(),
            String::new(),
            "                A1                        B2".to_string(),
            "              1650.10                   3800.20".to_string(),
            "             VIBRATION                 VIBRATION".to_string(),
            " O      0.000-0.0000  0.0700    0.0000  0.0000 -0.0700".to_string(),
            " H      0.431 0.0000 -0.5600   -0.4310  0.0000  0.5600".to_string(),
            String::new(),
            "-".repeat(74),
        ];
        let (data, diagnostics) = run(normal_coordinates, &region(RegionKind::NormalCoordinates, &lines));
        assert!(diagnostics.is_empty());
        let modes = data["modes"].as_list().unwrap();
        assert_eq!(modes.len(), 2);
        assert_eq!(modes[1].get("symmetry"), Some(&Value::from("B2")));
        let oxygen = &modes[0].get("coordinates").unwrap().as_list().unwrap()[0];
        assert_eq!(oxygen.get("symbol"), Some(&Value::from("O")));
        assert_eq!(oxygen.get("y").and_then(Value::as_f64), Some(-0.0));
        assert_eq!(oxygen.get("z").and_then(Value::as_f64), Some(0.07));
    }

    #[test]
    fn test_normal_coordinates_count_mismatch_keeps_aligned_columns() {
        let lines = vec![
            "Normal Coordinates".to_string(),
            String::new(),
            "                A1                        B2".to_string(),
            "              1650.10                   3800.20".to_string(),
            "             VIBRATION                 VIBRATION".to_string(),
            " O      0.000 0.0000  0.0700    0.0000".to_string(),
            "-".repeat(74),
        ];
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut cx = ExtractContext::new("xjoda", &mut diagnostics);
        let data = normal_coordinates(&region(RegionKind::NormalCoordinates, &lines), &mut cx).unwrap();
        assert!(cx.is_degraded());
        drop(cx);
        let modes = data["modes"].as_list().unwrap();
        assert_eq!(modes[0].get("coordinates").unwrap().as_list().unwrap().len(), 1);
        assert!(modes[1].get("coordinates").unwrap().as_list().unwrap().is_empty());
        assert_eq!(diagnostics[0].kind, DiagnosticKind::StructuralMismatch);
    }

    fn two_block_listing(second_block_atoms: &[&str]) -> Vec<String> {
        let mut lines = vec![
            "Normal Coordinates".to_string(),
            String::new(),
            "                A1                        B2".to_string(),
            "              1650.10                   3800.20".to_string(),
            "             VIBRATION                 VIBRATION".to_string(),
            " O      0.000-0.0000  0.0700    0.0000  0.0000 -0.0700".to_string(),
            " H      0.431 0.0000 -0.5600   -0.4310  0.0000  0.5600".to_string(),
            " H     -0.431 0.0000 -0.5600    0.4310  0.0000  0.5600".to_string(),
            String::new(),
            "                A1".to_string(),
            "              3900.30".to_string(),
            "             VIBRATION".to_string(),
        ];
        lines.extend(second_block_atoms.iter().map(|s| s.to_string()));
        lines.push(String::new());
        lines.push("-".repeat(74));
        lines
    }

    #[test]
    fn test_normal_coordinates_blocks_agree_on_atoms() {
        let lines = two_block_listing(&[
            " O      0.000 0.0000  0.0500",
            " H      0.000 0.5800  0.4000",
            " H      0.000-0.5800  0.4000",
        ]);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut cx = ExtractContext::new("xjoda", &mut diagnostics);
        let data = normal_coordinates(&region(RegionKind::NormalCoordinates, &lines), &mut cx).unwrap();
        assert!(!cx.is_degraded());
        drop(cx);
        assert!(diagnostics.is_empty());
        let counts: Vec<usize> = data["modes"]
            .as_list()
            .unwrap()
            .iter()
            .map(|m| m.get("coordinates").unwrap().as_list().unwrap().len())
            .collect();
        assert_eq!(counts, vec![3, 3, 3]);
    }

    #[test]
    fn test_normal_coordinates_block_atom_count_mismatch() {
        let lines = two_block_listing(&[" O      0.000 0.0000  0.0500"]);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut cx = ExtractContext::new("xjoda", &mut diagnostics);
        let data = normal_coordinates(&region(RegionKind::NormalCoordinates, &lines), &mut cx).unwrap();
        assert!(cx.is_degraded());
        drop(cx);

        let counts: Vec<usize> = data["modes"]
            .as_list()
            .unwrap()
            .iter()
            .map(|m| m.get("coordinates").unwrap().as_list().unwrap().len())
            .collect();
        assert_eq!(counts, vec![3, 3, 1]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::StructuralMismatch);
        // Header of the second block, relative line 9
        assert_eq!(diagnostics[0].line, 109);
    }

    #[test]
    fn test_normal_coordinates_blank_line_inside_block() {
        let mut lines = two_block_listing(&[
            " O      0.000 0.0000  0.0500",
            " H      0.000 0.5800  0.4000",
            " H      0.000-0.5800  0.4000",
        ]);
        lines.insert(7, String::new());
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut cx = ExtractContext::new("xjoda", &mut diagnostics);
        let data = normal_coordinates(&region(RegionKind::NormalCoordinates, &lines), &mut cx).unwrap();
        assert!(cx.is_degraded());
        drop(cx);

        assert_eq!(data["modes"].as_list().unwrap().len(), 3);
        let found: Vec<_> = diagnostics.iter().map(|d| (d.kind, d.line)).collect();
        assert_eq!(
            found,
            vec![
                (DiagnosticKind::StructuralMismatch, 108),
                (DiagnosticKind::StructuralMismatch, 110),
            ]
        );
    }
}
