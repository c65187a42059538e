//! Provenance formatter
//!
//! Maps every region back to the lines of the log it was cut from. The detail level
//! grows with `level`:
//!
//! - 0: nothing
//! - 1: `start - end: name`
//! - 2: plus the names of the children and the extracted data keys
//! - 3: plus the raw lines of every leaf region, numbered as in the log
//!
//! ```text
//!    66 -    92: xvscf
//!                => scf energy, molecular orbitals
//!                => exit_status, walltime_seconds
//! ```

use crate::cfour::region::Region;

/// Width of the `start - end: ` prefix, continuation lines are aligned after it.
const PREFIX_WIDTH: usize = 15;

/// Describe one region, without its children.
pub fn introduce(region: &Region, level: u8) -> String {
    if level == 0 {
        return String::new();
    }
    let mut out = format!("{:5} - {:5}: {}", region.start, region.end, region.name);
    if !region.is_ok() {
        out.push_str(" (unreliable)");
    }
    if level > 1 {
        let pad = " ".repeat(PREFIX_WIDTH);
        if !region.sections.is_empty() {
            let names: Vec<&str> = region.sections.iter().map(|s| s.name.as_str()).collect();
            out.push_str(&format!("\n{}=> {}", pad, names.join(", ")));
        }
        if !region.data.is_empty() {
            let keys: Vec<&str> = region.data.keys().map(String::as_str).collect();
            out.push_str(&format!("\n{}=> {}", pad, keys.join(", ")));
        }
    }
    out
}

/// The raw lines of a region prefixed with their absolute line numbers.
pub fn listing(region: &Region) -> String {
    region
        .lines
        .iter()
        .enumerate()
        .map(|(rel, line)| format!("{:6}:{}", region.absolute(rel), line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_tree(region: &Region, level: u8, depth: usize, out: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let mut text = introduce(region, level);
    if level > 2 && region.sections.is_empty() {
        text.push('\n');
        text.push_str(&listing(region));
    }
    out.extend(text.lines().map(|line| format!("{}{}", indent, line)));
    for child in &region.sections {
        push_tree(child, level, depth + 1, out);
    }
}

/// Describe a whole tree, indented by depth.
pub fn render_tree(region: &Region, level: u8) -> String {
    if level == 0 {
        return String::new();
    }
    let mut out = Vec::new();
    push_tree(region, level, 0, &mut out);
    out.join("\n")
}

/// Render every program of a log, one tree after the other.
pub fn render(programs: &[Region], level: u8) -> String {
    let mut out = String::new();
    for program in programs {
        let tree = render_tree(program, level);
        if !tree.is_empty() {
            out.push_str(&tree);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfour::data::{record, Value};
    use crate::cfour::region::RegionKind;

    fn program() -> Region {
        let lines = ["begin", "E(SCF)= -76.0", "end"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut program = Region::new("xvscf", RegionKind::Program, 66, lines);
        let mut energy = program.slice("scf energy", RegionKind::ScfEnergy, 1, 1).unwrap();
        energy.merge_data(record([("energy", Value::from(-76.0))]));
        program.sections.push(energy);
        program.merge_data(record([("exit_status", Value::from(0_i64))]));
        program
    }

    #[test]
    fn test_introduce() {
        let program = program();
        assert_eq!(introduce(&program, 1), "   66 -    68: xvscf");
        assert_eq!(
            introduce(&program, 2),
            "   66 -    68: xvscf\n               => scf energy\n               => exit_status"
        );
    }

    #[test]
    fn test_listing() {
        assert_eq!(
            listing(&program()),
            "    66:begin\n    67:E(SCF)= -76.0\n    68:end"
        );
    }

    #[test]
    fn test_render_tree_levels() {
        let program = program();
        assert_eq!(render_tree(&program, 0), "");
        assert_eq!(
            render_tree(&program, 1),
            "   66 -    68: xvscf\n     67 -    67: scf energy"
        );
        let detailed = render_tree(&program, 3);
        assert!(detailed.ends_with("     67 -    67: scf energy\n                 => energy\n      67:E(SCF)= -76.0"));
    }

    #[test]
    fn test_level_zero_prints_nothing() {
        let programs = vec![program(), program()];
        assert_eq!(introduce(&programs[0], 0), "");
        assert_eq!(render(&programs, 0), "");
        assert_eq!(render(&programs, 1).lines().count(), 4);
    }

    #[test]
    fn test_unreliable_region_is_marked() {
        let mut program = program();
        program.mark_failed();
        assert_eq!(introduce(&program, 1), "   66 -    68: xvscf (unreliable)");
    }
}
