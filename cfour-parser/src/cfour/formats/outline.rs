//! Outline formatter
//!
//! One line per region, two spaces of indentation per level of nesting:
//!
//! ```text
//! xncc [113-205]
//!   mp2 energy [118-120]
//!   cc [122-128]
//!     iterations [122-126]
//! ```
//!
//! A region flagged `ok == false` is followed by ` !`.

use crate::cfour::region::Region;

fn push_region(region: &Region, depth: usize, out: &mut Vec<String>) {
    let flag = if region.is_ok() { "" } else { " !" };
    out.push(format!(
        "{}{} [{}-{}]{}",
        "  ".repeat(depth),
        region.name,
        region.start,
        region.end,
        flag
    ));
    for child in &region.sections {
        push_region(child, depth + 1, out);
    }
}

/// Outline of several trees, without a trailing newline.
pub fn to_outline(regions: &[Region]) -> String {
    let mut out = Vec::new();
    for region in regions {
        push_region(region, 0, &mut out);
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfour::region::RegionKind;

    #[test]
    fn test_outline() {
        let lines = (0..5).map(|i| i.to_string()).collect();
        let mut program = Region::new("xtest", RegionKind::Program, 3, lines);
        let mut child = program.slice("block", RegionKind::Named("block"), 1, 2).unwrap();
        child.mark_failed();
        program.sections.push(child);

        assert_eq!(to_outline(&[program]), "xtest [3-7]\n  block [4-5] !");
        assert_eq!(to_outline(&[]), "");
    }
}
