//! xdqcscf: SCF energy and orbital eigenvalues of the direct-minimization SCF
//!
//! The orbital listing is printed in the same columns as [`super::xvscf`]; only the
//! title line differs, in the hartree to eV constant it prints.

use super::xvscf::{molecular_orbitals, scf_energy};
use super::Grammar;
use crate::cfour::building::{EndRule, Layout, SectionRule};
use crate::cfour::extraction::columns::FLOAT;
use crate::cfour::extraction::ExtractorRegistry;
use crate::cfour::region::RegionKind;
use once_cell::sync::Lazy;

static LAYOUT: Lazy<Layout> = Lazy::new(|| {
    Layout::new(vec![
        SectionRule::new(
            RegionKind::ScfEnergy,
            format!(r"E\(SCF\) =\s+{FLOAT}"),
            EndRule::FixedOffset(0),
        ),
        SectionRule::new(
            RegionKind::MolecularOrbitals,
            r"ORBITAL EIGENVALUES \(ALPHA\)  \(1H = 27\.2113834 eV\)",
            EndRule::BlankLine { skip: 4, count: 1 },
        ),
    ])
    .unwrap()
});

pub struct XdqcscfGrammar;

impl Grammar for XdqcscfGrammar {
    fn program(&self) -> &str {
        "xdqcscf"
    }

    fn layout(&self) -> Layout {
        LAYOUT.clone()
    }

    fn register_extractors(&self, extractors: &mut ExtractorRegistry) {
        extractors.register(RegionKind::ScfEnergy, scf_energy);
        extractors.register(RegionKind::MolecularOrbitals, molecular_orbitals);
    }
}
