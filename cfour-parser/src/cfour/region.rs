//! Region tree
//!
//! A [`Region`] is the single node type of the recovered structure. It is used for a
//! whole program invocation and for every sub-region found inside it.
//!
//! ## Line numbers
//!
//! `start` and `end` are absolute, 1-indexed and inclusive: they point at lines of the
//! original log, no matter how deep the region sits in the tree. Scanning works with
//! 0-indexed positions relative to the region being scanned; [`Region::absolute`] and
//! [`Region::slice`] are the only places where the two are converted, so every child
//! carries provenance that is consistent with the whole file.
//!
//! ## Invariants
//!
//! - `start <= end` and `lines.len() == end - start + 1`
//! - children are disjoint, contained in the parent range and ordered by `start`
//! - `metadata.ok == false` means the region was bounded but something about its shape
//!   was inconsistent; `data` may still be partially filled

use super::data::DataMap;
use super::scanning::Marker;
use serde::Serialize;
use std::fmt;

/// The kind of a region, used to select its field extractor.
///
/// Program-level regions are always [`RegionKind::Program`]; every other variant
/// names one sub-region shape that a program grammar knows how to bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionKind {
    Program,
    // xjoda
    ControlParameters,
    Qcomp,
    NormalCoordinateGradient,
    NormalCoordinates,
    // SCF programs
    ScfEnergy,
    MolecularOrbitals,
    // xncc
    Mp2Energy,
    CcSolution,
    Iterations,
    EomSolution,
    EomIrrep,
    EomRoot,
    GuessVector,
    IterativeSolution,
    EomEnergy,
    ConvergedRoot,
    // xvcc
    CcSummary,
    // xvee
    EomBlock,
    TransitionProperties,
    // xsim
    XsimInput,
    Spectrum,
    /// Region shape declared by a user-supplied layout.
    Named(&'static str),
}

impl RegionKind {
    /// Section name printed for regions of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            RegionKind::Program => "program",
            RegionKind::ControlParameters => "control parameters",
            RegionKind::Qcomp => "qcomp",
            RegionKind::NormalCoordinateGradient => "normal coordinate gradient",
            RegionKind::NormalCoordinates => "normal coordinates",
            RegionKind::ScfEnergy => "scf energy",
            RegionKind::MolecularOrbitals => "molecular orbitals",
            RegionKind::Mp2Energy => "mp2 energy",
            RegionKind::CcSolution => "cc",
            RegionKind::Iterations => "iterations",
            RegionKind::EomSolution => "eom",
            RegionKind::EomIrrep => "irrep",
            RegionKind::EomRoot => "eom root",
            RegionKind::GuessVector => "guess vector",
            RegionKind::IterativeSolution => "iterative solution",
            RegionKind::EomEnergy => "eom energy",
            RegionKind::ConvergedRoot => "converged root",
            RegionKind::CcSummary => "cc summary",
            RegionKind::EomBlock => "eom solution",
            RegionKind::TransitionProperties => "transition properties",
            RegionKind::XsimInput => "input file",
            RegionKind::Spectrum => "spectrum",
            RegionKind::Named(name) => name,
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Reliability flags of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub ok: bool,
}

impl Default for Metadata {
    fn default() -> Self {
        Self { ok: true }
    }
}

/// A named, line-bounded node of the recovered structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub name: String,
    #[serde(skip)]
    pub kind: RegionKind,
    pub start: usize,
    pub end: usize,
    pub lines: Vec<String>,
    pub sections: Vec<Region>,
    pub data: DataMap,
    pub metadata: Metadata,
    /// Start marker the region was recognized by, relative to this region's lines.
    #[serde(skip)]
    pub marker: Option<Marker>,
}

impl Region {
    /// Create an empty region covering `lines`, the first of which is absolute line `start`.
    ///
    /// An empty `lines` is treated as a single empty line so that `start <= end` holds.
    pub fn new(
        name: impl Into<String>,
        kind: RegionKind,
        start: usize,
        mut lines: Vec<String>,
    ) -> Self {
        if lines.is_empty() {
            lines.push(String::new());
        }
        let end = start + lines.len() - 1;
        Self {
            name: name.into(),
            kind,
            start,
            end,
            lines,
            sections: Vec::new(),
            data: DataMap::new(),
            metadata: Metadata::default(),
            marker: None,
        }
    }

    /// Cut a child region out of this one using 0-indexed positions relative to `lines`.
    ///
    /// Returns `None` when the range is empty or falls outside this region.
    pub fn slice(
        &self,
        name: impl Into<String>,
        kind: RegionKind,
        rel_start: usize,
        rel_end: usize,
    ) -> Option<Region> {
        if rel_start > rel_end || rel_end >= self.lines.len() {
            return None;
        }
        let lines = self.lines[rel_start..=rel_end].to_vec();
        Some(Region::new(name, kind, self.absolute(rel_start), lines))
    }

    /// Absolute 1-indexed line number of the relative position `rel`.
    pub fn absolute(&self, rel: usize) -> usize {
        self.start + rel
    }

    /// Raw line at relative position `rel`.
    pub fn line(&self, rel: usize) -> Option<&str> {
        self.lines.get(rel).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
    }

    pub fn is_ok(&self) -> bool {
        self.metadata.ok
    }

    pub fn mark_failed(&mut self) {
        self.metadata.ok = false;
    }

    /// Whether `other` lies within this region's absolute range.
    pub fn contains(&self, other: &Region) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Merge extracted fields into the region; later values win on key collisions.
    pub fn merge_data(&mut self, data: DataMap) {
        self.data.extend(data);
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Region> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// Pre-order traversal of this region and all of its descendants.
    pub fn iter_depth_first(&self) -> DepthFirst<'_> {
        DepthFirst { stack: vec![self] }
    }

    /// First region of `kind` in depth-first order, this region included.
    pub fn find(&self, kind: RegionKind) -> Option<&Region> {
        self.iter_depth_first().find(|region| region.kind == kind)
    }

    /// All regions of `kind` in depth-first order, this region included.
    pub fn find_all(&self, kind: RegionKind) -> Vec<&Region> {
        self.iter_depth_first()
            .filter(|region| region.kind == kind)
            .collect()
    }

    /// Number of regions in this subtree.
    pub fn count(&self) -> usize {
        self.iter_depth_first().count()
    }
}

/// Iterator returned by [`Region::iter_depth_first`].
pub struct DepthFirst<'a> {
    stack: Vec<&'a Region>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a Region;

    fn next(&mut self) -> Option<Self::Item> {
        let region = self.stack.pop()?;
        self.stack.extend(region.sections.iter().rev());
        Some(region)
    }
}
