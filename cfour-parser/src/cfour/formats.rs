//! Rendering of recovered region trees
//!
//! - [provenance]: every region with its absolute line range, optionally with raw lines
//! - [summary]: one line per program invocation with its wall time and exit status
//! - [outline]: compact depth-indented tree, used for snapshots
//!
//! Structured output (JSON, YAML) goes through `serde`; [`Region`](super::Region)
//! serializes as `{name, start, end, lines, sections, data, metadata}`.

pub mod outline;
pub mod provenance;
pub mod summary;

pub use outline::to_outline;
pub use provenance::{introduce, listing, render_tree};
pub use summary::program_line;
