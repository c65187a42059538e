//! Helpers shared by the program grammars

use crate::cfour::data::{record, Value};
use crate::cfour::error::ParseError;
use crate::cfour::region::Region;
use regex::{Captures, Regex};

/// Match `pattern` against the trimmed line at relative position `rel`.
///
/// A missing or non-matching line is a `FatalPrecondition` for the calling extractor.
pub fn expect_line<'r>(
    region: &'r Region,
    rel: usize,
    pattern: &Regex,
    what: &str,
) -> Result<Captures<'r>, ParseError> {
    region
        .line(rel)
        .and_then(|line| pattern.captures(line.trim()))
        .ok_or_else(|| {
            ParseError::precondition(
                region.absolute(rel),
                format!("expected {} in `{}`", what, region.name),
            )
        })
}

/// Like [`expect_line`], but a mismatch yields `None` instead of an error.
pub fn match_line<'r>(region: &'r Region, rel: usize, pattern: &Regex) -> Option<Captures<'r>> {
    region
        .line(rel)
        .and_then(|line| pattern.captures(line.trim()))
}

/// Capture group `index` parsed as a float.
pub fn group_f64(caps: &Captures<'_>, index: usize, line: usize) -> Result<f64, ParseError> {
    caps.get(index)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| ParseError::field(line, format!("group {} is not a number", index)))
}

/// Capture group `index` parsed as an integer.
pub fn group_i64(caps: &Captures<'_>, index: usize, line: usize) -> Result<i64, ParseError> {
    caps.get(index)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| ParseError::field(line, format!("group {} is not an integer", index)))
}

/// Capture group `index` as text.
pub fn group_str(caps: &Captures<'_>, index: usize) -> String {
    caps.get(index)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Capture group `index` of the region's start marker.
pub fn marker_capture(region: &Region, index: usize) -> Option<&str> {
    region.marker.as_ref().and_then(|marker| marker.capture(index))
}

/// Energy record in atomic units.
pub fn energy_au(au: f64) -> Value {
    Value::Map(record([("au", Value::from(au))]))
}

/// Three captured floats starting at group `first`, as an `x`/`y`/`z` record.
pub fn group_xyz(caps: &Captures<'_>, first: usize, line: usize) -> Result<Value, ParseError> {
    Ok(crate::cfour::data::xyz(
        group_f64(caps, first, line)?,
        group_f64(caps, first + 1, line)?,
        group_f64(caps, first + 2, line)?,
    ))
}
