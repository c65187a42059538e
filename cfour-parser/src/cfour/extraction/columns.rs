//! Line splitting helpers
//!
//! Two table shapes appear in the logs. Fixed-column tables are cut at character
//! offsets because their cells may contain spaces, or may run into each other when a
//! value is wide. Whitespace records are split on runs of blanks and mapped by position.

use once_cell::sync::Lazy;
use regex::Regex;

/// Signed decimal with a mandatory fractional part.
pub const FLOAT: &str = r"([+-]?\d+\.\d+)";

/// Signed integer.
pub const INT: &str = r"([+-]?\d+)";

/// Decimal with a Fortran `D` exponent, e.g. `0.1234D-07`.
pub const FORTRAN_FLOAT: &str = r"([+-]?\d+\.\d+D[+-]?\d+)";

static FORTRAN: Lazy<Regex> = Lazy::new(|| Regex::new(&format!("^{FORTRAN_FLOAT}$")).unwrap());

/// Characters `start..end` of `line`, trimmed; missing characters are treated as blanks.
pub fn column(line: &str, start: usize, end: usize) -> &str {
    let from = byte_offset(line, start);
    let to = byte_offset(line, end.max(start));
    line[from..to].trim()
}

/// Characters from `start` to the end of `line`, trimmed.
pub fn column_from(line: &str, start: usize) -> &str {
    line[byte_offset(line, start)..].trim()
}

/// Split `line` at character offset `at` into a head and a tail.
pub fn split_at_column(line: &str, at: usize) -> (&str, &str) {
    line.split_at(byte_offset(line, at))
}

fn byte_offset(line: &str, chars: usize) -> usize {
    line.char_indices()
        .nth(chars)
        .map(|(offset, _)| offset)
        .unwrap_or(line.len())
}

/// Whitespace-separated tokens of `line`.
pub fn tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

pub fn parse_f64(token: &str) -> Option<f64> {
    token.trim().parse().ok()
}

pub fn parse_i64(token: &str) -> Option<i64> {
    token.trim().parse().ok()
}

/// Parse a Fortran double such as `0.5D-08`.
pub fn parse_fortran_f64(token: &str) -> Option<f64> {
    let token = token.trim();
    if !FORTRAN.is_match(token) {
        return None;
    }
    token.replace('D', "e").parse().ok()
}

/// Parse every token of `tokens` as a float, failing on the first bad one.
pub fn parse_floats(tokens: &[&str]) -> Option<Vec<f64>> {
    tokens.iter().map(|token| parse_f64(token)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_columns_keep_embedded_spaces() {
        let line = format!("{:<28}{:<6}{}", "EXCITE", "IEXCIT", "EOMEE  [  3]");
        assert_eq!(column(&line, 0, 28), "EXCITE");
        assert_eq!(column(&line, 28, 34), "IEXCIT");
        assert_eq!(column_from(&line, 34), "EOMEE  [  3]");
    }

    #[test]
    fn test_short_lines_yield_empty_columns() {
        assert_eq!(column("ABC", 5, 10), "");
        assert_eq!(column_from("ABC", 5), "");
        assert_eq!(split_at_column("ABC", 10), ("ABC", ""));
    }

    #[test]
    fn test_fortran_float() {
        assert_eq!(parse_fortran_f64("0.5D-08"), Some(0.5e-8));
        assert_eq!(parse_fortran_f64("-1.25D+02"), Some(-125.0));
        assert_eq!(parse_fortran_f64("1.25"), None);
    }

    #[test]
    fn test_parse_floats() {
        assert_eq!(parse_floats(&["1.0", "-2.5"]), Some(vec![1.0, -2.5]));
        assert_eq!(parse_floats(&["1.0", "x"]), None);
    }
}
