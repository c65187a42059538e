//! Run summary formatter
//!
//! One line per program invocation:
//!
//! ```text
//!     5 --    65: xjoda        took      0.17 sec.
//!   113 --   205: xncc         took      2.71 sec and returned 1.
//! ```

use crate::cfour::region::Region;

fn walltime(region: &Region) -> Option<f64> {
    region.data.get("walltime_seconds").and_then(|v| v.as_f64())
}

/// Describe one invocation by its range, wall time and exit status.
pub fn program_line(region: &Region) -> String {
    let took = match walltime(region) {
        Some(seconds) => format!("{:.2}", seconds),
        None => "?".to_string(),
    };
    let mut line = format!(
        "{:5} -- {:5}: {:12} took{:>10} sec",
        region.start, region.end, region.name, took
    );
    match region.data.get("exit_status").and_then(|v| v.as_i64()) {
        Some(status) if status != 0 => line.push_str(&format!(" and returned {}.", status)),
        _ => line.push('.'),
    }
    if !region.is_ok() {
        line.push_str(" (unreliable)");
    }
    line
}

/// Summary of a whole run, closed by the total wall time.
pub fn render(programs: &[Region]) -> String {
    let mut out = String::new();
    for program in programs {
        out.push_str(&program_line(program));
        out.push('\n');
    }
    let total: f64 = programs.iter().filter_map(walltime).sum();
    out.push_str(&format!(
        "{:>16}{:12} took{:>10} sec.\n",
        "",
        format!("{} programs", programs.len()),
        format!("{:.2}", total)
    ));
    out
}
