//! Iterative convergence tracking
//!
//! Coupled-cluster and EOM solvers print a "beginning iterative solution" line, a trace
//! of iterations, and a "converged in N cycles" line. The tracker walks the lines of a
//! region through four states:
//!
//! ```text
//! Searching --begin--> InIterations --converged--> Converged
//!                           |
//!                           +--end of region--> Failed
//! ```
//!
//! A region that ends while iterating is reported as `Failed`; the caller decides how to
//! report it, and nothing is raised.

use crate::cfour::data::{record, DataMap, Value};
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceState {
    Searching,
    InIterations,
    Converged,
    Failed,
}

impl fmt::Display for ConvergenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceState::Searching => write!(f, "not started"),
            ConvergenceState::InIterations => write!(f, "iterating"),
            ConvergenceState::Converged => write!(f, "converged"),
            ConvergenceState::Failed => write!(f, "failed"),
        }
    }
}

/// Patterns recognizing the two transitions.
///
/// `begin` may capture the model as `model`; `converged` may capture `cycles`,
/// `seconds` and `gflops`.
#[derive(Debug, Clone)]
pub struct ConvergencePatterns {
    pub begin: Regex,
    pub converged: Regex,
}

/// Outcome of tracking one region.
#[derive(Debug, Clone, PartialEq)]
pub struct Convergence {
    pub state: ConvergenceState,
    pub model: Option<String>,
    /// Relative line of the begin marker.
    pub began_at: Option<usize>,
    /// Relative line of the converged marker.
    pub converged_at: Option<usize>,
    pub cycles: Option<i64>,
    pub seconds: Option<f64>,
    pub gflops: Option<f64>,
}

impl Convergence {
    pub fn to_data(&self) -> DataMap {
        let mut data = record([("status", Value::from(self.state.to_string()))]);
        if let Some(model) = &self.model {
            data.insert("model".into(), Value::from(model.as_str()));
        }
        if let Some(cycles) = self.cycles {
            data.insert("iterations".into(), Value::from(cycles));
        }
        if let Some(seconds) = self.seconds {
            data.insert("seconds".into(), Value::from(seconds));
        }
        if let Some(gflops) = self.gflops {
            data.insert("gflops".into(), Value::from(gflops));
        }
        data
    }
}

/// State machine over the lines of one region.
#[derive(Debug)]
pub struct ConvergenceTracker<'p> {
    patterns: &'p ConvergencePatterns,
    outcome: Convergence,
}

impl<'p> ConvergenceTracker<'p> {
    pub fn new(patterns: &'p ConvergencePatterns) -> Self {
        Self {
            patterns,
            outcome: Convergence {
                state: ConvergenceState::Searching,
                model: None,
                began_at: None,
                converged_at: None,
                cycles: None,
                seconds: None,
                gflops: None,
            },
        }
    }

    pub fn state(&self) -> ConvergenceState {
        self.outcome.state
    }

    /// Feed the line at relative position `rel`.
    pub fn feed(&mut self, rel: usize, line: &str) -> ConvergenceState {
        let text = line.trim();
        match self.outcome.state {
            ConvergenceState::Searching => {
                if let Some(caps) = self.patterns.begin.captures(text) {
                    self.outcome.state = ConvergenceState::InIterations;
                    self.outcome.began_at = Some(rel);
                    self.outcome.model = caps.name("model").map(|m| m.as_str().to_string());
                }
            }
            ConvergenceState::InIterations => {
                if let Some(caps) = self.patterns.converged.captures(text) {
                    self.outcome.state = ConvergenceState::Converged;
                    self.outcome.converged_at = Some(rel);
                    self.outcome.cycles = caps.name("cycles").and_then(|m| m.as_str().parse().ok());
                    self.outcome.seconds =
                        caps.name("seconds").and_then(|m| m.as_str().parse().ok());
                    self.outcome.gflops = caps.name("gflops").and_then(|m| m.as_str().parse().ok());
                }
            }
            ConvergenceState::Converged | ConvergenceState::Failed => {}
        }
        self.outcome.state
    }

    /// End of region: an unfinished iteration trace becomes `Failed`.
    pub fn finish(mut self) -> Convergence {
        if self.outcome.state == ConvergenceState::InIterations {
            self.outcome.state = ConvergenceState::Failed;
        }
        self.outcome
    }

    /// Run the tracker over `lines` until it converges or the lines run out.
    pub fn track<S: AsRef<str>>(patterns: &'p ConvergencePatterns, lines: &[S]) -> Convergence {
        let mut tracker = Self::new(patterns);
        for (rel, line) in lines.iter().enumerate() {
            if tracker.feed(rel, line.as_ref()) == ConvergenceState::Converged {
                break;
            }
        }
        tracker.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> ConvergencePatterns {
        ConvergencePatterns {
            begin: Regex::new(r"^Beginning iterative solution of (?P<model>CCSDT?) equations:")
                .unwrap(),
            converged: Regex::new(
                r"^CCSDT? iterations converged in\s*(?P<cycles>\d+)\s*cycles and\s*(?P<seconds>\d+\.\d+)\s*seconds",
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_converged_trace() {
        let patterns = patterns();
        let lines = [
            "noise",
            " Beginning iterative solution of CCSD equations:",
            "   1  0.1",
            " CCSD iterations converged in 12 cycles and 3.50 seconds (0.29 s/it.)",
        ];
        let outcome = ConvergenceTracker::track(&patterns, &lines);
        assert_eq!(outcome.state, ConvergenceState::Converged);
        assert_eq!(outcome.model.as_deref(), Some("CCSD"));
        assert_eq!(outcome.began_at, Some(1));
        assert_eq!(outcome.converged_at, Some(3));
        assert_eq!(outcome.cycles, Some(12));
        assert_eq!(outcome.seconds, Some(3.5));
    }

    #[test]
    fn test_end_of_region_while_iterating_fails() {
        let patterns = patterns();
        let lines = ["Beginning iterative solution of CCSDT equations:", "  1 0.1", "  2 0.01"];
        let outcome = ConvergenceTracker::track(&patterns, &lines);
        assert_eq!(outcome.state, ConvergenceState::Failed);
        assert_eq!(outcome.to_data().get("status"), Some(&Value::from("failed")));
    }

    #[test]
    fn test_converged_line_before_begin_is_ignored() {
        let patterns = patterns();
        let lines = ["CCSD iterations converged in 3 cycles and 1.00 seconds"];
        let mut tracker = ConvergenceTracker::new(&patterns);
        assert_eq!(tracker.feed(0, lines[0]), ConvergenceState::Searching);
        assert_eq!(tracker.finish().state, ConvergenceState::Searching);
    }
}
