//! Curated sample logs
//!
//! The files under `samples/` are trimmed CFOUR outputs of a water calculation. Each
//! single-program sample holds one invocation; `full_run` is a whole job and
//! `truncated` is the same job cut off while xncc was still running.

use crate::cfour::loader::{LogLoader, ParsedLog};
use crate::cfour::pipeline::Pipeline;

/// A sample log embedded at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    name: &'static str,
    text: &'static str,
}

impl Sample {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn text(&self) -> &'static str {
        self.text
    }

    pub fn lines(&self) -> Vec<String> {
        self.loader().lines()
    }

    pub fn loader(&self) -> LogLoader {
        LogLoader::from_string(self.text)
    }

    /// Run the built-in grammars over the sample.
    pub fn parse(&self) -> ParsedLog {
        self.loader().parse()
    }

    pub fn parse_with(&self, pipeline: &Pipeline) -> ParsedLog {
        self.loader().parse_with(pipeline)
    }
}

macro_rules! sample {
    ($name:ident) => {
        pub fn $name() -> Sample {
            Sample {
                name: stringify!($name),
                text: include_str!(concat!("../../../samples/", stringify!($name), ".out")),
            }
        }
    };
}

sample!(xjoda);
sample!(xvscf);
sample!(xdqcscf);
sample!(xncc);
sample!(xvcc);
sample!(xvee);
sample!(xsim);
sample!(full_run);
sample!(truncated);

/// Every sample, single programs first.
pub fn all() -> Vec<Sample> {
    vec![
        xjoda(),
        xvscf(),
        xdqcscf(),
        xncc(),
        xvcc(),
        xvee(),
        xsim(),
        full_run(),
        truncated(),
    ]
}

pub fn by_name(name: &str) -> Option<Sample> {
    all().into_iter().find(|sample| sample.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_sample_is_reachable_by_name() {
        for sample in all() {
            assert_eq!(by_name(sample.name()), Some(sample));
            assert!(!sample.lines().is_empty());
        }
        assert!(by_name("xprops").is_none());
    }
}
