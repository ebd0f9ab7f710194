//! Good/bad classification of a single measurement for bisecting regressions.
//!
//! The range `[from, to]` spans from the known-good to the known-bad
//! measurement of a higher-is-worse metric. Values past `to` are bad, values
//! below `from` are good, and values inside the range are bad once they are
//! above its midpoint.

use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("invalid range: from ({from}) must be less than to ({to})")]
    InvalidRange { from: i64, to: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Good,
    Bad,
}

impl Verdict {
    /// Exit code understood by `git bisect run`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Good => 0,
            Verdict::Bad => 1,
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Good => write!(f, "good"),
            Verdict::Bad => write!(f, "bad"),
        }
    }
}

/// Validated `[from, to]` range with `from < to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    from: i64,
    to: i64,
}

impl Range {
    pub fn new(from: i64, to: i64) -> Result<Range, ClassifyError> {
        if from >= to {
            return Err(ClassifyError::InvalidRange { from, to });
        }
        Ok(Range { from, to })
    }

    pub fn from(&self) -> i64 {
        self.from
    }

    pub fn to(&self) -> i64 {
        self.to
    }

    /// Floor of `(from + to) / 2`, computed without overflow.
    pub fn midpoint(&self) -> i64 {
        // Halving the i128 sum always fits back into an i64.
        ((i128::from(self.from) + i128::from(self.to)).div_euclid(2)) as i64
    }

    pub fn classify(&self, value: i64) -> Verdict {
        if value > self.to {
            Verdict::Bad
        } else if value < self.from {
            Verdict::Good
        } else if value > self.midpoint() {
            Verdict::Bad
        } else {
            Verdict::Good
        }
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

pub fn classify(value: i64, from: i64, to: i64) -> Result<Verdict, ClassifyError> {
    Ok(Range::new(from, to)?.classify(value))
}
