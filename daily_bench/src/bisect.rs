//! Classifies the checked-out commit during `git bisect run`.

use std::process;

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use thiserror::Error;

use crate::{
    classify::{Range, Verdict},
    data::{BenchmarkResult, Metric},
    parsers::go_bench,
};

/// `git bisect run`: this commit cannot be tested.
pub const EXIT_SKIP: i32 = 125;

/// `git bisect run`: stop bisecting.
pub const EXIT_ABORT: i32 = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BisectError {
    #[error("benchmark '{0}' not found in output")]
    MissingBenchmark(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Measured value of the selected metric and its verdict
    Classified {
        metric: Metric,
        value: i64,
        verdict: Verdict,
    },
    /// No range given, all values of the benchmark
    Measured(BenchmarkResult),
    /// The benchmark could not be run or measured on this commit
    Skip,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Classified { verdict, .. } => verdict.exit_code(),
            Outcome::Measured(_) => 0,
            Outcome::Skip => EXIT_SKIP,
        }
    }
}

/// Finds `bench` in the benchmark output and classifies the metric of `range`.
pub fn evaluate(
    bench_output: &str,
    bench: &str,
    range: Option<(Metric, Range)>,
) -> Result<Outcome, BisectError> {
    let result = go_bench::find(bench_output, bench)
        .ok_or_else(|| BisectError::MissingBenchmark(bench.to_string()))?;

    Ok(match range {
        Some((metric, range)) => {
            let value = result.value(metric);
            Outcome::Classified {
                metric,
                value,
                verdict: range.classify(value),
            }
        }
        None => Outcome::Measured(result),
    })
}

fn run_command(command: &[String]) -> Result<String> {
    let (exe, args) = command
        .split_first()
        .ok_or_else(|| anyhow!("No command given"))?;

    let output = process::Command::new(exe)
        .args(args)
        .output()
        .with_context(|| format!("Failed to spawn {exe}"))?;

    if !output.status.success() {
        return Err(anyhow!(
            "Command {:?} failed with {}: {}",
            command,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runs the benchmark command and classifies its result.
///
/// A command that fails or prints no result for `bench` yields
/// [`Outcome::Skip`], since the commit cannot be judged either way.
pub fn bisect(bench: &str, range: Option<(Metric, Range)>, command: &[String]) -> Outcome {
    let bench_output = match run_command(command) {
        Ok(output) => output,
        Err(e) => {
            error!("{e:#}");
            return Outcome::Skip;
        }
    };

    match evaluate(&bench_output, bench, range) {
        Ok(outcome) => {
            if let (
                Outcome::Classified {
                    metric,
                    value,
                    verdict,
                },
                Some((_, range)),
            ) = (&outcome, range)
            {
                info!("{bench}: {value} {} in {range} is {verdict}", metric.label());
            }
            outcome
        }
        Err(e) => {
            error!("{e}");
            Outcome::Skip
        }
    }
}
