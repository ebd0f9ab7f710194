use anyhow::{anyhow, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Which of the three per-operation values of a benchmark result to look at
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum MetricArg {
    /// Nanoseconds per operation
    #[value(name = "ns")]
    NsPerOp,
    /// Allocations per operation
    #[value(name = "allocs")]
    AllocsPerOp,
    /// Bytes allocated per operation
    #[value(name = "bytes")]
    BytesPerOp,
}

#[derive(Parser)]
#[command(version, name = "daily-bench")]
pub struct Cli {
    /// Increase verbosity level (can be specified multiple times.) The first level sets level
    /// "info", second sets level "debug", and third sets level "trace" for the logger.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Create a versionless command for manpage generation
    pub fn command_without_version() -> clap::Command {
        let mut cmd = Self::command();
        cmd = cmd.version(None::<&str>);
        cmd
    }
}

#[derive(Args)]
pub struct CliDataDir {
    /// Directory holding one JSON file per benchmark run.
    /// Defaults to `data_dir` from the configuration, or `data`.
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,
}

/// Known-good and known-bad boundaries for one metric, given as `good,bad`
#[derive(Args)]
#[group(multiple = false)]
pub struct CliBisectRange {
    /// Range for ns/op, e.g. `--ops 100,300`
    #[arg(long, value_parser=parse_number_pair)]
    pub ops: Option<(i64, i64)>,

    /// Range for allocs/op
    #[arg(long, value_parser=parse_number_pair)]
    pub allocs: Option<(i64, i64)>,

    /// Range for B/op
    #[arg(long, value_parser=parse_number_pair)]
    pub bytes: Option<(i64, i64)>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the benchmark history charts and accept new results over HTTP
    ///
    /// `GET /` shows ns/op, `GET /alloc` allocs/op and `GET /bytes` B/op per
    /// benchmark case. `GET /series` returns the grouped history as JSON.
    /// `POST /upload` accepts one benchmark run as JSON, stores it in the data
    /// directory and republishes the charts.
    Serve {
        #[command(flatten)]
        data_dir: CliDataDir,

        /// Address to listen on. Defaults to `server.listen` from the
        /// configuration, or `0.0.0.0:18081`.
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Write the benchmark history of the data directory to a file
    ///
    /// An output path ending in `.json` receives the grouped series, any other
    /// path an HTML page with one chart per benchmark case.
    Report {
        #[command(flatten)]
        data_dir: CliDataDir,

        /// Output file
        #[arg(short, long, default_value = "output.html")]
        output: PathBuf,

        /// Metric to chart
        #[arg(short, long, value_enum, default_value = "ns")]
        metric: MetricArg,
    },

    /// Convert `go test -bench -benchmem` output into a benchmark run file
    Import {
        #[command(flatten)]
        data_dir: CliDataDir,

        /// Commit the results were measured on
        #[arg(short, long, value_parser=parse_spaceless_string)]
        commit: String,

        /// Date of the commit in seconds since the epoch. Defaults to now.
        #[arg(long)]
        date: Option<i64>,

        /// File with the benchmark output. Reads stdin if omitted or `-`.
        #[arg(short, long)]
        file: Option<String>,

        /// Print the resulting JSON instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Merge re-run results from a patch directory into the data directory
    ///
    /// Runs of the same date and commit get the patch's results appended,
    /// skipping benchmark cases that already exist. Runs unknown to the data
    /// directory are moved over as they are.
    Merge {
        #[command(flatten)]
        data_dir: CliDataDir,

        /// Directory with the patch runs. Defaults to `patch_dir` from the
        /// configuration, or `patch`.
        #[arg(short, long)]
        patch_dir: Option<PathBuf>,
    },

    /// Run a benchmark and classify the current commit for `git bisect run`
    ///
    /// Exits with 0 if the measured value is closer to the good boundary, 1 if
    /// it is closer to the bad boundary, and 125 if the benchmark could not be
    /// measured. Without a range, prints the measured values.
    Bisect {
        /// Name of the benchmark case, e.g. `BenchmarkIntegerIndexScan`
        #[arg(short, long, value_parser=parse_spaceless_string)]
        bench: String,

        #[command(flatten)]
        range: CliBisectRange,

        /// Command printing Go benchmark output, e.g.
        /// `go test -benchmem -run XXX -bench BenchmarkIntegerIndexScan`
        #[arg(required(true), last(true))]
        command: Vec<String>,
    },

    /// Show the resolved configuration
    Config {},
}

fn parse_spaceless_string(s: &str) -> Result<String> {
    if s.split_whitespace().count() > 1 {
        Err(anyhow!("invalid string: found space in '{}'", s))
    } else {
        Ok(String::from(s))
    }
}

fn parse_number_pair(s: &str) -> Result<(i64, i64)> {
    let (from, to) = s
        .split_once(',')
        .ok_or_else(|| anyhow!("invalid range: expected 'from,to' in '{}'", s))?;
    let from = from
        .trim()
        .parse()
        .map_err(|e| anyhow!("invalid range start '{}': {}", from, e))?;
    let to = to
        .trim()
        .parse()
        .map_err(|e| anyhow!("invalid range end '{}': {}", to, e))?;
    Ok((from, to))
}
