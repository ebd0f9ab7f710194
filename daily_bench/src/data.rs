use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use daily_bench_cli_types::MetricArg;

/// One benchmark run: all results measured for a commit on a date.
///
/// `date` holds the seconds since the Unix epoch as a decimal string, which is
/// the format the runs are stored and uploaded in.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct BenchmarkOutput {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Commit")]
    pub commit: String,
    #[serde(rename = "Result", default)]
    pub results: Vec<BenchmarkResult>,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "NsPerOp")]
    pub ns_per_op: i64,
    #[serde(rename = "AllocsPerOp")]
    pub allocs_per_op: i64,
    #[serde(rename = "BytesPerOp")]
    pub bytes_per_op: i64,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize)]
pub enum Metric {
    NsPerOp,
    AllocsPerOp,
    BytesPerOp,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::NsPerOp, Metric::AllocsPerOp, Metric::BytesPerOp];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::NsPerOp => "ns/op",
            Metric::AllocsPerOp => "allocs/op",
            Metric::BytesPerOp => "B/op",
        }
    }
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::NsPerOp => Metric::NsPerOp,
            MetricArg::AllocsPerOp => Metric::AllocsPerOp,
            MetricArg::BytesPerOp => Metric::BytesPerOp,
        }
    }
}

impl BenchmarkResult {
    #[must_use]
    pub fn value(&self, metric: Metric) -> i64 {
        match metric {
            Metric::NsPerOp => self.ns_per_op,
            Metric::AllocsPerOp => self.allocs_per_op,
            Metric::BytesPerOp => self.bytes_per_op,
        }
    }
}

/// A single dated measurement of one benchmark case.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Calendar date (UTC) of the run, `YYYY-MM-DD`
    pub date: String,
    /// Seconds since the Unix epoch, used for ordering
    pub timestamp: i64,
    pub commit: String,
    #[serde(flatten)]
    pub result: BenchmarkResult,
}

/// Observations per benchmark case name, each list in ascending timestamp order.
pub type Series = BTreeMap<String, Vec<Observation>>;
