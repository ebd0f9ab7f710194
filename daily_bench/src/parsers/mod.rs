//! Parsers for external benchmark output formats
//!
//! This module converts the textual output of benchmark runners into
//! `BenchmarkResult`s.

pub mod go_bench;

pub use go_bench::{find, parse, parse_line};
