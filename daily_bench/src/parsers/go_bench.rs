use std::sync::OnceLock;

use regex::Regex;

use crate::data::BenchmarkResult;

fn benchmark_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // name field, iteration count, "value unit" pairs
    RE.get_or_init(|| {
        Regex::new(r"^(Benchmark\S*)\s+\d+\s+(.+)$").expect("valid benchmark line regex")
    })
}

/// Drops a trailing `-<GOMAXPROCS>` from the name field.
///
/// `go test` leaves the suffix out when GOMAXPROCS is 1, so a sub-benchmark
/// ending in `-<digits>` (`BenchmarkSort/size-100`) cannot be told apart from
/// a suffixed name and loses that tail too. [`find`] also accepts the full
/// field for such cases.
fn strip_procs(field: &str) -> &str {
    match field.rsplit_once('-') {
        Some((name, procs))
            if !name.is_empty() && !procs.is_empty() && procs.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name
        }
        _ => field,
    }
}

fn parse_fields(line: &str) -> Option<(&str, BenchmarkResult)> {
    let captures = benchmark_line().captures(line)?;
    let field = captures.get(1)?.as_str();

    let mut ns_per_op = None;
    let mut allocs_per_op = 0;
    let mut bytes_per_op = 0;

    let fields: Vec<&str> = captures[2].split_whitespace().collect();
    for pair in fields.chunks_exact(2) {
        let (value, unit) = (pair[0], pair[1]);
        match unit {
            // ns/op may be fractional for very fast benchmarks
            "ns/op" => ns_per_op = value.parse::<f64>().ok().map(|v| v as i64),
            "B/op" => bytes_per_op = value.parse().ok()?,
            "allocs/op" => allocs_per_op = value.parse().ok()?,
            _ => {}
        }
    }

    Some((
        field,
        BenchmarkResult {
            name: strip_procs(field).to_string(),
            ns_per_op: ns_per_op?,
            allocs_per_op,
            bytes_per_op,
        },
    ))
}

/// Parses one line of `go test -bench -benchmem` output, e.g.
///
/// ```text
/// BenchmarkIntegerIndexScan-16    4896    235082 ns/op    82667 B/op    1329 allocs/op
/// ```
///
/// Returns `None` for lines that are not benchmark results. Missing memory
/// columns are reported as 0.
pub fn parse_line(line: &str) -> Option<BenchmarkResult> {
    parse_fields(line.trim()).map(|(_, result)| result)
}

/// All benchmark results found in `input`, in output order.
pub fn parse(input: &str) -> Vec<BenchmarkResult> {
    input.lines().filter_map(parse_line).collect()
}

/// The first result of benchmark case `name` found in `input`.
///
/// `name` matches either the case name or the name field as printed.
pub fn find(input: &str, name: &str) -> Option<BenchmarkResult> {
    input
        .lines()
        .filter_map(|line| parse_fields(line.trim()))
        .find(|(field, result)| result.name == name || *field == name)
        .map(|(_, result)| result)
}
