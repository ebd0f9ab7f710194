use std::borrow::Borrow;

use itertools::Itertools;
use log::warn;

use crate::{
    data::{BenchmarkOutput, Observation, Series},
    dates,
};

/// Result of grouping runs by benchmark case.
#[derive(Debug, Default, PartialEq)]
pub struct Aggregate {
    pub series: Series,
    /// Runs left out because their date could not be resolved.
    pub skipped: usize,
}

/// Groups the results of all runs by benchmark case and orders every case's
/// observations by ascending timestamp.
///
/// Runs with a malformed date are skipped with a warning. Observations with
/// equal timestamps keep the order of their runs in `outputs`.
pub fn rebuild<O: Borrow<BenchmarkOutput>>(outputs: &[O]) -> Series {
    aggregate(outputs).series
}

pub fn aggregate<O: Borrow<BenchmarkOutput>>(outputs: &[O]) -> Aggregate {
    let mut skipped = 0;

    let grouped = outputs
        .iter()
        .map(|output| Borrow::<BenchmarkOutput>::borrow(output))
        .filter_map(|output| match dates::resolve(&output.date) {
            Ok(time) => Some((output, time)),
            Err(e) => {
                warn!("{e}, skipping run of commit '{}'", output.commit);
                skipped += 1;
                None
            }
        })
        .flat_map(|(output, time)| {
            let date = dates::calendar_date(&time);
            let timestamp = time.timestamp();
            output.results.iter().map(move |result| Observation {
                date: date.clone(),
                timestamp,
                commit: output.commit.clone(),
                result: result.clone(),
            })
        })
        .into_group_map_by(|observation| observation.result.name.clone());

    let series: Series = grouped
        .into_iter()
        .map(|(name, mut observations)| {
            // sort_by_key is stable, which keeps same-timestamp runs in input order
            observations.sort_by_key(|o| o.timestamp);
            (name, observations)
        })
        .collect();

    Aggregate { series, skipped }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::BenchmarkResult;

    fn result(name: &str, ns_per_op: i64) -> BenchmarkResult {
        BenchmarkResult {
            name: name.to_string(),
            ns_per_op,
            allocs_per_op: ns_per_op / 10,
            bytes_per_op: ns_per_op * 8,
        }
    }

    fn output(date: &str, commit: &str, results: Vec<BenchmarkResult>) -> BenchmarkOutput {
        BenchmarkOutput {
            date: date.to_string(),
            commit: commit.to_string(),
            results,
        }
    }

    fn timeline(series: &Series, name: &str) -> Vec<(i64, i64)> {
        series[name]
            .iter()
            .map(|o| (o.timestamp, o.result.ns_per_op))
            .collect()
    }

    #[test]
    fn orders_observations_chronologically() {
        let outputs = [
            output("1000", "c1", vec![result("BenchCaseX", 100)]),
            output("2000", "c2", vec![result("BenchCaseX", 150)]),
            output("1500", "c3", vec![result("BenchCaseX", 120)]),
        ];

        let series = rebuild(&outputs);

        assert_eq!(
            timeline(&series, "BenchCaseX"),
            [(1000, 100), (1500, 120), (2000, 150)]
        );
        let commits: Vec<_> = series["BenchCaseX"]
            .iter()
            .map(|o| o.commit.as_str())
            .collect();
        assert_eq!(commits, ["c1", "c3", "c2"]);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let outputs = [
            output("500", "a", vec![result("BenchSort", 1), result("BenchJoin", 10)]),
            output("500", "b", vec![result("BenchSort", 2)]),
            output("100", "c", vec![result("BenchSort", 3)]),
            output("500", "d", vec![result("BenchSort", 4), result("BenchJoin", 40)]),
        ];

        let series = rebuild(&outputs);

        assert_eq!(
            timeline(&series, "BenchSort"),
            [(100, 3), (500, 1), (500, 2), (500, 4)]
        );
        assert_eq!(timeline(&series, "BenchJoin"), [(500, 10), (500, 40)]);
    }

    #[test]
    fn cases_are_grouped_independently() {
        let outputs = [
            output("3000", "a", vec![result("BenchA", 1), result("BenchB", 2)]),
            output("1000", "b", vec![result("BenchB", 3)]),
            output("2000", "c", vec![result("BenchC", 4)]),
        ];

        let series = rebuild(&outputs);

        assert_eq!(
            series.keys().collect::<Vec<_>>(),
            ["BenchA", "BenchB", "BenchC"]
        );
        assert_eq!(timeline(&series, "BenchA"), [(3000, 1)]);
        assert_eq!(timeline(&series, "BenchB"), [(1000, 3), (3000, 2)]);
        assert_eq!(timeline(&series, "BenchC"), [(2000, 4)]);
    }

    #[test]
    fn observations_carry_dates_and_metrics() {
        let outputs = [output("1620259200", "0ec8f2d9f", vec![result("BenchBasic", 80)])];

        let series = rebuild(&outputs);

        assert_eq!(
            series["BenchBasic"],
            [Observation {
                date: "2021-05-06".to_string(),
                timestamp: 1620259200,
                commit: "0ec8f2d9f".to_string(),
                result: result("BenchBasic", 80),
            }]
        );
    }

    #[test]
    fn skips_runs_with_malformed_dates() {
        let outputs = [
            output("1000", "a", vec![result("BenchA", 1)]),
            output("yesterday", "b", vec![result("BenchA", 2), result("BenchOnlyB", 5)]),
            output("2000", "c", vec![result("BenchA", 3)]),
        ];

        let aggregate = aggregate(&outputs);

        assert_eq!(aggregate.skipped, 1);
        assert_eq!(timeline(&aggregate.series, "BenchA"), [(1000, 1), (2000, 3)]);
        assert!(!aggregate.series.contains_key("BenchOnlyB"));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let outputs = vec![
            output("2000", "a", vec![result("BenchA", 1), result("BenchB", 2)]),
            output("1000", "b", vec![result("BenchA", 3)]),
            output("2000", "c", vec![result("BenchB", 4)]),
        ];

        assert_eq!(rebuild(&outputs), rebuild(&outputs));
    }

    #[test]
    fn empty_input_gives_empty_series() {
        let outputs: Vec<BenchmarkOutput> = vec![];
        assert_eq!(aggregate(&outputs), Aggregate::default());

        let outputs = [output("1000", "a", vec![])];
        assert!(rebuild(&outputs).is_empty());
    }
}
