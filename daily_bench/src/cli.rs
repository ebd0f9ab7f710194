use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
    process,
};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use env_logger::Env;
use log::{error, info, Level};
use serde::Serialize;

use crate::{
    bisect::{self, Outcome, EXIT_ABORT},
    classify::Range,
    config::{self, ConfigSources, Settings},
    data::{BenchmarkOutput, Metric},
    ingest, merge,
    parsers::go_bench,
    reporting::report,
    server, storage,
};
use daily_bench_cli_types::{Cli, CliBisectRange, CliDataDir, Commands};

pub fn handle_calls() -> Result<()> {
    let cli = Cli::parse();
    let logger_level = match cli.verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(logger_level.as_str())).init();

    let sources = ConfigSources::discover();
    let settings = config::load_settings_from(&sources)?;

    match cli.command {
        Commands::Serve { data_dir, listen } => {
            let listen = listen.unwrap_or_else(|| settings.server.listen.clone());
            server::run(
                &resolve_data_dir(data_dir, &settings),
                &listen,
                &settings.report.title,
            )
        }
        Commands::Report {
            data_dir,
            output,
            metric,
        } => report(
            &resolve_data_dir(data_dir, &settings),
            &output,
            Metric::from(metric),
            &settings.report.title,
        ),
        Commands::Import {
            data_dir,
            commit,
            date,
            file,
            dry_run,
        } => import(
            resolve_data_dir(data_dir, &settings),
            commit,
            date,
            file,
            dry_run,
        ),
        Commands::Merge {
            data_dir,
            patch_dir,
        } => {
            let data_dir = resolve_data_dir(data_dir, &settings);
            let patch_dir = patch_dir.unwrap_or_else(|| settings.patch_dir.clone());
            let summary = merge::merge_dirs(&data_dir, &patch_dir)?;
            println!(
                "Merged {} runs, moved {} runs, skipped {} duplicated results, left {} invalid runs",
                summary.merged, summary.moved, summary.skipped, summary.invalid
            );
            Ok(())
        }
        Commands::Bisect {
            bench,
            range,
            command,
        } => {
            let range = match selected_range(&range) {
                Ok(range) => range,
                Err(e) => {
                    error!("{e}");
                    process::exit(EXIT_ABORT);
                }
            };

            let outcome = bisect::bisect(&bench, range, &command);
            if let Outcome::Measured(result) = &outcome {
                println!(
                    "{}: {} ns/op, {} allocs/op, {} B/op",
                    result.name, result.ns_per_op, result.allocs_per_op, result.bytes_per_op
                );
            }

            let code = outcome.exit_code();
            if code != 0 {
                process::exit(code);
            }
            Ok(())
        }
        Commands::Config {} => {
            let config_info = ConfigInfo {
                sources: &sources,
                settings: &settings,
            };
            println!("{}", serde_json::to_string_pretty(&config_info)?);
            Ok(())
        }
    }
}

/// Resolved settings and the files they were read from
#[derive(Serialize)]
struct ConfigInfo<'a> {
    sources: &'a ConfigSources,
    settings: &'a Settings,
}

fn resolve_data_dir(cli: CliDataDir, settings: &Settings) -> PathBuf {
    cli.data_dir.unwrap_or_else(|| settings.data_dir.clone())
}

fn selected_range(range: &CliBisectRange) -> Result<Option<(Metric, Range)>> {
    let selected = [
        (Metric::NsPerOp, range.ops),
        (Metric::AllocsPerOp, range.allocs),
        (Metric::BytesPerOp, range.bytes),
    ]
    .into_iter()
    .find_map(|(metric, pair)| pair.map(|pair| (metric, pair)));

    match selected {
        Some((metric, (from, to))) => Ok(Some((metric, Range::new(from, to)?))),
        None => Ok(None),
    }
}

fn read_input(file: Option<&str>) -> Result<String> {
    match file {
        None | Some("-") => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read benchmark output from stdin")?;
            Ok(input)
        }
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read benchmark output from {path}")),
    }
}

fn import(
    data_dir: PathBuf,
    commit: String,
    date: Option<i64>,
    file: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let input = read_input(file.as_deref())?;
    let results = go_bench::parse(&input);
    if results.is_empty() {
        bail!("No benchmark results found in input");
    }

    let output = BenchmarkOutput {
        date: date.unwrap_or_else(|| Utc::now().timestamp()).to_string(),
        commit,
        results,
    };
    ingest::validate(&output)?;

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let path = storage::write_output(&data_dir, &output)?;
    info!(
        "Imported {} results into {}",
        output.results.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn range(
        ops: Option<(i64, i64)>,
        allocs: Option<(i64, i64)>,
        bytes: Option<(i64, i64)>,
    ) -> CliBisectRange {
        CliBisectRange { ops, allocs, bytes }
    }

    #[test]
    fn test_selected_range() {
        assert!(selected_range(&range(None, None, None)).unwrap().is_none());

        let (metric, selected) = selected_range(&range(Some((100, 300)), None, None))
            .unwrap()
            .unwrap();
        assert_eq!(metric, Metric::NsPerOp);
        assert_eq!((selected.from(), selected.to()), (100, 300));

        let (metric, _) = selected_range(&range(None, Some((1, 2)), None))
            .unwrap()
            .unwrap();
        assert_eq!(metric, Metric::AllocsPerOp);

        let (metric, _) = selected_range(&range(None, None, Some((1, 2))))
            .unwrap()
            .unwrap();
        assert_eq!(metric, Metric::BytesPerOp);
    }

    #[test]
    fn test_selected_range_rejects_inverted_bounds() {
        assert!(selected_range(&range(Some((300, 100)), None, None)).is_err());
        assert!(selected_range(&range(None, None, Some((5, 5)))).is_err());
    }

    #[test]
    fn test_import_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let bench_file = temp_dir.path().join("bench.txt");
        fs::write(
            &bench_file,
            "BenchmarkBasic-16  101330  11569 ns/op  1656 B/op  26 allocs/op\nPASS\n",
        )
        .unwrap();
        let data_dir = temp_dir.path().join("data");

        import(
            data_dir.clone(),
            "0ec8f2d9f".to_string(),
            Some(1620259200),
            Some(bench_file.to_string_lossy().into_owned()),
            false,
        )
        .unwrap();

        let stored = storage::read_output(&data_dir.join("2021-05-06_0ec8f2d9f.json")).unwrap();
        assert_eq!(stored.date, "1620259200");
        assert_eq!(stored.results[0].name, "BenchmarkBasic");
        assert_eq!(stored.results[0].allocs_per_op, 26);
    }

    #[test]
    fn test_import_without_results_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let bench_file = temp_dir.path().join("bench.txt");
        fs::write(&bench_file, "PASS\n").unwrap();

        assert!(import(
            temp_dir.path().join("data"),
            "abc".to_string(),
            Some(0),
            Some(bench_file.to_string_lossy().into_owned()),
            false,
        )
        .is_err());
    }
}
