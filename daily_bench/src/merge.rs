use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{data::BenchmarkOutput, ingest, storage};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Patch runs whose results were added to existing runs
    pub merged: usize,
    /// Patch runs moved into the data directory as new runs
    pub moved: usize,
    /// Patch results dropped because the run already had that benchmark case
    pub skipped: usize,
    /// Patch runs left in place because they fail validation
    pub invalid: usize,
}

fn same_run(a: &BenchmarkOutput, b: &BenchmarkOutput) -> bool {
    a.date == b.date && a.commit == b.commit
}

/// Appends the results of `patch` to `existing`, keeping the existing result
/// for every benchmark case present in both. Returns the names skipped.
pub fn merge_outputs(existing: &mut BenchmarkOutput, patch: &BenchmarkOutput) -> Vec<String> {
    let mut skipped = Vec::new();
    for result in &patch.results {
        if existing.results.iter().any(|r| r.name == result.name) {
            info!(
                "Skipping duplicated benchmark {} in {} - {}",
                result.name, patch.date, patch.commit
            );
            skipped.push(result.name.clone());
            continue;
        }
        existing.results.push(result.clone());
    }
    skipped
}

fn read_runs(dir: &Path) -> Result<Vec<(PathBuf, BenchmarkOutput)>> {
    storage::list_runs(dir)?
        .into_iter()
        .map(|path| storage::read_output(&path).map(|output| (path, output)))
        .collect()
}

/// Merges every run in `patch_dir` into `data_dir`.
///
/// All files are decoded before anything is written. Patch runs that fail
/// validation are skipped with a warning.
pub fn merge_dirs(data_dir: &Path, patch_dir: &Path) -> Result<MergeSummary> {
    let mut data = read_runs(data_dir)?;
    let patches = read_runs(patch_dir)?;
    let mut summary = MergeSummary::default();

    for (patch_path, patch) in patches {
        if let Err(e) = ingest::validate(&patch) {
            warn!("Skipping {}: {e}", patch_path.display());
            summary.invalid += 1;
            continue;
        }

        let mut matched = false;
        for (path, existing) in data
            .iter_mut()
            .filter(|(_, existing)| same_run(existing, &patch))
        {
            summary.skipped += merge_outputs(existing, &patch).len();
            storage::write_output_at(path, existing)?;
            info!("Merged {} into {}", patch_path.display(), path.display());
            matched = true;
        }
        if matched {
            summary.merged += 1;
            continue;
        }

        let target = storage::output_path(data_dir, &patch)?;
        if target.exists() {
            warn!(
                "{} exists but holds a different run, replacing it",
                target.display()
            );
        }
        fs::rename(&patch_path, &target).with_context(|| {
            format!(
                "Failed to move {} to {}",
                patch_path.display(),
                target.display()
            )
        })?;
        info!("Moved {} to {}", patch_path.display(), target.display());
        summary.moved += 1;
        data.retain(|(path, _)| *path != target);
        data.push((target, patch));
    }

    Ok(summary)
}
