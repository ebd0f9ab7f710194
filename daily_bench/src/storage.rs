//! One JSON file per benchmark run, named `<YYYY-MM-DD>_<commit>.json`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;

use crate::{data::BenchmarkOutput, dates};

pub fn file_name(output: &BenchmarkOutput) -> Result<String> {
    let time = dates::resolve(&output.date)?;
    Ok(format!(
        "{}_{}.json",
        dates::calendar_date(&time),
        output.commit
    ))
}

pub fn output_path(dir: &Path, output: &BenchmarkOutput) -> Result<PathBuf> {
    Ok(dir.join(file_name(output)?))
}

/// Paths of all stored runs in `dir`, ordered by file name.
pub fn list_runs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Loads all runs stored in `dir`, ordered by file name.
pub fn load_data_dir(dir: &Path) -> Result<Vec<BenchmarkOutput>> {
    list_runs(dir)?
        .iter()
        .map(|path| read_output(path))
        .collect()
}

pub fn read_output(path: &Path) -> Result<BenchmarkOutput> {
    let content =
        fs::read(path).with_context(|| format!("Failed to read file {}", path.display()))?;
    let output = serde_json::from_slice(&content)
        .with_context(|| format!("Failed to decode benchmark run {}", path.display()))?;
    debug!("Loaded {}", path.display());
    Ok(output)
}

/// Writes `output` into `dir`, replacing an existing file of the same run.
pub fn write_output(dir: &Path, output: &BenchmarkOutput) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    let path = output_path(dir, output)?;
    write_output_at(&path, output)?;
    Ok(path)
}

/// Writes `output` to `path` as is, whatever the file is named.
pub fn write_output_at(path: &Path, output: &BenchmarkOutput) -> Result<()> {
    let content = serde_json::to_vec(output)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::BenchmarkResult;
    use tempfile::TempDir;

    fn output(date: &str, commit: &str) -> BenchmarkOutput {
        BenchmarkOutput {
            date: date.to_string(),
            commit: commit.to_string(),
            results: vec![BenchmarkResult {
                name: "BenchmarkBasic".to_string(),
                ns_per_op: 100,
                allocs_per_op: 2,
                bytes_per_op: 64,
            }],
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            file_name(&output("1620259200", "0ec8f2d9f")).unwrap(),
            "2021-05-06_0ec8f2d9f.json"
        );
        assert!(file_name(&output("2021-05-06", "0ec8f2d9f")).is_err());
    }

    #[test]
    fn test_write_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");

        let second = output("1620345600", "bbbbbbb");
        let first = output("1620259200", "aaaaaaa");
        write_output(&data_dir, &second).unwrap();
        let path = write_output(&data_dir, &first).unwrap();
        assert_eq!(path, data_dir.join("2021-05-06_aaaaaaa.json"));

        fs::write(data_dir.join("README.md"), "not a run").unwrap();
        fs::create_dir(data_dir.join("nested.json")).unwrap();

        let loaded = load_data_dir(&data_dir).unwrap();
        assert_eq!(loaded, vec![first, second]);
    }

    #[test]
    fn test_load_rejects_broken_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken.json"), "{").unwrap();

        let err = load_data_dir(temp_dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn test_load_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_data_dir(&temp_dir.path().join("missing")).is_err());
    }
}
