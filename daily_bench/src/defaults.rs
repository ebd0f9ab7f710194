//! Default values used when neither the command line nor a config file
//! provides a setting.

// ============================================================================
// Storage Defaults
// ============================================================================

/// Directory holding one JSON file per benchmark run.
///
/// Used by `serve`, `report`, `import` and `merge` unless `--data-dir` or
/// the `data_dir` config key says otherwise.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Directory holding runs to be merged into the data directory.
pub const DEFAULT_PATCH_DIR: &str = "patch";

// ============================================================================
// Server Defaults
// ============================================================================

/// Address the history server listens on.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:18081";

/// Largest accepted upload body, in bytes.
pub const DEFAULT_UPLOAD_LIMIT: usize = 16 * 1024 * 1024;

// ============================================================================
// Reporting Defaults
// ============================================================================

/// Page title of the rendered history charts.
pub const DEFAULT_REPORT_TITLE: &str = "Benchmark History";

/// Height in pixels of one benchmark case chart.
pub const DEFAULT_CHART_HEIGHT: usize = 320;
