use anyhow::{Context, Result};
use config::{Config, ConfigError, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};

use crate::defaults;

const LOCAL_CONFIG_NAME: &str = ".dailybenchconfig";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub patch_dir: PathBuf,
    pub server: ServerSettings,
    pub report: ReportSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from(defaults::DEFAULT_DATA_DIR),
            patch_dir: PathBuf::from(defaults::DEFAULT_PATCH_DIR),
            server: ServerSettings::default(),
            report: ReportSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            listen: defaults::DEFAULT_LISTEN_ADDR.to_string(),
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            title: defaults::DEFAULT_REPORT_TITLE.to_string(),
        }
    }
}

/// Configuration files taking part in the resolved settings
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConfigSources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_config: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_config: Option<PathBuf>,
}

impl ConfigSources {
    /// Locates the system file and the nearest local file from the working directory.
    pub fn discover() -> ConfigSources {
        let local_config = env::current_dir()
            .ok()
            .and_then(|dir| find_local_config(&dir));
        ConfigSources {
            system_config: system_config_path().filter(|path| path.is_file()),
            local_config,
        }
    }
}

/// `$XDG_CONFIG_HOME/daily-bench/config.toml`, else `~/.config/daily-bench/config.toml`
fn system_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
        return Some(
            Path::new(&xdg_config_home)
                .join("daily-bench")
                .join("config.toml"),
        );
    }
    dirs_next::home_dir().map(|home| home.join(".config").join("daily-bench").join("config.toml"))
}

/// Walks up from `start` to the first directory containing `.dailybenchconfig`.
pub fn find_local_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(LOCAL_CONFIG_NAME))
        .find(|candidate| candidate.is_file())
}

/// Read hierarchical configuration (system -> local override)
pub fn read_hierarchical_config(sources: &ConfigSources) -> Result<Config, ConfigError> {
    let mut builder = Config::builder();

    for path in [&sources.system_config, &sources.local_config]
        .into_iter()
        .flatten()
    {
        builder = builder.add_source(
            File::from(path.as_path())
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    builder.build()
}

/// Settings from `sources`, falling back to the defaults for missing keys.
pub fn load_settings_from(sources: &ConfigSources) -> Result<Settings> {
    let config = read_hierarchical_config(sources).context("Failed to read configuration")?;
    let settings = config
        .try_deserialize::<Settings>()
        .context("Invalid configuration")?;
    log::debug!("Resolved settings {settings:?} from {sources:?}");
    Ok(settings)
}
