//! Harness configuration: an optional `harness.json`, overlaid with `FUD_*`
//! environment variables. Read once, before anything is launched.

mod app_root;

pub use app_root::{AppRoot, DESCRIPTOR_FILE, DESIGNER_SWF};

use crate::driver::{ArtifactFilter, DEFAULT_ARTIFACT_PATTERN};
use crate::error::HarnessError;
use crate::error::config::ConfigError;
use crate::{
    ADL_BINARY, APP_LOADER_SWF_PATH, APP_ROOT_DIR_NAME, CONFIG_FILE_NAME, CONTENT_DIR_PATH,
    DATA_DIR_NAME, DESCRIPTOR_PATH, PLUGIN_SWF_PATH,
};

use common::ErrorLocation;
use models::{LaunchConfig, LaunchConfigBuilder};

use std::env::{VarError, var as env_var};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const ENV_TEST_DEBUG: &str = "FUD_TEST_DEBUG";
pub const ENV_ADL: &str = "FUD_ADL";
pub const ENV_AIR: &str = "FUD_AIR";
pub const ENV_HOME: &str = "FUD_HOME";
pub const ENV_DEBUG_APP_ROOT: &str = "FUD_DEBUG_APP_ROOT";
pub const ENV_UNIT_TIMEOUT_SECS: &str = "FUD_UNIT_TIMEOUT_SECS";
pub const ENV_ACCEPT_TIMEOUT_SECS: &str = "FUD_ACCEPT_TIMEOUT_SECS";
pub const ENV_MAX_CONCURRENT_UNITS: &str = "FUD_MAX_CONCURRENT_UNITS";

pub const ENV_VARIABLES: [&str; 8] = [
    ENV_TEST_DEBUG,
    ENV_ADL,
    ENV_AIR,
    ENV_HOME,
    ENV_DEBUG_APP_ROOT,
    ENV_UNIT_TIMEOUT_SECS,
    ENV_ACCEPT_TIMEOUT_SECS,
    ENV_MAX_CONCURRENT_UNITS,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Reuse a persistent app root instead of a fresh temporary one.
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_adl")]
    pub adl: PathBuf,

    /// AIR runtime directory.
    #[serde(default)]
    pub air: Option<PathBuf>,

    /// Designer checkout the plugin, loader and descriptor are built in.
    #[serde(default)]
    pub home: Option<PathBuf>,

    #[serde(default = "default_debug_app_root")]
    pub debug_app_root: PathBuf,

    #[serde(default = "default_unit_timeout_secs")]
    pub unit_timeout_secs: u64,

    #[serde(default = "default_accept_timeout_secs")]
    pub accept_timeout_secs: u64,

    #[serde(default = "default_max_concurrent_units")]
    pub max_concurrent_units: usize,

    #[serde(default = "default_artifact_pattern")]
    pub artifact_pattern: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            debug: false,
            adl: default_adl(),
            air: None,
            home: None,
            debug_app_root: default_debug_app_root(),
            unit_timeout_secs: default_unit_timeout_secs(),
            accept_timeout_secs: default_accept_timeout_secs(),
            max_concurrent_units: default_max_concurrent_units(),
            artifact_pattern: default_artifact_pattern(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_adl() -> PathBuf {
    PathBuf::from(ADL_BINARY)
}
fn default_debug_app_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(DATA_DIR_NAME)
        .join(APP_ROOT_DIR_NAME)
}
fn default_unit_timeout_secs() -> u64 {
    8
}
fn default_accept_timeout_secs() -> u64 {
    30
}
fn default_max_concurrent_units() -> usize {
    1
}
fn default_artifact_pattern() -> String {
    DEFAULT_ARTIFACT_PATTERN.to_string()
}

// ============================================
// IMPLEMENTATION
// ============================================

impl HarnessConfig {
    /// Load `{config_dir}/harness.json`, or defaults when there is none.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        Self::load_file(&config_path)
    }

    /// Load an explicitly named config file. A missing file is an error.
    pub fn load_file(config_path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.to_path_buf(),
                source: e,
            })?;

        let config: HarnessConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// File (explicit path, or `harness.json` in the working directory),
    /// then `.env`, then the process environment, then validation.
    pub fn resolve(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let config = match config_path {
            Some(path) => Self::load_file(path)?,
            None => Self::load(Path::new("."))?,
        };

        let config = config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay every `FUD_*` variable that is set.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Some(debug) = read_env(ENV_TEST_DEBUG)? {
            self.debug = parse_flag(ENV_TEST_DEBUG, &debug)?;
        }
        if let Some(adl) = read_env(ENV_ADL)? {
            self.adl = PathBuf::from(adl);
        }
        if let Some(air) = read_env(ENV_AIR)? {
            self.air = Some(PathBuf::from(air));
        }
        if let Some(home) = read_env(ENV_HOME)? {
            self.home = Some(PathBuf::from(home));
        }
        if let Some(root) = read_env(ENV_DEBUG_APP_ROOT)? {
            self.debug_app_root = PathBuf::from(root);
        }
        if let Some(secs) = read_env(ENV_UNIT_TIMEOUT_SECS)? {
            self.unit_timeout_secs = parse_number(ENV_UNIT_TIMEOUT_SECS, &secs)?;
        }
        if let Some(secs) = read_env(ENV_ACCEPT_TIMEOUT_SECS)? {
            self.accept_timeout_secs = parse_number(ENV_ACCEPT_TIMEOUT_SECS, &secs)?;
        }
        if let Some(units) = read_env(ENV_MAX_CONCURRENT_UNITS)? {
            self.max_concurrent_units = parse_number(ENV_MAX_CONCURRENT_UNITS, &units)?;
        }
        Ok(self)
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.unit_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "unit_timeout_secs must be greater than zero".to_string(),
            });
        }

        if self.accept_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "accept_timeout_secs must be greater than zero".to_string(),
            });
        }

        if self.max_concurrent_units == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "max_concurrent_units must be greater than zero".to_string(),
            });
        }

        if self.adl.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "adl executable cannot be empty".to_string(),
            });
        }

        self.artifact_filter().map(|_| ())
    }

    pub fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_secs(self.accept_timeout_secs)
    }

    pub fn artifact_filter(&self) -> Result<ArtifactFilter, ConfigError> {
        Regex::new(&self.artifact_pattern)
            .map(ArtifactFilter::new)
            .map_err(|e| ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Invalid artifact pattern {:?}: {e}", self.artifact_pattern),
            })
    }

    #[track_caller]
    pub fn runtime(&self) -> Result<&Path, ConfigError> {
        self.air.as_deref().ok_or(ConfigError::MissingSetting {
            location: ErrorLocation::from(Location::caller()),
            setting: ENV_AIR,
        })
    }

    #[track_caller]
    pub fn home(&self) -> Result<&Path, ConfigError> {
        self.home.as_deref().ok_or(ConfigError::MissingSetting {
            location: ErrorLocation::from(Location::caller()),
            setting: ENV_HOME,
        })
    }

    pub fn plugin_swf(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.home()?.join(PLUGIN_SWF_PATH))
    }

    pub fn content_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.home()?.join(CONTENT_DIR_PATH))
    }

    pub fn descriptor(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.home()?.join(DESCRIPTOR_PATH))
    }

    pub fn app_loader_swf(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.home()?.join(APP_LOADER_SWF_PATH))
    }

    /// Launch parameters for a worker calling back on `port`.
    pub fn launch_config(&self, port: u16, app_root: &Path) -> Result<LaunchConfig, HarnessError> {
        let config = LaunchConfigBuilder::default()
            .with_executable(&self.adl)
            .with_runtime(self.runtime()?)
            .with_plugin_swf(self.plugin_swf()?)
            .with_content_dir(self.content_dir()?)
            .with_descriptor(self.descriptor()?)
            .with_port(port)
            .with_app_root(app_root)
            .build()?;
        Ok(config)
    }
}

#[track_caller]
fn read_env(variable: &'static str) -> Result<Option<String>, ConfigError> {
    match env_var(variable) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::EnvError {
            location: ErrorLocation::from(Location::caller()),
            variable,
            reason: "value is not valid unicode".to_string(),
        }),
    }
}

#[track_caller]
pub(crate) fn parse_flag(variable: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::EnvError {
            location: ErrorLocation::from(Location::caller()),
            variable,
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

#[track_caller]
pub(crate) fn parse_number<T>(variable: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::EnvError {
            location: ErrorLocation::from(Location::caller()),
            variable,
            reason: format!("expected a number, got {value:?}: {e}"),
        })
}
