//! Configuration loading for pw-core.
//!
//! The configuration is a single optional TOML file:
//!
//! ```toml
//! proc_root = "/proc"
//! etc_root = "/etc"
//! sort_by_pid = true
//! windows_strategy = "snapshot"   # or "psapi"
//! sysctl_attempts = 3
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "PROCWALK_CONFIG";

/// Directory under the XDG config home.
const CONFIG_DIR_NAME: &str = "procwalk";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// How the Windows backend lists processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowsStrategy {
    /// ToolHelp snapshot: image names, parents and thread counts in one pass.
    #[default]
    Snapshot,
    /// `EnumProcesses` plus a per-process image path query.
    Psapi,
}

impl std::str::FromStr for WindowsStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snapshot" | "toolhelp" => Ok(WindowsStrategy::Snapshot),
            "psapi" => Ok(WindowsStrategy::Psapi),
            _ => Err(format!("unknown windows strategy: {}", s)),
        }
    }
}

/// Enumeration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnumConfig {
    /// Root of the per-process pseudo-filesystem (Linux).
    pub proc_root: PathBuf,
    /// Directory holding `passwd` and `group` (Linux).
    pub etc_root: PathBuf,
    /// Sort enumeration results by ascending pid.
    pub sort_by_pid: bool,
    pub windows_strategy: WindowsStrategy,
    /// Upper bound on sysctl fetches while the process table keeps growing.
    pub sysctl_attempts: u32,
}

impl Default for EnumConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            etc_root: PathBuf::from("/etc"),
            sort_by_pid: true,
            windows_strategy: WindowsStrategy::Snapshot,
            sysctl_attempts: 3,
        }
    }
}

impl EnumConfig {
    /// Parse and validate TOML text. `path` only labels errors.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: EnumConfig = toml::from_str(content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sysctl_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "sysctl_attempts",
                message: "must be at least 1".to_string(),
            });
        }
        if self.proc_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "proc_root",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority).
    pub config_path: Option<PathBuf>,
}

/// A loaded configuration and the file it came from, if any.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: EnumConfig,
    pub source: Option<PathBuf>,
}

/// Where to look for the config file, and whether it must exist.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigLocation {
    Required(PathBuf),
    Optional(PathBuf),
    Defaults,
}

/// Load configuration with the standard resolution order.
///
/// Resolution order (highest to lowest priority):
/// 1. Explicit path (via ConfigOptions)
/// 2. Environment variable (PROCWALK_CONFIG)
/// 3. XDG config home (~/.config/procwalk/config.toml)
/// 4. Built-in defaults
///
/// Explicitly named files must exist; the XDG file is optional.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let location = resolve_location(
        options,
        std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
        xdg_config_home(),
    );
    load_from(location)
}

fn xdg_config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
}

fn resolve_location(
    options: &ConfigOptions,
    env_path: Option<PathBuf>,
    config_home: Option<PathBuf>,
) -> ConfigLocation {
    if let Some(path) = &options.config_path {
        return ConfigLocation::Required(path.clone());
    }
    if let Some(path) = env_path.filter(|p| !p.as_os_str().is_empty()) {
        return ConfigLocation::Required(path);
    }
    match config_home {
        Some(home) => ConfigLocation::Optional(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)),
        None => ConfigLocation::Defaults,
    }
}

fn load_from(location: ConfigLocation) -> Result<ResolvedConfig, ConfigError> {
    let (path, required) = match location {
        ConfigLocation::Required(path) => (path, true),
        ConfigLocation::Optional(path) => (path, false),
        ConfigLocation::Defaults => {
            return Ok(ResolvedConfig {
                config: EnumConfig::default(),
                source: None,
            })
        }
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if required {
                return Err(ConfigError::NotFound { path });
            }
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(ResolvedConfig {
                config: EnumConfig::default(),
                source: None,
            });
        }
        Err(source) => return Err(ConfigError::IoError { path, source }),
    };

    let config = EnumConfig::from_toml_str(&content, &path)?;
    debug!(path = %path.display(), "loaded config");
    Ok(ResolvedConfig {
        config,
        source: Some(path),
    })
}

static PROCESS_CONFIG: OnceLock<EnumConfig> = OnceLock::new();

/// Configuration used by the crate-level convenience functions.
///
/// Loaded once per process. A broken config file is logged and replaced by
/// the defaults so that enumeration keeps working.
pub fn process_config() -> &'static EnumConfig {
    PROCESS_CONFIG.get_or_init(|| match load_config(&ConfigOptions::default()) {
        Ok(resolved) => resolved.config,
        Err(err) => {
            warn!(error = %err, "ignoring unusable config");
            EnumConfig::default()
        }
    })
}
