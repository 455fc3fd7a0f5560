//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CINELOG_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "cinelog.db";

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5080;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 86_400;

/// Optional keys read from `config.toml`
///
/// Every field is optional; a missing or unreadable file yields the default.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub session_timeout_secs: Option<u64>,
}

impl TomlConfig {
    /// Parse TOML content
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from the platform config file
    ///
    /// Never fails: a missing file is silent, a malformed file is logged and ignored.
    pub fn load() -> Self {
        let Ok(path) = config_file_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load from an explicit path, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match Self::parse(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring invalid config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Effective service settings after applying defaults
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    pub log_level: String,
    pub session_timeout_secs: u64,
}

impl ServiceConfig {
    /// Merge CLI overrides, environment and TOML values over compiled defaults
    pub fn resolve(
        cli_root_folder: Option<&Path>,
        cli_bind: Option<&str>,
        cli_port: Option<u16>,
        toml: &TomlConfig,
    ) -> Self {
        Self {
            root_folder: resolve_root_folder(cli_root_folder, ROOT_FOLDER_ENV, toml),
            bind: cli_bind
                .map(str::to_string)
                .or_else(|| toml.bind.clone())
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: cli_port.or(toml.port).unwrap_or(DEFAULT_PORT),
            log_level: toml
                .log_level
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            session_timeout_secs: toml
                .session_timeout_secs
                .unwrap_or(DEFAULT_SESSION_TIMEOUT_SECS),
        }
    }

    /// Path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_root_folder(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }
}

/// Root folder resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Get configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("cinelog").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/cinelog/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("cinelog"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\cinelog"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("cinelog"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/cinelog"))
    } else {
        dirs::data_local_dir()
            .map(|d| d.join("cinelog"))
            .unwrap_or_else(|| PathBuf::from("./cinelog_data"))
    }
}
