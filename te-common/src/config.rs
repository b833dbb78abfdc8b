//! Bootstrap configuration and root folder resolution
//!
//! Two tiers, as in every TuringEyes binary:
//! 1. **Bootstrap** (this module): root folder, listen address, logging.
//!    Read once at startup from CLI / environment / TOML / compiled defaults.
//! 2. **Runtime**: survey tunables in the `settings` table (see `db::init`).
//!
//! Root folder priority order:
//! 1. Command-line argument (handled by the caller, passed to [`RootFolderResolver::with_cli`])
//! 2. `TURINGEYES_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the TOML config file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "TURINGEYES_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "turingeyes.db";

/// Default HTTP port for te-server
pub const DEFAULT_PORT: u16 = 5780;

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; a missing file is equivalent to an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Address to bind (default 127.0.0.1)
    #[serde(default)]
    pub bind_address: Option<String>,

    /// HTTP port (default [`DEFAULT_PORT`])
    #[serde(default)]
    pub port: Option<u16>,

    /// Built front-end bundle to serve as static files
    #[serde(default)]
    pub static_assets: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
    }

    /// Load the first config file found in the standard locations
    ///
    /// A missing file is not an error; an unparsable one is logged and ignored
    /// so the service still starts on compiled defaults.
    pub fn load_default() -> Self {
        let Some(path) = config_file_path() else {
            debug!("No TuringEyes config file found, using defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                debug!("Loaded config file {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }
}

/// Standard config file locations, user file first
fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("turingeyes").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/turingeyes/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

/// OS-dependent default root folder
///
/// Linux `~/.local/share/turingeyes`, macOS `~/Library/Application Support/turingeyes`,
/// Windows `%LOCALAPPDATA%\turingeyes`.
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("turingeyes"))
        .unwrap_or_else(|| PathBuf::from("./turingeyes_data"))
}

/// Resolves the root folder following the priority order above
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(toml_config: &TomlConfig) -> Self {
        Self {
            cli_arg: None,
            toml_root: toml_config.root_folder.clone(),
        }
    }

    /// Highest-priority override from the command line
    pub fn with_cli(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Prepares the resolved root folder for use
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder if missing (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
        } else if !self.root_folder.is_dir() {
            return Err(Error::Config(format!(
                "Root folder is not a directory: {}",
                self.root_folder.display()
            )));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}
