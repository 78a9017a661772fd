//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "IQAC_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "iqac.db";

/// Uploads directory name inside the root folder
pub const UPLOADS_DIR: &str = "uploads";

/// Optional server settings file inside the root folder
pub const SETTINGS_FILE: &str = "iqac.toml";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config_file_key: Option<&str>,
) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: TOML config file
    if let Some(key) = config_file_key {
        if let Ok(config_path) = load_config_file() {
            if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
                if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                    if let Some(root_folder) = config.get(key).and_then(|v| v.as_str()) {
                        return Ok(PathBuf::from(root_folder));
                    }
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(get_default_root_folder())
}

/// Get default configuration file path for the platform
fn load_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("iqac").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/iqac/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/iqac (or /var/lib/iqac for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("iqac"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/iqac"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("iqac"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/iqac"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("iqac"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\iqac"))
    } else {
        PathBuf::from("./iqac_data")
    }
}

/// Paths derived from the resolved root folder
#[derive(Debug, Clone)]
pub struct RootFolder {
    root: PathBuf,
}

impl RootFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    /// Create the root and uploads directories if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.uploads_path())?;
        Ok(())
    }
}

/// Server settings read from `iqac.toml`
///
/// Every field has a default so the file is optional and may be partial.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound for a single uploaded file
    pub max_upload_bytes: usize,
    /// Lifetime of issued access tokens
    pub token_ttl_hours: i64,
    /// Signing secret; when absent the secret stored in the database is used
    pub jwt_secret: Option<String>,
    /// bcrypt work factor for stored passwords
    pub bcrypt_cost: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
            max_upload_bytes: 10 * 1024 * 1024,
            token_ttl_hours: 12,
            jwt_secret: None,
            bcrypt_cost: crate::password::DEFAULT_HASH_COST,
        }
    }
}

impl ServerSettings {
    /// Load settings from a TOML file, falling back to defaults when the
    /// file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: ServerSettings = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid settings file: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be positive".to_string()));
        }
        if self.token_ttl_hours <= 0 {
            return Err(Error::Config("token_ttl_hours must be positive".to_string()));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(Error::Config("bcrypt_cost must be between 4 and 31".to_string()));
        }
        if let Some(secret) = &self.jwt_secret {
            if secret.len() < 32 {
                return Err(Error::Config(
                    "jwt_secret must be at least 32 characters".to_string(),
                ));
            }
        }
        Ok(())
    }
}
