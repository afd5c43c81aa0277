//! Configuration loading and root folder resolution
//!
//! The root folder holds the SQLite database and the uploads directory.
//! Resolution follows a 4-tier priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no CLI argument is given
pub const ROOT_FOLDER_ENV: &str = "STUDYTRAIL_ROOT";

/// Database filename inside the root folder
pub const DATABASE_FILENAME: &str = "studytrail.db";

/// Uploads directory inside the root folder
pub const UPLOADS_DIRNAME: &str = "uploads";

/// Listen address loaded from the settings table
#[derive(Debug, Clone)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

/// Resolve the root folder per the 4-tier priority order
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Ensure the root folder and its uploads directory exist
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root)?;
    std::fs::create_dir_all(root.join(UPLOADS_DIRNAME))?;
    Ok(())
}

/// Path of the database file inside the root folder
pub fn database_path(root: &Path) -> PathBuf {
    root.join(DATABASE_FILENAME)
}

/// Path of the uploads directory inside the root folder
pub fn uploads_dir(root: &Path) -> PathBuf {
    root.join(UPLOADS_DIRNAME)
}

/// Locate the configuration file for the platform
fn locate_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/studytrail/config.toml first, then /etc/studytrail/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("studytrail").join("config.toml"));
        let system_config = PathBuf::from("/etc/studytrail/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let config_path = dirs::config_dir()
        .map(|d| d.join("studytrail").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!(
            "Config file not found: {:?}",
            config_path
        )))
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("studytrail"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/studytrail"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("studytrail"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/studytrail"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("studytrail"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\studytrail"))
    } else {
        PathBuf::from("./studytrail_data")
    }
}

/// Load the listen address from the settings table
pub async fn load_listen_config(db: &sqlx::SqlitePool) -> Result<ListenConfig> {
    let host: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'http_host'")
            .fetch_optional(db)
            .await?;

    let port: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'http_port'")
            .fetch_optional(db)
            .await?;

    let port = port
        .as_deref()
        .unwrap_or("5730")
        .parse::<u16>()
        .map_err(|e| Error::Config(format!("Invalid http_port setting: {}", e)))?;

    Ok(ListenConfig {
        host: host.unwrap_or_else(|| "127.0.0.1".to_string()),
        port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let root = resolve_root_folder(Some("/tmp/studytrail-cli"));
        assert_eq!(root, PathBuf::from("/tmp/studytrail-cli"));
    }

    #[test]
    fn default_is_nonempty() {
        let root = default_root_folder();
        assert!(!root.as_os_str().is_empty());
    }

    #[test]
    fn database_path_joins_filename() {
        let root = PathBuf::from("/data/studytrail");
        assert_eq!(
            database_path(&root),
            PathBuf::from("/data/studytrail/studytrail.db")
        );
        assert_eq!(
            uploads_dir(&root),
            PathBuf::from("/data/studytrail/uploads")
        );
    }
}
