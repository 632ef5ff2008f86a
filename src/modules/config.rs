use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::models::AppConfig;

const CONFIG_FILE: &str = "gateway_config.json";
const DATA_DIR: &str = ".property_gateway";

/// Explicit config file path
pub const ENV_CONFIG_PATH: &str = "GATEWAY_CONFIG";
/// Backend base URL consumed by every route
pub const ENV_BACKEND_URL: &str = "BACKEND_API_URL";
pub const ENV_PORT: &str = "GATEWAY_PORT";
pub const ENV_ALLOW_LAN: &str = "GATEWAY_ALLOW_LAN";
pub const ENV_LOG_DIR: &str = "GATEWAY_LOG_DIR";

/// Get data directory, creating it when missing
pub fn get_data_dir() -> AppResult<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| AppError::Config("Failed to locate data directory".to_string()))?;
    let data_dir = base.join(DATA_DIR);

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
    }

    Ok(data_dir)
}

fn config_path() -> AppResult<PathBuf> {
    match std::env::var(ENV_CONFIG_PATH) {
        Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(get_data_dir()?.join(CONFIG_FILE)),
    }
}

/// Load application config: file (if any), then environment overrides
pub fn load_app_config() -> AppResult<AppConfig> {
    let mut config = read_config_file(&config_path()?)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;

    Ok(config)
}

/// Read a config file; a missing file yields defaults
pub fn read_config_file(path: &Path) -> AppResult<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> AppResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = lookup(ENV_BACKEND_URL) {
        config.proxy.backend_url = url.trim().to_string();
    }
    if let Some(port) = lookup(ENV_PORT) {
        config.proxy.port = port
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid {}: {}", ENV_PORT, port)))?;
    }
    if let Some(flag) = lookup(ENV_ALLOW_LAN) {
        config.proxy.allow_lan_access = match flag.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => {
                return Err(AppError::Config(format!(
                    "Invalid {}: {}",
                    ENV_ALLOW_LAN, flag
                )))
            }
        };
    }
    if let Some(dir) = lookup(ENV_LOG_DIR) {
        config.log_dir = Some(dir);
    }

    Ok(())
}

fn validate(config: &AppConfig) -> AppResult<()> {
    let url = url::Url::parse(&config.proxy.backend_url)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AppError::Config(format!(
            "Backend URL must be http(s): {}",
            config.proxy.backend_url
        )));
    }
    if url.host_str().is_none() {
        return Err(AppError::Config(format!(
            "Backend URL has no host: {}",
            config.proxy.backend_url
        )));
    }
    Ok(())
}
