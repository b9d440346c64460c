//! Optional JSON config for the terminal front-end. The engine itself
//! takes everything through its constructor; this only remembers the
//! user's name and network preferences between runs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/lanchat.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Explicit broadcast address, overriding interface selection.
    #[serde(default)]
    pub broadcast: Option<String>,
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}

/// Remembers the user's chosen name for the next run.
pub fn persist_user_name(path: &str, name: &str) {
    let mut config = load_config(path);
    config.name = Some(name.to_string());

    if let Err(err) = save_config(path, &config) {
        log::error!("Failed to write config {}: {err}", path);
    } else {
        log::info!("Persisted user name {} to {}", name, path);
    }
}
