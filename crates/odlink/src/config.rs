//! Configuration loading

use anyhow::{Context, Result};
use odlink_usb::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub usb: UsbConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Which device to open and how to poll it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbConfig {
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,
    #[serde(default = "default_product_id")]
    pub product_id: u16,
    /// Serial number string to pick one of several attached devices
    #[serde(default)]
    pub serial: Option<String>,
    /// Upper bound for a single bulk IN poll
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            serial: None,
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

fn default_vendor_id() -> u16 {
    0x1209
}

fn default_product_id() -> u16 {
    0x0d32
}

fn default_poll_timeout_ms() -> u64 {
    10
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
