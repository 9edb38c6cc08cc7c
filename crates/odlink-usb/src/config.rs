//! Session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Protocol parameters for one device session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// USB interface carrying the bulk endpoint pair
    #[serde(default = "default_interface")]
    pub interface: u8,
    /// Bulk OUT endpoint address
    #[serde(default = "default_write_endpoint")]
    pub write_endpoint: u8,
    /// Bulk IN endpoint address
    #[serde(default = "default_read_endpoint")]
    pub read_endpoint: u8,
    /// How long a read waits for its matching response
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Transport write attempts per frame before the device is dropped
    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,
    /// Bytes requested per schema chunk
    #[serde(default = "default_schema_chunk_size")]
    pub schema_chunk_size: u16,
    /// Schema transfers growing past this many bytes are abandoned
    #[serde(default = "default_max_schema_bytes")]
    pub max_schema_bytes: usize,
    /// Index used in full paths (`odrv<index>.…`)
    #[serde(default)]
    pub device_index: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            write_endpoint: default_write_endpoint(),
            read_endpoint: default_read_endpoint(),
            timeout_ms: default_timeout_ms(),
            write_attempts: default_write_attempts(),
            schema_chunk_size: default_schema_chunk_size(),
            max_schema_bytes: default_max_schema_bytes(),
            device_index: 0,
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_interface() -> u8 {
    2
}

fn default_write_endpoint() -> u8 {
    0x03
}

fn default_read_endpoint() -> u8 {
    0x83
}

fn default_timeout_ms() -> u64 {
    500
}

fn default_write_attempts() -> u32 {
    5
}

fn default_schema_chunk_size() -> u16 {
    32
}

fn default_max_schema_bytes() -> usize {
    256 * 1024
}
