//! # Configuration Management
//!
//! Centralized configuration for UDP-over-TCP endpoints.
//!
//! This module provides structured configuration for frame limits, the client
//! and server sides of the TCP transport, and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Limits
//! - Address and payload limits are enforced on both encode and decode
//! - Neither limit may exceed the 16-bit length field (65535)

use crate::core::address::MAX_ENCODED_ADDRESS_LEN;
use crate::core::frame::{FrameLimits, MAX_FRAME_PAYLOAD};
use crate::error::{ProtocolError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct UotConfig {
    /// Frame size limits
    #[serde(default)]
    pub frame: FrameConfig,

    /// Client-side transport configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Server-side transport configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl UotConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("UOT_SERVER_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(addr) = std::env::var("UOT_CLIENT_ADDRESS") {
            config.client.address = addr;
        }

        if let Ok(size) = std::env::var("UOT_MAX_PAYLOAD_SIZE") {
            config.frame.max_payload_size = size.parse::<usize>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid UOT_MAX_PAYLOAD_SIZE: {e}"))
            })?;
        }

        if let Ok(size) = std::env::var("UOT_MAX_ADDRESS_SIZE") {
            config.frame.max_address_size = size.parse::<usize>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid UOT_MAX_ADDRESS_SIZE: {e}"))
            })?;
        }

        if let Ok(timeout) = std::env::var("UOT_CONNECT_TIMEOUT_MS") {
            let millis = timeout.parse::<u64>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid UOT_CONNECT_TIMEOUT_MS: {e}"))
            })?;
            config.client.connect_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.frame.validate());
        errors.extend(self.client.validate());
        errors.extend(self.server.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Frame size limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrameConfig {
    /// Maximum encoded address length in bytes
    pub max_address_size: usize,

    /// Maximum datagram payload in bytes
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_address_size: MAX_ENCODED_ADDRESS_LEN,
            max_payload_size: MAX_FRAME_PAYLOAD,
        }
    }
}

impl FrameConfig {
    /// Validate frame limits
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // Smallest real address is IPv4: type + 4 + port
        if self.max_address_size < 7 {
            errors.push(format!(
                "Max address size too small: {} (minimum: 7 bytes)",
                self.max_address_size
            ));
        } else if self.max_address_size > MAX_FRAME_PAYLOAD {
            errors.push(format!(
                "Max address size too large: {} (maximum: {MAX_FRAME_PAYLOAD})",
                self.max_address_size
            ));
        }

        if self.max_payload_size > MAX_FRAME_PAYLOAD {
            errors.push(format!(
                "Max payload size too large: {} (maximum: {MAX_FRAME_PAYLOAD})",
                self.max_payload_size
            ));
        }

        errors
    }

    pub fn limits(&self) -> FrameLimits {
        FrameLimits::new(self.max_address_size, self.max_payload_size)
    }
}

/// Client-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Server address to dial
    pub address: String,

    /// Timeout for connection attempts
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Whether to send the 2-byte preface after connecting
    pub send_preface: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:9000"),
            connect_timeout: timeout::DEFAULT_CONNECT_TIMEOUT,
            send_preface: true,
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Client address cannot be empty".to_string());
        } else if !self.address.contains(':') {
            errors.push(format!(
                "Invalid client address format: '{}' (expected format: 'example.com:8080')",
                self.address
            ));
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 300 {
            errors.push("Connect timeout too long (maximum: 300s)".to_string());
        }

        errors
    }
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server listen address (e.g., "127.0.0.1:9000")
    pub address: String,

    /// How long a new connection may take to send its preface
    #[serde(with = "duration_serde")]
    pub preface_timeout: Duration,

    /// Whether clients must open with the preface
    pub expect_preface: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:9000"),
            preface_timeout: timeout::DEFAULT_PREFACE_TIMEOUT,
            expect_preface: true,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:8080')",
                self.address
            ));
        }

        if self.expect_preface {
            if self.preface_timeout.as_millis() < 100 {
                errors.push("Preface timeout too short (minimum: 100ms)".to_string());
            } else if self.preface_timeout.as_secs() > 120 {
                errors.push("Preface timeout too long (maximum: 120s)".to_string());
            }
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("uot-protocol"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
