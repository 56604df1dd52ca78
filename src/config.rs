//! # Configuration Management
//!
//! Centralized configuration for the codec, the framed transport and logging.
//!
//! ## Configuration Sources
//! - TOML files via [`WireConfig::from_file`]
//! - TOML strings via [`WireConfig::from_toml`]
//! - Environment variables via [`WireConfig::from_env`]
//! - Direct instantiation with defaults
//!
//! ## Security Considerations
//! - `max_depth` bounds stack use on hostile nesting
//! - String, container and frame limits are enforced before allocation

use crate::error::{constants, CodecError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::Level;

pub use crate::core::guard::{DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT};

/// Max allowed frame size (16 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Max declared length of a single string or binary value (8 MB)
pub const DEFAULT_MAX_STRING_LEN: usize = 8 * 1024 * 1024;

/// Max declared element count of a single container
pub const DEFAULT_MAX_CONTAINER_LEN: usize = 1024 * 1024;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct WireConfig {
    /// Codec behavior and limits
    #[serde(default)]
    pub codec: CodecConfig,

    /// Framed transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WireConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| CodecError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| CodecError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| CodecError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables over the defaults.
    ///
    /// Unparseable values are rejected rather than ignored.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(depth) = env_parse::<usize>("WIRE_CODEC_MAX_DEPTH")? {
            config.codec.max_depth = depth;
        }

        if let Some(strict) = env_parse::<bool>("WIRE_CODEC_STRICT_TYPES")? {
            config.codec.strict_types = strict;
        }

        if let Some(promote) = env_parse::<bool>("WIRE_CODEC_PROMOTE_INTEGERS")? {
            config.codec.promote_integers = promote;
        }

        if let Some(promote) = env_parse::<bool>("WIRE_CODEC_PROMOTE_FLOATS")? {
            config.codec.promote_floats = promote;
        }

        if let Some(size) = env_parse::<usize>("WIRE_CODEC_MAX_FRAME_SIZE")? {
            config.transport.max_frame_size = size;
        }

        if let Some(level) = env_parse::<Level>("WIRE_CODEC_LOG_LEVEL")? {
            config.logging.log_level = level;
        }

        if let Ok(path) = std::env::var("WIRE_CODEC_LOG_FILE") {
            config.logging.log_file = Some(PathBuf::from(path));
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
            .map_err(|e| CodecError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| CodecError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.codec.validate());
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());

        if self.codec.max_string_len > self.transport.max_frame_size {
            errors.push(format!(
                "max_string_len ({}) exceeds max_frame_size ({}); such strings can never arrive framed",
                self.codec.max_string_len, self.transport.max_frame_size
            ));
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CodecError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CodecError::ConfigError(format!("Invalid {key}={raw}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Codec behavior and read limits
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum nesting of structs and containers; the top-level struct is depth 1
    pub max_depth: usize,

    /// Fail with `SchemaMismatch` instead of skipping fields whose wire
    /// shape disagrees with the schema
    pub strict_types: bool,

    /// Accept a narrower wire integer for a wider declared integer
    pub promote_integers: bool,

    /// Accept any wire integer or the other float width for a declared
    /// float or double, converting with `as`
    pub promote_floats: bool,

    /// Maximum declared string/binary length in bytes
    pub max_string_len: usize,

    /// Maximum declared container element count
    pub max_container_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_types: false,
            promote_integers: false,
            promote_floats: false,
            max_string_len: DEFAULT_MAX_STRING_LEN,
            max_container_len: DEFAULT_MAX_CONTAINER_LEN,
        }
    }
}

impl CodecConfig {
    /// Validate codec configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_depth == 0 {
            errors.push(constants::ERR_ZERO_DEPTH.to_string());
        } else if self.max_depth > MAX_DEPTH_LIMIT {
            errors.push(format!(
                "max_depth too large: {} (maximum: {MAX_DEPTH_LIMIT})",
                self.max_depth
            ));
        }

        if self.max_string_len == 0 {
            errors.push("max_string_len must be greater than 0".to_string());
        } else if self.max_string_len > i32::MAX as usize {
            errors.push(format!(
                "max_string_len too large: {} (maximum: {})",
                self.max_string_len,
                i32::MAX
            ));
        }

        if self.max_container_len == 0 {
            errors.push("max_container_len must be greater than 0".to_string());
        } else if self.max_container_len > i32::MAX as usize {
            errors.push(format!(
                "max_container_len too large: {} (maximum: {})",
                self.max_container_len,
                i32::MAX
            ));
        }

        errors
    }
}

/// Framed transport configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum allowed frame payload size in bytes
    pub max_frame_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_frame_size == 0 {
            errors.push("Max frame size cannot be 0".to_string());
        } else if self.max_frame_size < 64 {
            errors.push("Max frame size too small (minimum: 64 bytes)".to_string());
        } else if self.max_frame_size > u32::MAX as usize {
            errors.push(format!(
                "Max frame size too large: {} bytes (length prefix is 32-bit)",
                self.max_frame_size
            ));
        }

        errors
    }
}

/// Subscriber settings consumed by [`crate::utils::logging::init`].
///
/// The console layer writes to stderr. The file layer is installed exactly
/// when `log_file` is set; both layers share `json_format` and `log_level`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Recorded on the startup event
    pub app_name: String,

    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    pub log_to_console: bool,

    /// Append events to this file
    pub log_file: Option<PathBuf>,

    /// JSON lines instead of the human readable format
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("wire-codec"),
            log_level: Level::INFO,
            log_to_console: true,
            log_file: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Check that `init` can build a subscriber from these settings
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.trim().is_empty() {
            errors.push("app_name must not be empty".to_string());
        } else if self.app_name.chars().any(char::is_whitespace) {
            errors.push(format!(
                "app_name must be a single token, got {:?}",
                self.app_name
            ));
        }

        if !self.log_to_console && self.log_file.is_none() {
            errors.push("no log output: enable log_to_console or set log_file".to_string());
        }

        if let Some(path) = &self.log_file {
            if path.as_os_str().is_empty() {
                errors.push("log_file must not be an empty path".to_string());
            } else if path.is_dir() {
                errors.push(format!("log_file is a directory: {}", path.display()));
            } else if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.is_dir() {
                    errors.push(format!(
                        "log_file directory does not exist: {}",
                        parent.display()
                    ));
                }
            }
        }

        errors
    }
}

/// Levels as lowercase names in TOML; parsing is case-insensitive.
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&level.as_str().to_ascii_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.trim()
            .parse::<Level>()
            .map_err(|_| serde::de::Error::custom(format!("unknown log level {name:?}")))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = WireConfig::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.codec.max_depth, 128);
        assert!(!config.codec.strict_types);
        assert_eq!(config.transport.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = WireConfig::from_toml(
            r#"
            [codec]
            max_depth = 16
            strict_types = true

            [logging]
            log_level = "debug"
            "#,
        )
        .expect("parse");
        assert_eq!(config.codec.max_depth, 16);
        assert!(config.codec.strict_types);
        assert_eq!(config.codec.max_container_len, DEFAULT_MAX_CONTAINER_LEN);
        assert_eq!(config.logging.log_level, Level::DEBUG);
        assert_eq!(config.transport, TransportConfig::default());
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let err = WireConfig::from_toml("[logging]\nlog_level = \"loud\"\n")
            .expect_err("must fail");
        assert!(matches!(err, CodecError::ConfigError(_)));
    }

    #[test]
    fn test_example_config_round_trips() {
        let text = WireConfig::example_config();
        let parsed = WireConfig::from_toml(&text).expect("parse example");
        assert_eq!(parsed, WireConfig::default());
    }

    #[test]
    fn test_zero_depth_invalid() {
        let config = WireConfig::default_with_overrides(|c| c.codec.max_depth = 0);
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("depth"));
        assert!(config.validate_strict().is_err());
    }

    #[test]
    fn test_string_limit_beyond_frame_flagged() {
        let config = WireConfig::default_with_overrides(|c| {
            c.transport.max_frame_size = 1024;
            c.codec.max_string_len = 4096;
        });
        assert!(config
            .validate()
            .iter()
            .any(|e| e.contains("max_string_len")));
    }

    #[test]
    fn test_depth_above_limit_invalid() {
        let at_limit = CodecConfig {
            max_depth: MAX_DEPTH_LIMIT,
            ..CodecConfig::default()
        };
        assert!(at_limit.validate().is_empty());

        let above = CodecConfig {
            max_depth: MAX_DEPTH_LIMIT + 1,
            ..CodecConfig::default()
        };
        assert!(above.validate().iter().any(|e| e.contains("max_depth")));
    }
}
