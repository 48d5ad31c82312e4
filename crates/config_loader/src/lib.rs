//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `ForwarderConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("forwarder.toml")).unwrap();
//! println!("Outputs: {}", config.outputs.len());
//! ```

mod parser;
mod validator;

pub use contracts::ForwarderConfig;
pub use parser::ConfigFormat;

use contracts::ForwarderError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .conf / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ForwarderConfig, ForwarderError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ForwarderConfig, ForwarderError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize ForwarderConfig to TOML string
    pub fn to_toml(config: &ForwarderConfig) -> Result<String, ForwarderError> {
        toml::to_string_pretty(config)
            .map_err(|e| ForwarderError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ForwarderConfig to JSON string
    pub fn to_json(config: &ForwarderConfig) -> Result<String, ForwarderError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ForwarderError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ForwarderError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ForwarderError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ForwarderError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ForwarderError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ForwarderConfig, ForwarderError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
[[outputs]]
name = "zmqclient"
endpoint = "tcp://127.0.0.1:9999"
service = "telegraf"
data_format = "influx"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let cfg = result.unwrap();
        assert_eq!(cfg.outputs[0].name, "zmqclient");
    }

    #[test]
    fn test_round_trip_toml() {
        let cfg = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&cfg).unwrap();
        let cfg2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(cfg.outputs[0].name, cfg2.outputs[0].name);
        assert_eq!(cfg.outputs[0].endpoint, cfg2.outputs[0].endpoint);
    }

    #[test]
    fn test_round_trip_json() {
        let cfg = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&cfg).unwrap();
        let cfg2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(cfg.outputs[0].service, cfg2.outputs[0].service);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[[outputs]]
name = "a"
endpoint = "tcp://127.0.0.1:9999"

[[outputs]]
name = "a"
endpoint = "tcp://127.0.0.1:9998"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();

        let cfg = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(cfg.outputs.len(), 1);
    }

    #[test]
    fn test_load_from_path_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
