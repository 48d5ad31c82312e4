//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ForwarderConfig, ForwarderError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" | "conf" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<ForwarderConfig, ForwarderError> {
    toml::from_str(content).map_err(|e| ForwarderError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<ForwarderConfig, ForwarderError> {
    serde_json::from_str(content).map_err(|e| ForwarderError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<ForwarderConfig, ForwarderError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DataFormat, DeliveryMode};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[outputs]]
name = "zmqclient"
endpoint = "tcp://127.0.0.1:9999"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let cfg = result.unwrap();
        assert_eq!(cfg.outputs.len(), 1);
        assert_eq!(cfg.outputs[0].service, "telegraf");
        assert_eq!(cfg.outputs[0].endpoint.address(), "127.0.0.1:9999");
    }

    #[test]
    fn test_parse_toml_full_output() {
        let content = r#"
version = "V1"

[[outputs]]
name = "graphite_out"
endpoint = "tcp://broker.local:5555"
service = "collector"
data_format = "graphite"
delivery = "blocking"
linger_ms = 0
send_high_water_mark = 50
identity = "edge-01"
graphite_prefix = "dc1"
queue_capacity = 8
"#;
        let cfg = parse_toml(content).unwrap();
        let out = &cfg.outputs[0];
        assert_eq!(out.service, "collector");
        assert_eq!(out.data_format, DataFormat::Graphite);
        assert_eq!(out.delivery, DeliveryMode::Blocking);
        assert_eq!(out.linger_ms, 0);
        assert_eq!(out.send_high_water_mark, Some(50));
        assert_eq!(out.identity.as_deref(), Some("edge-01"));
        assert_eq!(out.graphite_prefix.as_deref(), Some("dc1"));
        assert_eq!(out.queue_capacity, 8);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "outputs": [{ "name": "zmq", "endpoint": "ipc:///tmp/broker.sock", "data_format": "json" }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().outputs[0].data_format, DataFormat::Json);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ForwarderError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_rejects_malformed_endpoint() {
        let content = r#"
[[outputs]]
name = "zmq"
endpoint = "udp://127.0.0.1:9999"
"#;
        let err = parse_toml(content).unwrap_err();
        assert!(matches!(err, ForwarderError::ConfigParse { .. }));
        assert!(err.to_string().contains("unsupported transport"), "got: {err}");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
