//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出
//! - 转发指标记录与统计 (信封数、字节数、发送失败)
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::metrics;
//!
//! observability::init_with_config(&ObservabilityConfig::for_verbosity(1, false))?;
//!
//! // 每个成功发送的信封
//! metrics::record_envelope_sent("zmqclient", bytes);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_batch_dispatched, record_envelope_sent, record_send_failure, ForwardStatsAggregator,
    ForwardSummary, RunningStats, StatsSummary,
};

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 转发器可观测性配置
///
/// 日志一律写到 stderr，stdout 留给命令输出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 过滤指令 (RUST_LOG 语法)
    pub level: String,
    /// 是否允许 RUST_LOG 覆盖 `level`
    pub env_override: bool,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::for_verbosity(0, false)
    }
}

impl ObservabilityConfig {
    /// 由命令行的 `-v` 次数与 `--quiet` 推导日志级别
    ///
    /// `--quiet` 固定为 warn，不受 RUST_LOG 影响。
    pub fn for_verbosity(verbose: u8, quiet: bool) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        Self {
            log_format: LogFormat::default(),
            level: level.to_string(),
            env_override: !quiet,
            metrics_port: None,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    fn env_filter(&self) -> EnvFilter {
        if self.env_override {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return filter;
            }
        }
        EnvFilter::new(&self.level)
    }
}

/// 初始化 Tracing，并在配置了端口时启动 Prometheus 导出
pub fn init_with_config(config: &ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.level,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(ObservabilityConfig::for_verbosity(0, false).level, "info");
        assert_eq!(ObservabilityConfig::for_verbosity(1, false).level, "debug");
        assert_eq!(ObservabilityConfig::for_verbosity(3, false).level, "trace");

        let quiet = ObservabilityConfig::for_verbosity(2, true);
        assert_eq!(quiet.level, "warn");
        assert!(!quiet.env_override);
    }

    #[test]
    fn test_quiet_filter_ignores_env() {
        let config = ObservabilityConfig::for_verbosity(0, true);
        assert_eq!(config.env_filter().to_string(), "warn");
    }

    #[test]
    fn test_builders() {
        let config = ObservabilityConfig::default()
            .with_format(LogFormat::Json)
            .with_metrics_port(9100);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.metrics_port, Some(9100));
        assert_eq!(config.level, "info");
    }
}
