//! 配置校验模块
//!
//! 校验规则：
//! - 至少一个 output
//! - output 名称非空且唯一
//! - service 非空
//! - queue_capacity > 0
//! - linger_ms >= -1, send_high_water_mark >= 0

use std::collections::HashSet;

use contracts::{ForwarderConfig, ForwarderError, OutputConfig};

/// 校验 ForwarderConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ForwarderConfig) -> Result<(), ForwarderError> {
    validate_has_outputs(config)?;
    validate_output_names(config)?;
    for (idx, output) in config.outputs.iter().enumerate() {
        validate_output(idx, output)?;
    }
    Ok(())
}

fn validate_has_outputs(config: &ForwarderConfig) -> Result<(), ForwarderError> {
    if config.outputs.is_empty() {
        return Err(ForwarderError::config_validation(
            "outputs",
            "at least one output must be configured",
        ));
    }
    Ok(())
}

/// 校验 output 名称唯一性
fn validate_output_names(config: &ForwarderConfig) -> Result<(), ForwarderError> {
    let mut seen = HashSet::new();
    for (idx, output) in config.outputs.iter().enumerate() {
        if output.name.is_empty() {
            return Err(ForwarderError::config_validation(
                format!("outputs[{}].name", idx),
                "output name cannot be empty",
            ));
        }
        if !seen.insert(output.name.as_str()) {
            return Err(ForwarderError::config_validation(
                format!("outputs[name={}]", output.name),
                "duplicate output name",
            ));
        }
    }
    Ok(())
}

fn validate_output(idx: usize, output: &OutputConfig) -> Result<(), ForwarderError> {
    // An empty service still frames correctly but routes nowhere at the broker
    if output.service.is_degenerate() {
        return Err(ForwarderError::config_validation(
            format!("outputs[{}].service", idx),
            "service cannot be empty",
        ));
    }

    if output.queue_capacity == 0 {
        return Err(ForwarderError::config_validation(
            format!("outputs[{}].queue_capacity", idx),
            "queue_capacity must be > 0",
        ));
    }

    if output.linger_ms < -1 {
        return Err(ForwarderError::config_validation(
            format!("outputs[{}].linger_ms", idx),
            format!("linger_ms must be >= -1, got {}", output.linger_ms),
        ));
    }

    if let Some(hwm) = output.send_high_water_mark {
        if hwm < 0 {
            return Err(ForwarderError::config_validation(
                format!("outputs[{}].send_high_water_mark", idx),
                format!("send_high_water_mark must be >= 0, got {}", hwm),
            ));
        }
    }

    if let Some(identity) = &output.identity {
        if identity.is_empty() || identity.len() > 255 {
            return Err(ForwarderError::config_validation(
                format!("outputs[{}].identity", idx),
                "identity must be 1..=255 bytes",
            ));
        }
    }

    Ok(())
}
