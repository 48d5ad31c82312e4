//! `validate` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::{DeliveryMode, ForwarderConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    output_count: usize,
    endpoints: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    output_count: config.outputs.len(),
                    endpoints: config
                        .outputs
                        .iter()
                        .map(|o| o.endpoint.to_string())
                        .collect(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ForwarderConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    // A ROUTER routes by identity; two peers with the same one collide
    let mut identities: HashMap<(&str, &str), &str> = HashMap::new();
    for output in &config.outputs {
        if let Some(identity) = output.identity.as_deref() {
            let key = (output.endpoint.as_str(), identity);
            if let Some(first) = identities.insert(key, &output.name) {
                warnings.push(format!(
                    "Outputs '{}' and '{}' share identity '{}' on {}",
                    first, output.name, identity, output.endpoint
                ));
            }
        }
    }

    for output in &config.outputs {
        if output.linger_ms < 0 {
            warnings.push(format!(
                "Output '{}' has linger_ms = -1 - close waits until every queued message is sent",
                output.name
            ));
        }
        if output.delivery == DeliveryMode::Blocking && output.send_high_water_mark.is_none() {
            warnings.push(format!(
                "Output '{}' blocks on a full buffer with the default high water mark",
                output.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Outputs: {}", summary.output_count);
            for endpoint in &summary.endpoints {
                println!("    - {}", endpoint);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
