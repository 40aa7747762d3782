//! `keygate-config`: node configuration management.
//!
//! Provides:
//! - Typed config schema (node, logging, trusted peers)
//! - YAML read/write with atomic replace and backup rotation
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with field-path reports

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{MissingEnvVarError, resolve_env_vars, resolve_env_vars_with};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use schema::{KeygateConfig, LoggingConfig, NodeConfig, TrustedPeerConfig};
pub use validation::{ConfigValidationError, ValidationReport, validate};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::Path;

/// Load → env substitution → defaults → validate.
///
/// Warnings are logged; any validation error aborts.
pub async fn load_and_prepare(path: &Path) -> Result<KeygateConfig> {
    let raw_config = load_config(path).await?;
    let config = prepare(&raw_config, resolve_env_vars)?;
    Ok(config)
}

fn prepare(raw: &KeygateConfig, substitute: impl Fn(&Value) -> Result<Value>) -> Result<KeygateConfig> {
    let value = serde_json::to_value(raw).context("Failed to serialize config for processing")?;
    let value = substitute(&value).context("Failed to resolve env vars in config")?;
    let config: KeygateConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!("config has {} error(s); first: {}", report.errors.len(), report.errors[0]);
    }
    Ok(config)
}
