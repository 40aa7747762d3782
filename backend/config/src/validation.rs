//! Config validation: every problem found in one pass, with field paths.

use crate::schema::{KeygateConfig, NodeConfig};
use keygate_core::decode_key_bytes;
use keygate_security::verifying_key_from_der;
use std::collections::HashSet;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &KeygateConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    if let Some(node) = &config.node {
        validate_node(node, &mut report);
    }
    validate_trusted(config, &mut report);
    report
}

fn validate_node(node: &NodeConfig, report: &mut ValidationReport) {
    if node.port == Some(0) {
        report.error("node.port", "port must be within 1 to 65535");
    }
    if let Some(bind) = &node.bind {
        if keygate_core::Address::default().with_host(bind).is_err() {
            report.error("node.bind", format!("'{bind}' is not a valid host"));
        }
    }
    if matches!(&node.name, Some(name) if name.trim().is_empty()) {
        report.error("node.name", "name cannot be empty; omit it for a generated name");
    }
    if node.body_limit_bytes == Some(0) {
        report.error("node.body_limit_bytes", "body limit must be > 0");
    }

    let debug = node.debug.unwrap_or(false);
    let forwarded = node.trust_forwarded_for.unwrap_or(true);
    if node.is_loopback_bind() {
        return;
    }
    // a forged X-Forwarded-For: 127.0.0.1 would pass the debug loopback bypass
    if debug && forwarded {
        report.error(
            "node.debug",
            "debug mode with forwarded-for trust on a non-loopback bind lets any caller skip authentication",
        );
    } else if debug {
        report.warn("node.debug", "debug mode is enabled on a non-loopback bind");
    }
    if forwarded {
        report.warn(
            "node.trust_forwarded_for",
            "X-Forwarded-For is trusted on a non-loopback bind; only do this behind a trusted proxy",
        );
    }
}

fn validate_trusted(config: &KeygateConfig, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for (i, peer) in config.trusted.iter().enumerate() {
        let path = format!("trusted[{i}]");

        if peer.name.trim().is_empty() {
            report.error(format!("{path}.name"), "peer name cannot be empty");
        }

        match peer.host() {
            Ok(host) => {
                if !seen.insert(host.clone()) {
                    report.error(
                        format!("{path}.address"),
                        format!("'{host}' is already trusted; the first entry wins"),
                    );
                }
            }
            Err(e) => report.error(format!("{path}.address"), e.to_string()),
        }

        if peer.public_key.trim().is_empty() {
            report.error(format!("{path}.public_key"), "public key cannot be empty");
        } else if let Err(e) =
            decode_key_bytes(&peer.public_key).and_then(|der| verifying_key_from_der(&der))
        {
            report.error(format!("{path}.public_key"), e.to_string());
        }

        if peer.global.is_none() && peer.local.is_empty() {
            report.warn(&path, "peer has no permissions and will be denied every call");
        }
        for route in peer.local.keys() {
            if !route.starts_with('/') {
                report.warn(
                    format!("{path}.local"),
                    format!("route '{route}' does not start with '/' and can never match"),
                );
            }
        }
    }
}
