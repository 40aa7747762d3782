//! Config defaults: fills every unset optional field.

use crate::schema::{KeygateConfig, LoggingConfig, NodeConfig};

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: KeygateConfig) -> KeygateConfig {
    let config = apply_node_defaults(config);
    apply_logging_defaults(config)
}

fn apply_node_defaults(mut config: KeygateConfig) -> KeygateConfig {
    let node = config.node.get_or_insert_with(NodeConfig::default);
    node.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    node.port.get_or_insert(DEFAULT_PORT);
    node.debug.get_or_insert(false);
    node.trust_forwarded_for.get_or_insert(true);
    node.shutdown_grace_secs.get_or_insert(DEFAULT_SHUTDOWN_GRACE_SECS);
    node.body_limit_bytes.get_or_insert(DEFAULT_BODY_LIMIT_BYTES);
    config
}

fn apply_logging_defaults(mut config: KeygateConfig) -> KeygateConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_empty_config() {
        let cfg = apply_all_defaults(KeygateConfig::default());
        let node = cfg.node.unwrap();
        assert_eq!(node.port, Some(DEFAULT_PORT));
        assert_eq!(node.debug, Some(false));
        assert_eq!(node.name, None);
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some(DEFAULT_LOG_LEVEL));
    }

    #[test]
    fn does_not_override_user_values() {
        let cfg = KeygateConfig {
            node: Some(NodeConfig {
                port: Some(9100),
                trust_forwarded_for: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let node = apply_all_defaults(cfg).node.unwrap();
        assert_eq!(node.port, Some(9100));
        assert_eq!(node.trust_forwarded_for, Some(false));
        assert_eq!(node.bind.as_deref(), Some(DEFAULT_BIND));
    }
}
