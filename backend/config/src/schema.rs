//! keygate runtime configuration schema.
//!
//! Every scalar is optional on disk; `apply_all_defaults` fills the gaps.

use keygate_core::{Address, KeygateError, PermissionSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeygateConfig {
    /// Listener and dispatcher settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Endpoints registered in the trust registry at startup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trusted: Vec<TrustedPeerConfig>,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name used in logs; random when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Loopback callers skip authentication. Development only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,

    /// Take the sender from `X-Forwarded-For`. Only behind a trusted proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_forwarded_for: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_grace_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_limit_bytes: Option<usize>,
}

impl NodeConfig {
    /// Listening address built from `bind` and `port`.
    pub fn address(&self) -> Result<Address, KeygateError> {
        let bind = self.bind.as_deref().unwrap_or(crate::defaults::DEFAULT_BIND);
        let port = self.port.unwrap_or(crate::defaults::DEFAULT_PORT);
        Address::default().with_host(bind)?.with_port(port)
    }

    pub fn is_loopback_bind(&self) -> bool {
        self.address().map(|a| a.is_loopback()).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for the daily-rolling JSON log; no file log when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// JSON console output instead of human-readable lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

// ---------------------------------------------------------------------------
// Trusted peers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrustedPeerConfig {
    /// Peer host, optionally with a port (the port is ignored for lookup)
    pub address: String,

    pub name: String,

    /// Public key as decimal DER bytes separated by single spaces
    pub public_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<PermissionSet>,

    /// Per-route overrides; a route listed here ignores `global`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub local: BTreeMap<String, PermissionSet>,
}

impl TrustedPeerConfig {
    /// Registry key for this peer: the host part of `address`.
    pub fn host(&self) -> Result<String, KeygateError> {
        if let Ok(ip) = self.address.trim().parse::<IpAddr>() {
            return Ok(ip.to_string());
        }
        let address = match Address::parse(&self.address) {
            Ok(address) => address,
            Err(_) => Address::default().with_host(self.address.trim())?,
        };
        Ok(address.host().to_string())
    }
}
