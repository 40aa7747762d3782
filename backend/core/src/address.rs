//! Peer addresses as seen by the dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::KeygateError;

pub const MIN_PORT: u16 = 1;

/// A host with an optional port.
///
/// Trust registry entries are keyed by `host` only; the port of an inbound
/// connection is ephemeral.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    host: String,
    port: Option<u16>,
}

impl Address {
    /// Parse a strict `host:port` string. IPv6 hosts use `[::1]:8080`.
    pub fn parse(s: &str) -> Result<Self, KeygateError> {
        let s = s.trim();
        if let Ok(sock) = s.parse::<SocketAddr>() {
            return Ok(Self::from(sock));
        }
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| KeygateError::AddressParse(s.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| KeygateError::AddressParse(s.to_string()))?;
        Self::default().with_host(host)?.with_port(port)
    }

    /// Parse an `X-Forwarded-For` value: first entry, `host:port` or a bare IP.
    pub fn parse_forwarded(header: &str) -> Result<Self, KeygateError> {
        let first = header.split(',').next().unwrap_or_default().trim();
        if let Ok(ip) = first.parse::<IpAddr>() {
            return Ok(Self { host: ip.to_string(), port: None });
        }
        Self::parse(first)
    }

    pub fn localhost() -> Self {
        Self { host: "localhost".to_string(), port: None }
    }

    /// Set the host; only letters, digits, `_`, `.`, `-` and IPv6 `:` are accepted.
    pub fn with_host(mut self, host: &str) -> Result<Self, KeygateError> {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let valid = !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ':'));
        if !valid {
            return Err(KeygateError::AddressParse(format!(
                "{host} is an invalid domain"
            )));
        }
        self.host = host.to_string();
        Ok(self)
    }

    pub fn with_port(mut self, port: u16) -> Result<Self, KeygateError> {
        if port < MIN_PORT {
            return Err(KeygateError::AddressParse(format!(
                "port {port} must be within 1 to 65535"
            )));
        }
        self.port = Some(port);
        Ok(self)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_loopback(&self) -> bool {
        match self.host.parse::<IpAddr>() {
            Ok(ip) => ip.is_loopback(),
            Err(_) => self.host.eq_ignore_ascii_case("localhost"),
        }
    }
}

impl From<SocketAddr> for Address {
    fn from(sock: SocketAddr) -> Self {
        Self { host: sock.ip().to_string(), port: Some(sock.port()) }
    }
}

impl FromStr for Address {
    type Err = KeygateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match self.port {
            Some(port) => write!(f, "{host}:{port}"),
            None => f.write_str(&host),
        }
    }
}
