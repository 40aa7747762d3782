//! Sender resolution for authorization.
//!
//! `X-FORWARDED-FOR` is preferred when forwarded-for trust is enabled. Only
//! enable that behind a trusted proxy: the header is otherwise a spoofable
//! identity channel.

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use keygate_core::{Address, KeygateError};
use std::net::SocketAddr;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

pub fn resolve_sender(parts: &Parts, trust_forwarded_for: bool) -> Result<Address, KeygateError> {
    if trust_forwarded_for {
        if let Some(value) = parts.headers.get(FORWARDED_FOR) {
            let text = value
                .to_str()
                .map_err(|_| KeygateError::AddressParse("non-ASCII forwarded-for header".into()))?;
            if !text.trim().is_empty() {
                return Address::parse_forwarded(text);
            }
        }
    }
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| Address::from(*addr))
        .ok_or_else(|| KeygateError::AddressParse("transport did not report a peer address".into()))
}

/// `application/json`, optionally with parameters such as `; charset=utf-8`.
pub fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder, peer: Option<SocketAddr>) -> Parts {
        let mut req = builder.body(Body::empty()).unwrap();
        if let Some(peer) = peer {
            req.extensions_mut().insert(ConnectInfo(peer));
        }
        req.into_parts().0
    }

    #[test]
    fn forwarded_header_wins_when_trusted() {
        let p = parts(
            Request::builder().header(FORWARDED_FOR, "10.0.0.7"),
            Some(SocketAddr::from(([127, 0, 0, 1], 40000))),
        );
        assert_eq!(resolve_sender(&p, true).unwrap().host(), "10.0.0.7");
        assert_eq!(resolve_sender(&p, false).unwrap().host(), "127.0.0.1");
    }

    #[test]
    fn missing_peer_is_address_error() {
        let p = parts(Request::builder(), None);
        assert!(matches!(
            resolve_sender(&p, true),
            Err(KeygateError::AddressParse(_))
        ));
    }

    #[test]
    fn garbage_forwarded_header_is_address_error() {
        let p = parts(
            Request::builder().header(FORWARDED_FOR, "not-an-ip"),
            Some(SocketAddr::from(([127, 0, 0, 1], 40000))),
        );
        assert!(resolve_sender(&p, true).is_err());
    }

    #[test]
    fn json_content_type_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_json_content(&headers));
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        assert!(is_json_content(&headers));
        headers.insert(CONTENT_TYPE, "Application/JSON; charset=utf-8".parse().unwrap());
        assert!(is_json_content(&headers));
        headers.insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        assert!(!is_json_content(&headers));
    }
}
