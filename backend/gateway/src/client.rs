//! Caller side: post a signed call to a remote node and decode its envelope.

use anyhow::{Context, Result};
use keygate_core::{Method, SignedCall};
use keygate_security::{SigningKey, sign};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

use crate::response::CallResponse;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    base_url: String,
}

impl RpcClient {
    /// Client for `base_url` (e.g. `http://10.0.0.5:8080`) with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        // the node authorizes by peer address, which a proxy would replace
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send an already-signed call to `base_url + function`.
    ///
    /// Rejections come back as an `Ok` envelope carrying the status; only
    /// transport and decoding faults are errors.
    pub async fn send(&self, call: &SignedCall, method: Method) -> Result<CallResponse> {
        let url = format!("{}{}", self.base_url, call.function);
        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .context("invalid HTTP method")?;
        let body = call.to_json()?;

        debug!(%url, %method, nonce = call.nonce(), "Sending call");
        let response = self
            .http
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("reading response from {url} failed"))?;

        // 204 replies carry no body
        if bytes.is_empty() {
            let mut envelope = CallResponse::new();
            envelope.set_status(status);
            return Ok(envelope);
        }
        let mut envelope: CallResponse =
            serde_json::from_slice(&bytes).context("response was not a JSON envelope")?;
        envelope.set_status(status);
        Ok(envelope)
    }

    /// Sign `call` (fresh or incremented nonce) and send it.
    pub async fn send_signed(
        &self,
        call: &mut SignedCall,
        key: &SigningKey,
        method: Method,
    ) -> Result<CallResponse> {
        sign(call, key)?;
        self.send(call, method).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = RpcClient::new("http://127.0.0.1:9000/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9000");
    }

    #[tokio::test]
    async fn unreachable_node_is_an_error() {
        let client =
            RpcClient::with_timeout("http://127.0.0.1:1", Duration::from_millis(200)).unwrap();
        let call = SignedCall::new("/");
        assert!(client.send(&call, Method::Get).await.is_err());
    }
}
