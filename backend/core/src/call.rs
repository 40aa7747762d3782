//! The signed call envelope carried in every request body.
//!
//! Wire form:
//! `{ "function": "/path", "param": ["a"], "auth": { "signature": "<base64 DER>", "nonce": 42 } }`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::KeygateError;

/// Nonce value of a call that has never been signed.
pub const MISSING_NONCE: i64 = 0;

/// Signature and nonce bound to a call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAuth {
    #[serde(default, with = "signature_b64")]
    pub signature: Vec<u8>,
    #[serde(default)]
    pub nonce: i64,
}

/// A remote call: target function, positional parameters and its auth block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCall {
    pub function: String,
    #[serde(default)]
    pub param: Vec<String>,
    #[serde(default)]
    pub auth: CallAuth,
}

impl SignedCall {
    pub fn new(function: impl Into<String>) -> Self {
        Self { function: function.into(), ..Default::default() }
    }

    pub fn with_param(mut self, value: impl Into<String>) -> Self {
        self.param.push(value.into());
        self
    }

    pub fn nonce(&self) -> i64 {
        self.auth.nonce
    }

    pub fn signature(&self) -> &[u8] {
        &self.auth.signature
    }

    pub fn is_signed(&self) -> bool {
        self.auth.nonce != MISSING_NONCE && !self.auth.signature.is_empty()
    }

    /// SHA-256 over the function name followed by the decimal nonce.
    pub fn canonical_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.function.as_bytes());
        hasher.update(self.auth.nonce.to_string().as_bytes());
        hasher.finalize().into()
    }

    pub fn canonical_hash_hex(&self) -> String {
        hex::encode(self.canonical_hash())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, KeygateError> {
        serde_json::to_vec(self).map_err(|e| KeygateError::Other(e.into()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, KeygateError> {
        serde_json::from_slice(bytes).map_err(|e| KeygateError::MalformedBody(e.to_string()))
    }
}

/// Signature bytes travel as standard base64 text; `null` reads as empty.
mod signature_b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            Some(text) => STANDARD.decode(text).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_binds_function_and_nonce() {
        let mut a = SignedCall::new("/transfer");
        a.auth.nonce = 17;
        let mut b = SignedCall::new("/transfer");
        b.auth.nonce = 18;
        let mut c = SignedCall::new("/withdraw");
        c.auth.nonce = 17;

        assert_ne!(a.canonical_hash(), b.canonical_hash());
        assert_ne!(a.canonical_hash(), c.canonical_hash());

        let expected: [u8; 32] = Sha256::digest(b"/transfer17").into();
        assert_eq!(a.canonical_hash(), expected);
    }

    #[test]
    fn hash_ignores_params() {
        let a = SignedCall::new("/").with_param("x");
        let b = SignedCall::new("/").with_param("y");
        assert_eq!(a.canonical_hash_hex(), b.canonical_hash_hex());
    }

    #[test]
    fn decodes_minimal_body() {
        let call = SignedCall::from_json(br#"{"function": "/"}"#).unwrap();
        assert_eq!(call.function, "/");
        assert!(call.param.is_empty());
        assert_eq!(call.nonce(), MISSING_NONCE);
        assert!(!call.is_signed());
    }

    #[test]
    fn decodes_null_signature() {
        let call =
            SignedCall::from_json(br#"{"function": "/", "auth": {"signature": null, "nonce": 5}}"#)
                .unwrap();
        assert!(call.signature().is_empty());
        assert_eq!(call.nonce(), 5);
    }

    #[test]
    fn signature_is_base64_on_the_wire() {
        let mut call = SignedCall::new("/");
        call.auth.signature = vec![1, 2, 3];
        call.auth.nonce = 9;
        let json: serde_json::Value = serde_json::from_slice(&call.to_json().unwrap()).unwrap();
        assert_eq!(json["auth"]["signature"], "AQID");
        assert_eq!(json["auth"]["nonce"], 9);
    }

    #[test]
    fn malformed_body_is_client_error() {
        let err = SignedCall::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, KeygateError::MalformedBody(_)));
        assert_eq!(err.status_code(), 400);
    }
}
