//! Endpoint identity: a remote caller's public key, replay state and permissions.
//!
//! The key exists in two forms: the parsed `VerifyingKey` and the decimal-byte
//! text carried in JSON/YAML. Decoding the text fills the key object; once the
//! key object is present it is the source of truth.

use keygate_core::{
    KeygateError, MISSING_NONCE, Method, PermissionSet, SignedCall, decode_key_bytes,
    encode_key_bytes,
};
use p256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::signing::{public_key_der, verify_signature, verifying_key_from_der};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(rename = "publicKey", default)]
    encoded_key: String,
    #[serde(skip)]
    public_key: Option<VerifyingKey>,
    #[serde(skip)]
    last_nonce: i64,
    #[serde(rename = "globalPermissions", default)]
    global: Option<PermissionSet>,
    #[serde(rename = "localPermissions", default)]
    local: HashMap<String, PermissionSet>,
}

impl Identity {
    pub fn new(name: impl Into<String>, public_key: VerifyingKey) -> Self {
        let encoded_key = public_key_der(&public_key)
            .map(|der| encode_key_bytes(&der))
            .unwrap_or_default();
        Self {
            name: name.into(),
            encoded_key,
            public_key: Some(public_key),
            last_nonce: MISSING_NONCE,
            global: None,
            local: HashMap::new(),
        }
    }

    /// Identity whose key is only known in its text form; decoded on first use.
    pub fn from_encoded(name: impl Into<String>, encoded_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encoded_key: encoded_key.into(),
            public_key: None,
            last_nonce: MISSING_NONCE,
            global: None,
            local: HashMap::new(),
        }
    }

    pub fn encoded_key(&self) -> &str {
        &self.encoded_key
    }

    pub fn last_nonce(&self) -> i64 {
        self.last_nonce
    }

    /// Return the parsed key, decoding and caching the text form if needed.
    ///
    /// A failed decode caches nothing.
    pub fn decode_public_key(&mut self) -> Result<&VerifyingKey, KeygateError> {
        if self.public_key.is_none() {
            if self.encoded_key.is_empty() {
                return Err(KeygateError::KeyDecode(format!(
                    "endpoint '{}' has no public key",
                    self.name
                )));
            }
            let der = decode_key_bytes(&self.encoded_key)?;
            self.public_key = Some(verifying_key_from_der(&der)?);
        }
        self.public_key
            .as_ref()
            .ok_or_else(|| KeygateError::KeyDecode("public key unavailable".into()))
    }

    /// X.509 DER bytes of the public key.
    pub fn public_key_der(&mut self) -> Result<Vec<u8>, KeygateError> {
        let key = self.decode_public_key()?;
        crate::signing::public_key_der(key)
    }

    /// Signature and replay check. Does not advance `last_nonce`.
    pub fn check(&mut self, call: &SignedCall) -> Result<(), KeygateError> {
        let last = self.last_nonce;
        let key = self.decode_public_key()?;
        if call.nonce() <= last {
            return Err(KeygateError::Replay { nonce: call.nonce(), last });
        }
        verify_signature(key, call)
    }

    pub fn verify(&mut self, call: &SignedCall) -> bool {
        match self.check(call) {
            Ok(()) => true,
            Err(e) => {
                debug!(endpoint = %self.name, error = %e, "Call verification failed");
                false
            }
        }
    }

    /// Record an accepted nonce. Never moves backwards.
    pub fn commit_nonce(&mut self, nonce: i64) {
        self.last_nonce = self.last_nonce.max(nonce);
    }

    pub fn global_permission(&self) -> Option<&PermissionSet> {
        self.global.as_ref()
    }

    pub fn set_global_permission(&mut self, permission: PermissionSet) {
        self.global = Some(permission);
    }

    pub fn local_permission(&self, route: &str) -> Option<&PermissionSet> {
        self.local.get(route)
    }

    /// Add a per-route override. An existing override is kept and `false` returned.
    pub fn add_local_permission(&mut self, route: impl Into<String>, permission: PermissionSet) -> bool {
        let route = route.into();
        if self.local.contains_key(&route) {
            return false;
        }
        self.local.insert(route, permission);
        true
    }

    /// A route override decides alone; otherwise the global set; otherwise deny.
    pub fn has_permission(&self, route: &str, method: Method) -> bool {
        match (self.local.get(route), &self.global) {
            (Some(local), _) => local.is_enabled(method),
            (None, Some(global)) => global.is_enabled(method),
            (None, None) => false,
        }
    }

    pub fn check_permission(&self, route: &str, method: Method) -> Result<(), KeygateError> {
        if self.has_permission(route, method) {
            Ok(())
        } else {
            Err(KeygateError::PermissionDenied {
                route: route.to_string(),
                method: method.to_string(),
            })
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "Identity({})", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{generate_signing_key, sign};

    fn signed(function: &str, key: &p256::ecdsa::SigningKey) -> SignedCall {
        let mut call = SignedCall::new(function);
        sign(&mut call, key).unwrap();
        call
    }

    #[test]
    fn no_permissions_fails_closed() {
        let key = generate_signing_key();
        let identity = Identity::new("test", *key.verifying_key());
        assert!(!identity.has_permission("/", Method::Get));
    }

    #[test]
    fn global_applies_without_override() {
        let key = generate_signing_key();
        let mut identity = Identity::new("test", *key.verifying_key());
        identity.set_global_permission(PermissionSet::of(&[Method::Get]));
        assert!(identity.has_permission("/", Method::Get));
        assert!(identity.has_permission("/other", Method::Get));
        assert!(!identity.has_permission("/", Method::Post));
    }

    #[test]
    fn local_override_shadows_global_deny_all() {
        let key = generate_signing_key();
        let mut identity = Identity::new("test", *key.verifying_key());
        identity.set_global_permission(PermissionSet::no_access());
        identity.add_local_permission("/", PermissionSet::of(&[Method::Get]));

        assert!(identity.has_permission("/", Method::Get));
        assert!(!identity.has_permission("/", Method::Post));
        assert!(!identity.has_permission("/elsewhere", Method::Get));
    }

    #[test]
    fn local_override_can_narrow_global() {
        let key = generate_signing_key();
        let mut identity = Identity::new("test", *key.verifying_key());
        identity.set_global_permission(PermissionSet::full_access());
        identity.add_local_permission("/admin", PermissionSet::no_access());

        assert!(!identity.has_permission("/admin", Method::Get));
        assert!(identity.has_permission("/", Method::Delete));
    }

    #[test]
    fn local_override_is_not_replaced() {
        let key = generate_signing_key();
        let mut identity = Identity::new("test", *key.verifying_key());
        assert!(identity.add_local_permission("/", PermissionSet::of(&[Method::Get])));
        assert!(!identity.add_local_permission("/", PermissionSet::full_access()));
        assert_eq!(
            identity.local_permission("/"),
            Some(&PermissionSet::of(&[Method::Get]))
        );
    }

    #[test]
    fn verify_then_replay() {
        let key = generate_signing_key();
        let mut identity = Identity::new("test", *key.verifying_key());
        let call = signed("/", &key);

        assert!(identity.verify(&call));
        // verification alone does not consume the nonce
        assert_eq!(identity.last_nonce(), MISSING_NONCE);
        identity.commit_nonce(call.nonce());

        assert!(matches!(identity.check(&call), Err(KeygateError::Replay { .. })));
    }

    #[test]
    fn resigned_call_passes_after_commit() {
        let key = generate_signing_key();
        let mut identity = Identity::new("test", *key.verifying_key());
        let mut call = signed("/", &key);
        identity.commit_nonce(call.nonce());

        sign(&mut call, &key).unwrap();
        assert!(identity.verify(&call));
    }

    #[test]
    fn commit_never_moves_backwards() {
        let key = generate_signing_key();
        let mut identity = Identity::new("test", *key.verifying_key());
        identity.commit_nonce(50);
        identity.commit_nonce(10);
        assert_eq!(identity.last_nonce(), 50);
    }

    #[test]
    fn decodes_text_key_lazily() {
        let key = generate_signing_key();
        let encoded = Identity::new("source", *key.verifying_key())
            .encoded_key()
            .to_string();
        let mut identity = Identity::from_encoded("peer", encoded);
        assert_eq!(identity.decode_public_key().unwrap(), key.verifying_key());

        let call = signed("/", &key);
        assert!(identity.verify(&call));
    }

    #[test]
    fn bad_text_key_fails_verification() {
        let key = generate_signing_key();
        let mut identity = Identity::from_encoded("peer", "48 89 19");
        assert!(matches!(
            identity.decode_public_key(),
            Err(KeygateError::KeyDecode(_))
        ));
        assert!(!identity.verify(&signed("/", &key)));

        let mut empty = Identity::from_encoded("peer", "");
        assert!(!empty.verify(&signed("/", &key)));
    }

    #[test]
    fn serde_form_uses_camel_case_fields() {
        let key = generate_signing_key();
        let mut identity = Identity::new("svc", *key.verifying_key());
        identity.set_global_permission(PermissionSet::of(&[Method::Get]));
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["name"], "svc");
        assert!(json["publicKey"].as_str().unwrap().starts_with("48 89"));
        assert_eq!(json["globalPermissions"]["get"], true);

        let mut back: Identity = serde_json::from_value(json).unwrap();
        assert_eq!(back.decode_public_key().unwrap(), key.verifying_key());
        assert_eq!(back.public_key_der().unwrap().len(), 91);
    }
}
