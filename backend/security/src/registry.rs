//! Trust registry: peer host → `Identity`, behind a single lock.
//!
//! Every read and write takes the same mutex, so a lookup during request
//! handling never races a concurrent add/remove.

use keygate_core::{Address, KeygateError, Method, SignedCall};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::identity::Identity;

#[derive(Debug, Default)]
pub struct TrustRegistry {
    trusted: Mutex<HashMap<String, Identity>>,
}

impl TrustRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Identity>> {
        self.trusted.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `identity` for `host`. An occupied host is left untouched and `false` returned.
    pub fn add_trusted(&self, host: impl Into<String>, identity: Identity) -> bool {
        let host = host.into();
        let mut trusted = self.lock();
        if trusted.contains_key(&host) {
            warn!("[Trust] Refusing to replace endpoint registered at {}", host);
            return false;
        }
        info!("[Trust] Registered endpoint '{}' at {}", identity.name, host);
        trusted.insert(host, identity);
        true
    }

    /// Remove the endpoint at `host`, if any.
    pub fn remove_trusted(&self, host: &str) {
        if let Some(identity) = self.lock().remove(host) {
            info!("[Trust] Removed endpoint '{}' at {}", identity.name, host);
        }
    }

    pub fn contains(&self, host: &str) -> bool {
        self.lock().contains_key(host)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.lock().keys().cloned().collect();
        hosts.sort();
        hosts
    }

    /// Clone of the identity registered at `host`.
    pub fn get(&self, host: &str) -> Option<Identity> {
        self.lock().get(host).cloned()
    }

    /// Mutate a registered identity in place (e.g. grant permissions after registration).
    pub fn update(&self, host: &str, f: impl FnOnce(&mut Identity)) -> bool {
        match self.lock().get_mut(host) {
            Some(identity) => {
                f(identity);
                true
            }
            None => false,
        }
    }

    /// Permission, signature and replay checks for one call; commits the nonce on success.
    ///
    /// Check and commit happen under one lock acquisition, so two concurrent
    /// submissions of the same nonce cannot both pass.
    pub fn authorize(
        &self,
        sender: &Address,
        call: &SignedCall,
        route: &str,
        method: Method,
    ) -> Result<(), KeygateError> {
        let mut trusted = self.lock();
        let identity = trusted
            .get_mut(sender.host())
            .ok_or_else(|| KeygateError::UnknownSender(sender.host().to_string()))?;

        identity.check_permission(route, method)?;
        identity.check(call)?;
        identity.commit_nonce(call.nonce());

        debug!(
            endpoint = %identity.name,
            route,
            method = %method,
            nonce = call.nonce(),
            "Call authorized"
        );
        Ok(())
    }

    pub fn is_authorized(
        &self,
        sender: &Address,
        call: &SignedCall,
        route: &str,
        method: Method,
    ) -> bool {
        match self.authorize(sender, call, route, method) {
            Ok(()) => true,
            Err(e) => {
                debug!(sender = %sender, route, error = %e, "Call rejected");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{generate_signing_key, sign};
    use keygate_core::PermissionSet;
    use std::sync::Arc;

    fn localhost() -> Address {
        Address::parse("127.0.0.1:55000").unwrap()
    }

    fn identity_with(key: &p256::ecdsa::SigningKey, global: PermissionSet) -> Identity {
        let mut identity = Identity::new("test", *key.verifying_key());
        identity.set_global_permission(global);
        identity
    }

    fn signed(key: &p256::ecdsa::SigningKey) -> SignedCall {
        let mut call = SignedCall::new("/");
        sign(&mut call, key).unwrap();
        call
    }

    #[test]
    fn duplicate_registration_is_refused() {
        let registry = TrustRegistry::new();
        let key = generate_signing_key();
        assert!(registry.add_trusted("127.0.0.1", identity_with(&key, PermissionSet::full_access())));
        assert!(!registry.add_trusted("127.0.0.1", identity_with(&key, PermissionSet::no_access())));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("127.0.0.1").unwrap().has_permission("/", Method::Get));
    }

    #[test]
    fn removal_is_idempotent() {
        let registry = TrustRegistry::new();
        let key = generate_signing_key();
        registry.add_trusted("10.0.0.2", identity_with(&key, PermissionSet::full_access()));
        registry.remove_trusted("10.0.0.2");
        registry.remove_trusted("10.0.0.2");
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_sender_is_never_authorized() {
        let registry = TrustRegistry::new();
        let key = generate_signing_key();
        let call = signed(&key);
        assert!(!registry.is_authorized(&localhost(), &call, "/", Method::Get));
        assert!(matches!(
            registry.authorize(&localhost(), &call, "/", Method::Get),
            Err(KeygateError::UnknownSender(_))
        ));
    }

    #[test]
    fn requires_permission_and_signature() {
        let registry = TrustRegistry::new();
        let key = generate_signing_key();
        let stranger = generate_signing_key();
        registry.add_trusted("127.0.0.1", identity_with(&key, PermissionSet::of(&[Method::Get])));

        // valid signature, missing permission
        assert!(!registry.is_authorized(&localhost(), &signed(&key), "/", Method::Post));
        // permission, wrong key
        assert!(!registry.is_authorized(&localhost(), &signed(&stranger), "/", Method::Get));
        // both
        assert!(registry.is_authorized(&localhost(), &signed(&key), "/", Method::Get));
    }

    #[test]
    fn accepted_call_cannot_be_replayed() {
        let registry = TrustRegistry::new();
        let key = generate_signing_key();
        registry.add_trusted("127.0.0.1", identity_with(&key, PermissionSet::full_access()));

        let mut call = signed(&key);
        assert!(registry.is_authorized(&localhost(), &call, "/", Method::Get));
        assert!(matches!(
            registry.authorize(&localhost(), &call, "/", Method::Get),
            Err(KeygateError::Replay { .. })
        ));

        sign(&mut call, &key).unwrap();
        assert!(registry.is_authorized(&localhost(), &call, "/", Method::Get));
    }

    #[test]
    fn failed_authorization_does_not_consume_nonce() {
        let registry = TrustRegistry::new();
        let key = generate_signing_key();
        registry.add_trusted("127.0.0.1", identity_with(&key, PermissionSet::of(&[Method::Get])));

        let call = signed(&key);
        assert!(!registry.is_authorized(&localhost(), &call, "/", Method::Delete));
        assert_eq!(registry.get("127.0.0.1").unwrap().last_nonce(), 0);
        assert!(registry.is_authorized(&localhost(), &call, "/", Method::Get));
    }

    #[test]
    fn update_grants_after_registration() {
        let registry = TrustRegistry::new();
        let key = generate_signing_key();
        registry.add_trusted("127.0.0.1", Identity::new("late", *key.verifying_key()));
        assert!(!registry.is_authorized(&localhost(), &signed(&key), "/", Method::Get));

        assert!(registry.update("127.0.0.1", |identity| {
            identity.add_local_permission("/", PermissionSet::of(&[Method::Get]));
        }));
        assert!(registry.is_authorized(&localhost(), &signed(&key), "/", Method::Get));
        assert!(!registry.update("10.9.9.9", |_| {}));
    }

    #[tokio::test]
    async fn racing_registrations_only_one_wins() {
        let registry = Arc::new(TrustRegistry::new());
        let key = generate_signing_key();
        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = Arc::clone(&registry);
            let identity = Identity::new(format!("racer-{i}"), *key.verifying_key());
            handles.push(tokio::spawn(async move {
                registry.add_trusted("192.168.1.10", identity)
            }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn concurrent_replays_accept_once() {
        let registry = Arc::new(TrustRegistry::new());
        let key = generate_signing_key();
        registry.add_trusted("127.0.0.1", identity_with(&key, PermissionSet::full_access()));
        let call = signed(&key);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let call = call.clone();
            handles.push(tokio::spawn(async move {
                registry.is_authorized(&localhost(), &call, "/", Method::Get)
            }));
        }
        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }
}
