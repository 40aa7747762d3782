//! Client-side signing and server-side signature checks for `SignedCall`.
//!
//! Signatures are P-256 ECDSA in ASN.1 DER form, computed over the raw 32-byte
//! canonical hash (the hash is signed as a prehash, not hashed again).

use anyhow::anyhow;
use keygate_core::{ClockNonceSource, KeygateError, MISSING_NONCE, NonceSource, SignedCall};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePublicKey, EncodePublicKey};
use rand::rngs::OsRng;
use std::sync::OnceLock;
use tracing::debug;

fn process_nonce_source() -> &'static ClockNonceSource {
    static SOURCE: OnceLock<ClockNonceSource> = OnceLock::new();
    SOURCE.get_or_init(ClockNonceSource::new)
}

/// Sign `call` with the process-wide nonce source.
pub fn sign(call: &mut SignedCall, key: &SigningKey) -> Result<(), KeygateError> {
    sign_with(call, key, process_nonce_source())
}

/// Bind a nonce and signature to `call`.
///
/// A never-signed call gets a fresh nonce from `nonces`; a signed one gets
/// `nonce + 1`. The caller must own `call` exclusively while signing.
/// On failure the call is left unchanged.
pub fn sign_with(
    call: &mut SignedCall,
    key: &SigningKey,
    nonces: &dyn NonceSource,
) -> Result<(), KeygateError> {
    let previous = call.auth.nonce;
    let next = if previous == MISSING_NONCE {
        nonces.fresh_nonce()
    } else {
        previous
            .checked_add(1)
            .ok_or_else(|| KeygateError::Other(anyhow!("nonce space exhausted")))?
    };

    call.auth.nonce = next;
    let hash = call.canonical_hash();
    let signature: Signature = match key.sign_prehash(&hash) {
        Ok(sig) => sig,
        Err(e) => {
            call.auth.nonce = previous;
            return Err(KeygateError::Other(anyhow!("signing failed: {e}")));
        }
    };
    call.auth.signature = signature.to_der().as_bytes().to_vec();

    debug!(function = %call.function, nonce = next, "Signed call");
    Ok(())
}

/// Check the call's DER signature against its canonical hash.
pub fn verify_signature(key: &VerifyingKey, call: &SignedCall) -> Result<(), KeygateError> {
    let signature = Signature::from_der(call.signature()).map_err(|_| KeygateError::Signature)?;
    key.verify_prehash(&call.canonical_hash(), &signature)
        .map_err(|_| KeygateError::Signature)
}

pub fn generate_signing_key() -> SigningKey {
    SigningKey::random(&mut OsRng)
}

/// X.509 SubjectPublicKeyInfo DER bytes of a public key.
pub fn public_key_der(key: &VerifyingKey) -> Result<Vec<u8>, KeygateError> {
    key.to_public_key_der()
        .map(|doc| doc.as_bytes().to_vec())
        .map_err(|e| KeygateError::KeyDecode(e.to_string()))
}

pub fn verifying_key_from_der(der: &[u8]) -> Result<VerifyingKey, KeygateError> {
    VerifyingKey::from_public_key_der(der).map_err(|e| KeygateError::KeyDecode(e.to_string()))
}

pub fn signing_key_to_hex(key: &SigningKey) -> String {
    hex::encode(key.to_bytes())
}

pub fn signing_key_from_hex(text: &str) -> Result<SigningKey, KeygateError> {
    let bytes = hex::decode(text.trim()).map_err(|e| KeygateError::KeyDecode(e.to_string()))?;
    SigningKey::from_slice(&bytes).map_err(|e| KeygateError::KeyDecode(e.to_string()))
}
