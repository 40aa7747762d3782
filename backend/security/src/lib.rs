//! `keygate-security`: endpoint identities, the trust registry and the signing protocol.

pub mod identity;
pub mod registry;
pub mod signing;

pub use identity::Identity;
pub use registry::TrustRegistry;
pub use signing::{
    generate_signing_key, public_key_der, sign, sign_with, signing_key_from_hex,
    signing_key_to_hex, verify_signature, verifying_key_from_der,
};

pub use p256::ecdsa::{SigningKey, VerifyingKey};
