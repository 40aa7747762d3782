//! `keygate-core`: shared types for signed RPC calls.
//!
//! Provides:
//! - `Method` and the four-slot `PermissionSet` bitmap
//! - `Address` parsing for peer and forwarded-for addresses
//! - `SignedCall` request envelope and its canonical hash
//! - Decimal-byte text codec for public keys
//! - `NonceSource`, the injected random capability
//! - `KeygateError`, the error kinds shared by every crate

pub mod address;
pub mod call;
pub mod error;
pub mod keycodec;
pub mod permission;
pub mod random;

pub use address::Address;
pub use call::{CallAuth, SignedCall, MISSING_NONCE};
pub use error::KeygateError;
pub use keycodec::{decode_key_bytes, encode_key_bytes};
pub use permission::{Method, PermissionSet};
pub use random::{ClockNonceSource, NonceSource};
