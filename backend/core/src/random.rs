//! Process-scoped random capability used for nonce seeds and node names.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const NAME_LENGTH: usize = 100;

/// Source of first nonces and random names, injected where needed.
pub trait NonceSource: Send + Sync {
    /// A fresh positive nonce for a call that has never been signed.
    fn fresh_nonce(&self) -> i64;

    /// A random lowercase ASCII string of `len` characters.
    fn random_name(&self, len: usize) -> String;
}

/// Wall-clock seconds times a small random multiplier.
///
/// Coarse on purpose: it only has to avoid collisions across restarts,
/// uniqueness comes from the per-call `+1` increments.
pub struct ClockNonceSource {
    rng: Mutex<StdRng>,
}

impl ClockNonceSource {
    pub fn new() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Deterministic source for tests.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    pub fn node_name(&self) -> String {
        self.random_name(NAME_LENGTH)
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }
}

impl Default for ClockNonceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceSource for ClockNonceSource {
    fn fresh_nonce(&self) -> i64 {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        let multiplier = self.with_rng(|rng| rng.gen_range(4..9));
        secs.max(1).saturating_mul(multiplier)
    }

    fn random_name(&self, len: usize) -> String {
        self.with_rng(|rng| {
            (0..len)
                .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
                .collect()
        })
    }
}
