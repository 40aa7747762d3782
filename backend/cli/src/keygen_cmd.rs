//! `keygate keygen`: mint a P-256 key pair.

use anyhow::Result;
use keygate_core::encode_key_bytes;
use keygate_security::{generate_signing_key, public_key_der, signing_key_to_hex};

pub struct KeyPair {
    /// Hex private scalar, for `KEYGATE_SIGNING_KEY`
    pub private_hex: String,
    /// Decimal DER text, for a `trusted[].public_key` entry
    pub public_text: String,
}

pub fn generate() -> Result<KeyPair> {
    let key = generate_signing_key();
    let der = public_key_der(key.verifying_key())?;
    Ok(KeyPair {
        private_hex: signing_key_to_hex(&key),
        public_text: encode_key_bytes(&der),
    })
}

pub fn run() -> Result<()> {
    let pair = generate()?;
    println!("private_key: {}", pair.private_hex);
    println!("public_key: \"{}\"", pair.public_text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keygate_core::decode_key_bytes;
    use keygate_security::{signing_key_from_hex, verifying_key_from_der};

    #[test]
    fn halves_belong_together() {
        let pair = generate().unwrap();
        let private = signing_key_from_hex(&pair.private_hex).unwrap();
        let public = verifying_key_from_der(&decode_key_bytes(&pair.public_text).unwrap()).unwrap();
        assert_eq!(private.verifying_key(), &public);
    }
}
