//! Public-key text form: DER bytes as ASCII decimal values separated by single spaces.
//!
//! `[48, 89, 19]` ⇄ `"48 89 19"`. The decoded buffer is sized from the text.

use crate::error::KeygateError;

pub fn encode_key_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn decode_key_bytes(text: &str) -> Result<Vec<u8>, KeygateError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(KeygateError::KeyDecode("empty key string".into()));
    }
    text.split(' ')
        .enumerate()
        .map(|(i, token)| {
            token.parse::<u8>().map_err(|_| {
                KeygateError::KeyDecode(format!("token {i} ({token:?}) is not a byte value"))
            })
        })
        .collect()
}
