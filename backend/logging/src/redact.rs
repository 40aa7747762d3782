//! Log Redaction Layer
//!
//! Scrubs signatures, encoded public keys and bearer tokens from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static SIGNATURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""signature"\s*:\s*"[A-Za-z0-9+/=]*""#).unwrap());
// 16 or more space-separated byte values: the decimal text form of a key
static KEY_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,3}(?: \d{1,3}){15,}\b").unwrap());
static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = SIGNATURE_RE
        .replace_all(input, r#""signature":"[REDACTED_SIGNATURE]""#)
        .to_string();

    redacted = KEY_TEXT_RE.replace_all(&redacted, "[REDACTED_KEY]").to_string();

    redacted = BEARER_RE.replace_all(&redacted, "[REDACTED_TOKEN]").to_string();

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let raw = r#"{"function":"/","auth":{"signature":"MEUCIQDx+/abc==","nonce":17}}"#;
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("MEUCIQDx"));
        assert!(clean.contains(r#""nonce":17"#));
    }

    #[test]
    fn redacts_key_text() {
        let key: Vec<String> = (0..91).map(|i| (i * 7 % 256).to_string()).collect();
        let raw = format!("endpoint key {} registered", key.join(" "));
        let clean = redact_sensitive_data(&raw);
        assert_eq!(clean, "endpoint key [REDACTED_KEY] registered");
    }

    #[test]
    fn leaves_short_numbers_alone() {
        let raw = "status 401 after 3 attempts";
        assert_eq!(redact_sensitive_data(raw), raw);
    }

    #[test]
    fn redacts_bearer_tokens() {
        let clean = redact_sensitive_data("Authorization: Bearer abc.def-ghi");
        assert!(!clean.contains("abc.def-ghi"));
    }
}
