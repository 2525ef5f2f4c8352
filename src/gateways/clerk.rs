//! Identity-provider webhook verification (Svix scheme).
//!
//! The signed content is `"{msg_id}.{timestamp}.{body}"`, keyed with the
//! base64 portion of the `whsec_` secret; the `svix-signature` header holds
//! space-separated `v1,<base64 mac>` entries.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn verify_signature(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    body: &[u8],
    signature_header: &str,
) -> bool {
    let key = match BASE64.decode(secret.trim_start_matches("whsec_")) {
        Ok(key) => key,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(&key) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    let expected = BASE64.encode(mac.finalize().into_bytes());

    signature_header
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .any(|sig| sig == expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, msg_id: &str, timestamp: &str, body: &[u8]) -> String {
        let key = BASE64.decode(secret.trim_start_matches("whsec_")).unwrap();
        let mut mac = HmacSha256::new_from_slice(&key).unwrap();
        mac.update(format!("{msg_id}.{timestamp}.").as_bytes());
        mac.update(body);
        format!("v1,{}", BASE64.encode(mac.finalize().into_bytes()))
    }

    const SECRET: &str = "whsec_dGVzdC1zZWNyZXQta2V5"; // "test-secret-key"

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"type":"user.created"}"#;
        let header = sign(SECRET, "msg_1", "1700000000", body);
        assert!(verify_signature(SECRET, "msg_1", "1700000000", body, &header));
    }

    #[test]
    fn rejects_wrong_message_id() {
        let body = br#"{"type":"user.created"}"#;
        let header = sign(SECRET, "msg_1", "1700000000", body);
        assert!(!verify_signature(SECRET, "msg_2", "1700000000", body, &header));
    }
}
