//! PayU hosted-checkout hashing.
//!
//! PayU authenticates both directions with SHA-512 over pipe-joined fields:
//! the forward hash is sent with the checkout form, the reverse hash is
//! recomputed from the callback parameters and compared against the `hash`
//! field the gateway posts back.

use sha2::{Digest, Sha512};

pub const PAYU_URL_LIVE: &str = "https://secure.payu.in/_payment";
pub const PAYU_URL_TEST: &str = "https://test.payu.in/_payment";

fn sha512_hex(input: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// `sha512(key|txnid|amount|productinfo|firstname|email|udf1..udf5||||||salt)`
/// with all udf fields empty.
pub fn forward_hash(
    key: &str,
    txnid: &str,
    amount: &str,
    productinfo: &str,
    firstname: &str,
    email: &str,
    salt: &str,
) -> String {
    sha512_hex(&format!(
        "{key}|{txnid}|{amount}|{productinfo}|{firstname}|{email}|||||||||||{salt}"
    ))
}

/// `sha512(salt|status|udf5..udf1|email|firstname|productinfo|amount|txnid|key)`
/// with all udf fields empty.
pub fn reverse_hash(
    salt: &str,
    status: &str,
    email: &str,
    firstname: &str,
    productinfo: &str,
    amount: &str,
    txnid: &str,
    key: &str,
) -> String {
    sha512_hex(&format!(
        "{salt}|{status}|||||||||||{email}|{firstname}|{productinfo}|{amount}|{txnid}|{key}"
    ))
}

/// Format paise as the rupee string PayU expects ("950.00").
pub fn format_amount(paise: i64) -> String {
    format!("{}.{:02}", paise / 100, (paise % 100).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_hash_matches_forward_parameters() {
        let computed = reverse_hash(
            "salt", "success", "a@b.c", "Asha", "Order Payment", "950.00", "TXN_1", "key",
        );
        let again = reverse_hash(
            "salt", "success", "a@b.c", "Asha", "Order Payment", "950.00", "TXN_1", "key",
        );
        assert_eq!(computed, again);
        assert_eq!(computed.len(), 128);
    }

    #[test]
    fn reverse_hash_detects_tampered_amount() {
        let original = reverse_hash(
            "salt", "success", "a@b.c", "Asha", "Order Payment", "950.00", "TXN_1", "key",
        );
        let tampered = reverse_hash(
            "salt", "success", "a@b.c", "Asha", "Order Payment", "1.00", "TXN_1", "key",
        );
        assert_ne!(original, tampered);
    }

    #[test]
    fn amount_formats_as_rupees() {
        assert_eq!(format_amount(95000), "950.00");
        assert_eq!(format_amount(105), "1.05");
        assert_eq!(format_amount(0), "0.00");
    }
}
