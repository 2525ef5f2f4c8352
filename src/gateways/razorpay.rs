//! Razorpay REST + signature verification.
//!
//! Amounts are paise end to end; Razorpay's wire format already uses minor
//! units so no conversion happens at this boundary.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

const ORDERS_URL: &str = "https://api.razorpay.com/v1/orders";

fn hmac_hex(secret: &str, message: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Checkout verification: HMAC-SHA256 over `"{order_id}|{payment_id}"` with
/// the key secret, compared against the signature the checkout form posts.
pub fn verify_checkout_signature(
    key_secret: &str,
    provider_order_id: &str,
    provider_payment_id: &str,
    signature: &str,
) -> bool {
    let expected = hmac_hex(
        key_secret,
        format!("{provider_order_id}|{provider_payment_id}").as_bytes(),
    );
    expected == signature
}

/// Webhook verification: HMAC-SHA256 over the raw request body with the
/// webhook secret, compared against `x-razorpay-signature`.
pub fn verify_webhook_signature(webhook_secret: &str, body: &[u8], signature: &str) -> bool {
    hmac_hex(webhook_secret, body) == signature
}

#[derive(Debug, Deserialize)]
pub struct ProviderOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    description: Option<String>,
}

/// Create a provider-side order for the hosted checkout.
pub async fn create_provider_order(
    http: &reqwest::Client,
    key_id: &str,
    key_secret: &str,
    amount: i64,
    currency: &str,
    receipt: &str,
    auto_capture: bool,
) -> AppResult<ProviderOrder> {
    let response = http
        .post(ORDERS_URL)
        .basic_auth(key_id, Some(key_secret))
        .json(&json!({
            "amount": amount,
            "currency": currency,
            "receipt": receipt,
            "payment_capture": if auto_capture { 1 } else { 0 },
            "notes": { "orderId": receipt },
        }))
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("razorpay order create failed: {e}")))?;

    if !response.status().is_success() {
        let detail = response
            .json::<ProviderErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error)
            .and_then(|e| e.description)
            .unwrap_or_else(|| "failed to create Razorpay order".to_string());
        return Err(AppError::Upstream(detail));
    }

    let order = response
        .json::<ProviderOrder>()
        .await
        .map_err(|e| AppError::Upstream(format!("razorpay order decode failed: {e}")))?;
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    #[test]
    fn checkout_signature_accepts_expected_hmac() {
        let sig = hmac_hex(SECRET, b"order_abc|pay_xyz");
        assert!(verify_checkout_signature(SECRET, "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn checkout_signature_rejects_wrong_secret() {
        let sig = hmac_hex("wrong_secret", b"order_abc|pay_xyz");
        assert!(!verify_checkout_signature(SECRET, "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn webhook_signature_rejects_modified_payload() {
        let body = br#"{"event":"payment.captured"}"#;
        let sig = hmac_hex(SECRET, body);
        assert!(verify_webhook_signature(SECRET, body, &sig));
        assert!(!verify_webhook_signature(
            SECRET,
            br#"{"event":"payment.captured","hacked":true}"#,
            &sig
        ));
    }
}
