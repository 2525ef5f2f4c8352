use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentCustomerInfo {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRazorpayOrderRequest {
    pub order_id: Option<Uuid>,
    /// Paise.
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub customer_info: Option<PaymentCustomerInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RazorpayOrderResponse {
    pub razorpay_order_id: String,
    pub razorpay_key_id: String,
    pub amount: i64,
    pub currency: String,
    pub payment_ref: String,
    pub order_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRazorpayRequest {
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyRazorpayResponse {
    pub order_id: Uuid,
    pub payment_ref: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePayuOrderRequest {
    pub order_id: Option<Uuid>,
    /// Paise.
    pub amount: Option<i64>,
    pub product_info: Option<String>,
    pub customer_info: Option<PaymentCustomerInfo>,
    pub surl: Option<String>,
    pub furl: Option<String>,
}

/// Form fields the storefront posts to the PayU hosted page.
#[derive(Debug, Serialize, ToSchema)]
pub struct PayuFormData {
    pub key: String,
    pub txnid: String,
    pub amount: String,
    pub productinfo: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub surl: String,
    pub furl: String,
    pub hash: String,
    pub payu_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayuOrderResponse {
    pub payu_data: PayuFormData,
    pub payment_ref: String,
    pub order_id: Uuid,
}

/// Form-encoded parameters PayU posts back to the callback endpoint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PayuCallback {
    pub status: Option<String>,
    pub txnid: Option<String>,
    pub amount: Option<String>,
    pub productinfo: Option<String>,
    pub firstname: Option<String>,
    pub email: Option<String>,
    pub mihpayid: Option<String>,
    pub hash: Option<String>,
    pub mode: Option<String>,
    pub bankcode: Option<String>,
    #[serde(rename = "error_Message")]
    pub error_message: Option<String>,
}
