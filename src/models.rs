use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Status enums. Stored as snake_case TEXT; conversion helpers keep the
// database representation and the wire representation identical.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    Unfulfilled,
    Partial,
    Fulfilled,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Unfulfilled => "unfulfilled",
            FulfillmentStatus::Partial => "partial",
            FulfillmentStatus::Fulfilled => "fulfilled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unfulfilled" => Some(FulfillmentStatus::Unfulfilled),
            "partial" => Some(FulfillmentStatus::Partial),
            "fulfilled" => Some(FulfillmentStatus::Fulfilled),
            _ => None,
        }
    }
}

/// Payment status mirrored onto the order document, distinct from the
/// gateway-level `PaymentStatus` on the Payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    Razorpay,
    Payu,
    Cod,
    BankTransfer,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Razorpay => "razorpay",
            PaymentProvider::Payu => "payu",
            PaymentProvider::Cod => "cod",
            PaymentProvider::BankTransfer => "bank_transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "razorpay" => Some(PaymentProvider::Razorpay),
            "payu" => Some(PaymentProvider::Payu),
            "cod" => Some(PaymentProvider::Cod),
            "bank_transfer" => Some(PaymentProvider::BankTransfer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Authorized,
    Captured,
    Failed,
    Refunded,
    PartiallyRefunded,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Captured => "captured",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "authorized" => Some(PaymentStatus::Authorized),
            "captured" => Some(PaymentStatus::Captured),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            "partially_refunded" => Some(PaymentStatus::PartiallyRefunded),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

/// Derive the payment status from accumulated refunds. `refunded` only when
/// the whole captured amount has been returned.
pub fn refund_status(amount: i64, amount_refunded: i64) -> PaymentStatus {
    if amount_refunded >= amount {
        PaymentStatus::Refunded
    } else if amount_refunded > 0 {
        PaymentStatus::PartiallyRefunded
    } else {
        PaymentStatus::Captured
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[default]
    Pending,
    Processing,
    ReadyToShip,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Failed,
    Returned,
    Cancelled,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::Processing => "processing",
            ShipmentStatus::ReadyToShip => "ready_to_ship",
            ShipmentStatus::PickedUp => "picked_up",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::OutForDelivery => "out_for_delivery",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Failed => "failed",
            ShipmentStatus::Returned => "returned",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ShipmentStatus::Pending),
            "processing" => Some(ShipmentStatus::Processing),
            "ready_to_ship" => Some(ShipmentStatus::ReadyToShip),
            "picked_up" => Some(ShipmentStatus::PickedUp),
            "in_transit" => Some(ShipmentStatus::InTransit),
            "out_for_delivery" => Some(ShipmentStatus::OutForDelivery),
            "delivered" => Some(ShipmentStatus::Delivered),
            "failed" => Some(ShipmentStatus::Failed),
            "returned" => Some(ShipmentStatus::Returned),
            "cancelled" => Some(ShipmentStatus::Cancelled),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Embedded order documents (JSONB columns).
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct OrderCustomer {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub accepts_marketing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct Address {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub company: Option<String>,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub zip_code: String,
    pub phone: Option<String>,
}

fn default_country() -> String {
    "India".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub variant_id: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub sku: Option<String>,
    pub quantity: i32,
    /// Unit price snapshot taken at order time.
    pub price: i64,
    pub compare_at_price: Option<i64>,
    pub image: Option<String>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct PaymentDetails {
    pub method: String,
    pub status: OrderPaymentStatus,
    pub transaction_id: Option<String>,
    pub gateway: Option<String>,
    pub amount: i64,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ShippingDetails {
    pub carrier: Option<String>,
    pub awb_number: Option<String>,
    pub tracking_url: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderNote {
    pub id: String,
    pub content: String,
    pub author: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimelineEvent {
    pub id: String,
    pub event: String,
    pub description: String,
    pub user: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TimelineEvent {
    pub fn new(event: &str, description: impl Into<String>, user: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event: event.to_string(),
            description: description.into(),
            user: user.map(str::to_string),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer: OrderCustomer,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub subtotal: i64,
    pub discount: i64,
    pub discount_code: Option<String>,
    pub shipping_cost: i64,
    pub tax: i64,
    pub total_amount: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_details: PaymentDetails,
    pub shipping_details: Option<ShippingDetails>,
    pub fulfillment_status: FulfillmentStatus,
    pub notes: Vec<OrderNote>,
    pub timeline: Vec<TimelineEvent>,
    pub tags: Vec<String>,
    pub assigned_to: Option<String>,
    pub is_archived: bool,
    pub requires_shipping: bool,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Payment record.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatusEntry {
    pub status: PaymentStatus,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

impl PaymentStatusEntry {
    pub fn new(status: PaymentStatus, reason: Option<&str>) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
            reason: reason.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefundEntry {
    pub refund_id: String,
    pub amount: i64,
    pub status: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookEvent {
    pub event_type: String,
    pub event_id: String,
    pub received_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct PaymentMethodInfo {
    pub kind: Option<String>,
    pub card_network: Option<String>,
    pub card_last4: Option<String>,
    pub bank_code: Option<String>,
    pub bank_name: Option<String>,
    pub wallet_name: Option<String>,
    pub upi_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub payment_ref: String,
    pub order_id: Uuid,
    pub provider: PaymentProvider,
    pub amount: i64,
    pub currency: String,
    pub amount_refunded: i64,
    pub provider_payment_id: Option<String>,
    pub provider_order_id: Option<String>,
    pub status: PaymentStatus,
    pub status_history: Vec<PaymentStatusEntry>,
    pub payment_method: Option<PaymentMethodInfo>,
    pub refunds: Vec<RefundEntry>,
    pub webhook_events: Vec<WebhookEvent>,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_name: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Shipment record.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct Package {
    /// Weight in kg, dimensions in cm.
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ShipmentAddress {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default = "default_country")]
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShipmentStatusEntry {
    pub status: ShipmentStatus,
    pub location: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
    pub provider_status: Option<String>,
}

impl ShipmentStatusEntry {
    pub fn new(status: ShipmentStatus) -> Self {
        Self {
            status,
            location: None,
            timestamp: Utc::now(),
            description: None,
            provider_status: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackingEvent {
    pub timestamp: DateTime<Utc>,
    pub location: Option<String>,
    /// Carrier free-text status, kept verbatim.
    pub status: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryAttempt {
    pub attempt_number: i32,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShipmentItem {
    pub product_id: String,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Shipment {
    pub id: Uuid,
    pub shipment_ref: String,
    pub order_id: Uuid,
    pub provider: String,
    pub provider_shipment_id: Option<String>,
    pub provider_order_id: Option<String>,
    pub awb_number: Option<String>,
    pub courier_name: Option<String>,
    pub courier_id: Option<i32>,
    pub package: Package,
    pub pickup_address: ShipmentAddress,
    pub delivery_address: ShipmentAddress,
    pub status: ShipmentStatus,
    pub status_history: Vec<ShipmentStatusEntry>,
    pub tracking_history: Vec<TrackingEvent>,
    pub delivery_attempts: Vec<DeliveryAttempt>,
    pub items: Vec<ShipmentItem>,
    pub shipping_cost: i64,
    pub is_cod: bool,
    pub cod_amount: Option<i64>,
    pub tracking_url: Option<String>,
    pub last_tracked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Catalog.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductVariant {
    pub id: String,
    pub title: String,
    pub sku: Option<String>,
    pub price: i64,
    pub compare_at_price: Option<i64>,
    pub stock: i32,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub url: String,
    pub alt: Option<String>,
}

/// Customer review embedded on the product. Reviews start unapproved and
/// the storefront only renders them once an admin flips `is_approved`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductReview {
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub rating: i32,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_verified_purchase: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub handle: String,
    pub description: Option<String>,
    pub price: i64,
    pub compare_at_price: Option<i64>,
    pub stock: i32,
    pub variants: Vec<ProductVariant>,
    pub images: Vec<ProductImage>,
    pub reviews: Vec<ProductReview>,
    pub tags: Vec<String>,
    pub status: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Store settings (singleton row, store_id = "default").
// ---------------------------------------------------------------------------

pub const STORE_ID: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct RazorpaySettings {
    pub enabled: bool,
    #[serde(default)]
    pub key_id: String,
    #[serde(default)]
    pub key_secret: String,
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default)]
    pub auto_capture: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct PayuSettings {
    pub enabled: bool,
    #[serde(default)]
    pub merchant_key: String,
    #[serde(default)]
    pub merchant_salt: String,
    #[serde(default)]
    pub test_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ShiprocketSettings {
    pub enabled: bool,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub channel_id: Option<i64>,
    pub pickup_location: Option<String>,
    pub default_courier_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CodSettings {
    pub enabled: bool,
    #[serde(default)]
    pub min_amount: i64,
    #[serde(default)]
    pub max_amount: i64,
    #[serde(default)]
    pub extra_charge: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoreDefaults {
    pub payment_method: String,
    pub currency: String,
    pub default_shipping_cost: i64,
    pub free_shipping_threshold: i64,
}

impl Default for StoreDefaults {
    fn default() -> Self {
        Self {
            payment_method: "cod".to_string(),
            currency: "INR".to_string(),
            default_shipping_cost: 0,
            free_shipping_threshold: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct StoreSettings {
    pub razorpay: RazorpaySettings,
    pub payu: PayuSettings,
    pub shiprocket: ShiprocketSettings,
    pub cod: CodSettings,
    pub defaults: StoreDefaults,
    pub pickup_address: ShipmentAddress,
}

/// Keep the last four characters visible, as the admin console shows
/// credentials for recognition only.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let count = secret.chars().count();
    let visible = count.min(4);
    let tail: String = secret.chars().skip(count - visible).collect();
    format!("****{tail}")
}

// ---------------------------------------------------------------------------
// Admin users & audit.
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_status_tracks_accumulated_amount() {
        assert_eq!(refund_status(1000, 0), PaymentStatus::Captured);
        assert_eq!(refund_status(1000, 400), PaymentStatus::PartiallyRefunded);
        assert_eq!(refund_status(1000, 1000), PaymentStatus::Refunded);
    }

    #[test]
    fn status_round_trips_through_text() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(OrderStatus::parse("unknown"), None);
        assert_eq!(
            ShipmentStatus::parse("out_for_delivery"),
            Some(ShipmentStatus::OutForDelivery)
        );
    }

    #[test]
    fn mask_keeps_only_tail() {
        assert_eq!(mask_secret("rzp_live_abcdef"), "****cdef");
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("abc"), "****abc");
        // Multibyte secrets must mask on characters, not bytes.
        assert_eq!(mask_secret("ключ-секрет"), "****крет");
    }
}
