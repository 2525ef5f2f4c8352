use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Address, Order, OrderStatus};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub variant_id: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub sku: Option<String>,
    pub quantity: i32,
    /// Client-supplied unit price snapshot (trusted as-is; see DESIGN.md).
    pub price: i64,
    pub compare_at_price: Option<i64>,
    pub image: Option<String>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CustomerInfoInput {
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

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemInput>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub customer_info: Option<CustomerInfoInput>,
    pub payment_method: Option<String>,
    pub subtotal: Option<i64>,
    pub discount: Option<i64>,
    pub discount_code: Option<String>,
    pub shipping_cost: Option<i64>,
    pub tax: Option<i64>,
    pub total_amount: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub payment_method: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
