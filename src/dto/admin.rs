use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{
    Address, CodSettings, Order, OrderStatus, Payment, PayuSettings, RazorpaySettings, Shipment,
    ShipmentAddress, ShiprocketSettings, StoreDefaults,
};

/// Closed command set for admin order mutation. Replaces the original
/// stringly-typed `action` dispatch; unknown actions fail deserialization
/// instead of falling through to a generic field merge.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrderCommand {
    UpdateStatus {
        status: OrderStatus,
        user: Option<String>,
    },
    AddNote {
        content: String,
        author: Option<String>,
        #[serde(default = "default_internal")]
        is_internal: bool,
    },
    AddTag {
        tag: String,
    },
    RemoveTag {
        tag: String,
    },
    Assign {
        assigned_to: String,
        user: Option<String>,
    },
    Cancel {
        reason: Option<String>,
        user: Option<String>,
    },
    UpdateShippingAddress {
        shipping_address: Address,
        user: Option<String>,
    },
}

fn default_internal() -> bool {
    true
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderDetail {
    pub order: Order,
    pub shipment: Option<Shipment>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Default)]
pub struct SettingsPayload {
    pub razorpay: Option<RazorpaySettings>,
    pub payu: Option<PayuSettings>,
    pub shiprocket: Option<ShiprocketSettings>,
    pub cod: Option<CodSettings>,
    pub defaults: Option<StoreDefaults>,
    pub pickup_address: Option<ShipmentAddress>,
}
