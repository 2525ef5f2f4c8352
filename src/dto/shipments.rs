use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::Package;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateShipmentRequest {
    pub order_id: Uuid,
    pub package: Option<Package>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateAwbRequest {
    pub shipment_ref: Option<String>,
    pub courier_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AwbResponse {
    pub awb_number: String,
    pub courier_name: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TrackQuery {
    pub awb: Option<String>,
    pub shipment_ref: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ServiceabilityQuery {
    pub pickup_postcode: String,
    pub delivery_postcode: String,
    pub weight: f64,
    #[serde(default)]
    pub cod: bool,
}
