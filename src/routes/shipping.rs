use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde_json::Value;

use crate::{
    dto::shipments::{
        AwbResponse, CreateShipmentRequest, GenerateAwbRequest, ServiceabilityQuery, TrackQuery,
    },
    error::AppResult,
    middleware::auth::AdminUser,
    models::Shipment,
    response::ApiResponse,
    services::shipment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shiprocket/create-order", post(create_shipment))
        .route("/shiprocket/generate-awb", post(generate_awb))
        .route("/shiprocket/track", get(track))
        .route("/shiprocket/serviceability", get(serviceability))
}

#[utoipa::path(
    post,
    path = "/api/shipping/shiprocket/create-order",
    request_body = CreateShipmentRequest,
    responses(
        (status = 200, description = "Shipment created", body = ApiResponse<Shipment>),
        (status = 409, description = "Shipment already exists for the order"),
        (status = 502, description = "Shiprocket rejected the order"),
    ),
    tag = "Shipping"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    user: AdminUser,
    Json(payload): Json<CreateShipmentRequest>,
) -> AppResult<Json<ApiResponse<Shipment>>> {
    Ok(Json(
        shipment_service::create_shipment(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/shipping/shiprocket/generate-awb",
    request_body = GenerateAwbRequest,
    responses(
        (status = 200, description = "AWB assigned", body = ApiResponse<AwbResponse>),
        (status = 400, description = "Shipment has no carrier shipment id"),
    ),
    tag = "Shipping"
)]
pub async fn generate_awb(
    State(state): State<AppState>,
    user: AdminUser,
    Json(payload): Json<GenerateAwbRequest>,
) -> AppResult<Json<ApiResponse<AwbResponse>>> {
    Ok(Json(
        shipment_service::generate_awb(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/shipping/shiprocket/track",
    params(TrackQuery),
    tag = "Shipping"
)]
pub async fn track(
    State(state): State<AppState>,
    Query(query): Query<TrackQuery>,
) -> AppResult<Json<ApiResponse<Value>>> {
    Ok(Json(shipment_service::track(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/shipping/shiprocket/serviceability",
    params(ServiceabilityQuery),
    tag = "Shipping"
)]
pub async fn serviceability(
    State(state): State<AppState>,
    Query(query): Query<ServiceabilityQuery>,
) -> AppResult<Json<ApiResponse<Value>>> {
    Ok(Json(shipment_service::serviceability(&state, query).await?))
}
