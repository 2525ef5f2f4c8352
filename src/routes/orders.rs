use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, OrderSummary},
    error::AppResult,
    models::Order,
    response::ApiResponse,
    routes::params::OrderHistoryQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/{key}", get(get_order))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = ApiResponse<OrderSummary>),
        (status = 400, description = "Missing items, address or customer info"),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderSummary>>> {
    Ok(Json(order_service::create_order(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderHistoryQuery),
    responses((status = 200, description = "Order history", body = ApiResponse<OrderList>)),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderHistoryQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let email = query.email.clone().unwrap_or_default();
    Ok(Json(
        order_service::list_orders(&state, &email, &query.pagination()).await?,
    ))
}

/// Accepts either the order UUID or the public order number.
#[utoipa::path(get, path = "/api/orders/{key}", tag = "Orders")]
pub async fn get_order(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(Json(order_service::get_order(&state, &key).await?))
}
