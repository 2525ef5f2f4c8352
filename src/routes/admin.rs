use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::admin::{AdminOrderDetail, OrderCommand, SettingsPayload},
    dto::orders::OrderList,
    dto::products::ProductList,
    error::AppResult,
    middleware::auth::AdminUser,
    models::{Order, StoreSettings},
    response::ApiResponse,
    routes::params::{AdminOrderListQuery, ProductListQuery},
    services::{admin_service, product_service, settings_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order).patch(update_order))
        .route("/products", get(list_products))
        .route("/settings", get(get_settings).put(update_settings))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(AdminOrderListQuery),
    responses(
        (status = 200, description = "Orders", body = ApiResponse<OrderList>),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Not an admin"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AdminUser,
    Query(query): Query<AdminOrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    Ok(Json(admin_service::list_orders(&state, &user, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    responses((status = 200, description = "Order with shipment and payments", body = ApiResponse<AdminOrderDetail>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AdminOrderDetail>>> {
    Ok(Json(admin_service::get_order(&state, &user, id).await?))
}

/// Applies one command from the closed command set; see [`OrderCommand`].
#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}",
    request_body = OrderCommand,
    responses(
        (status = 200, description = "Updated order", body = ApiResponse<Order>),
        (status = 400, description = "Command not valid for the order state"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
    Json(command): Json<OrderCommand>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(Json(
        admin_service::update_order(&state, &user, id, command).await?,
    ))
}

/// Catalog view that includes drafts and hidden products.
#[utoipa::path(
    get,
    path = "/api/admin/products",
    params(ProductListQuery),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AdminUser,
    Query(query): Query<ProductListQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    crate::middleware::auth::ensure_admin(&user)?;
    Ok(Json(
        product_service::list_products(&state, &query, true).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses((status = 200, description = "Settings with masked secrets", body = ApiResponse<StoreSettings>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_settings(
    State(state): State<AppState>,
    user: AdminUser,
) -> AppResult<Json<ApiResponse<StoreSettings>>> {
    Ok(Json(settings_service::get_settings(&state, &user).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = SettingsPayload,
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    user: AdminUser,
    Json(payload): Json<SettingsPayload>,
) -> AppResult<Json<ApiResponse<StoreSettings>>> {
    Ok(Json(
        settings_service::update_settings(&state, &user, payload).await?,
    ))
}
