use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::products::{
        BulkProductsRequest, CreateProductRequest, ProductList, UpdateProductRequest,
    },
    error::AppResult,
    middleware::auth::AdminUser,
    models::Product,
    response::ApiResponse,
    routes::params::ProductListQuery,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/bulk", post(bulk_create))
        .route(
            "/{key}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductListQuery),
    responses((status = 200, description = "Active products", body = ApiResponse<ProductList>)),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(
        product_service::list_products(&state, &query, false).await?,
    ))
}

/// Accepts either the product UUID or its URL handle.
#[utoipa::path(get, path = "/api/products/{key}", tag = "Products")]
pub async fn get_product(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(product_service::get_product(&state, &key).await?))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse<Product>),
        (status = 409, description = "Handle already in use"),
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AdminUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(
        product_service::create_product(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/products/{key}",
    request_body = UpdateProductRequest,
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(
        product_service::update_product(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(delete, path = "/api/products/{key}", tag = "Products")]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Value>>> {
    Ok(Json(
        product_service::delete_product(&state, &user, id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/products/bulk",
    request_body = BulkProductsRequest,
    responses(
        (status = 200, description = "All products created", body = ApiResponse<ProductList>),
        (status = 409, description = "Duplicate handle; nothing was created"),
    ),
    tag = "Products"
)]
pub async fn bulk_create(
    State(state): State<AppState>,
    user: AdminUser,
    Json(payload): Json<BulkProductsRequest>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(
        product_service::bulk_create(&state, &user, payload).await?,
    ))
}
