use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::products::{BulkProductsRequest, CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{self, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AdminUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::ProductListQuery,
    services::order_service::to_json,
    state::AppState,
};

fn product_from_entity(m: products::Model) -> Product {
    Product {
        id: m.id,
        title: m.title,
        handle: m.handle,
        description: m.description,
        price: m.price,
        compare_at_price: m.compare_at_price,
        stock: m.stock,
        variants: serde_json::from_value(m.variants).unwrap_or_default(),
        images: serde_json::from_value(m.images).unwrap_or_default(),
        reviews: serde_json::from_value(m.reviews).unwrap_or_default(),
        tags: serde_json::from_value(m.tags).unwrap_or_default(),
        status: m.status,
        is_deleted: m.is_deleted,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

/// URL handle from a title: lowercase alphanumeric runs joined by hyphens.
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut last_hyphen = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

async fn handle_taken(
    state: &AppState,
    handle: &str,
    exclude: Option<Uuid>,
) -> AppResult<bool> {
    let mut select = Products::find()
        .filter(products::Column::Handle.eq(handle))
        .filter(products::Column::IsDeleted.eq(false));
    if let Some(id) = exclude {
        select = select.filter(products::Column::Id.ne(id));
    }
    Ok(select.one(&state.orm).await?.is_some())
}

/// Storefront listing: active, non-deleted products only. The admin console
/// passes `include_hidden` to see drafts too.
pub async fn list_products(
    state: &AppState,
    query: &ProductListQuery,
    include_hidden: bool,
) -> AppResult<ApiResponse<ProductList>> {
    let mut select = Products::find()
        .filter(products::Column::IsDeleted.eq(false))
        .order_by_desc(products::Column::CreatedAt);
    if !include_hidden {
        select = select.filter(products::Column::Status.eq("active"));
    }
    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        select = select.filter(products::Column::Title.contains(q.trim()));
    }

    let pagination = query.pagination();
    let total = select.clone().count(&state.orm).await? as i64;
    let models = select
        .paginate(&state.orm, pagination.limit())
        .fetch_page(pagination.zero_based_page())
        .await?;

    Ok(ApiResponse::success(
        "Products",
        ProductList {
            items: models.into_iter().map(product_from_entity).collect(),
        },
        Some(Meta::new(pagination.page, pagination.per_page, total)),
    ))
}

/// Lookup by UUID or by URL handle.
pub async fn get_product(state: &AppState, key: &str) -> AppResult<ApiResponse<Product>> {
    let found = match Uuid::parse_str(key) {
        Ok(id) => Products::find_by_id(id).one(&state.orm).await?,
        Err(_) => {
            Products::find()
                .filter(products::Column::Handle.eq(key))
                .one(&state.orm)
                .await?
        }
    };
    let model = found.filter(|m| !m.is_deleted).ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Product",
        product_from_entity(model),
        Some(Meta::empty()),
    ))
}

fn active_from_request(payload: &CreateProductRequest, handle: String) -> AppResult<products::ActiveModel> {
    Ok(products::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title.clone()),
        handle: Set(handle),
        description: Set(payload.description.clone()),
        price: Set(payload.price),
        compare_at_price: Set(payload.compare_at_price),
        stock: Set(payload.stock),
        variants: Set(to_json(&payload.variants)?),
        images: Set(to_json(&payload.images)?),
        // Reviews accrue after launch; imports never carry them.
        reviews: Set(json!([])),
        tags: Set(to_json(&payload.tags)?),
        status: Set(payload
            .status
            .clone()
            .unwrap_or_else(|| "active".to_string())),
        is_deleted: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    })
}

pub async fn create_product(
    state: &AppState,
    user: &AdminUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }
    let handle = payload
        .handle
        .clone()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| slugify(&payload.title));
    if handle_taken(state, &handle, None).await? {
        return Err(AppError::Conflict(format!(
            "Product handle '{handle}' already exists"
        )));
    }

    let saved = active_from_request(&payload, handle)?.insert(&state.orm).await?;

    if let Err(err) = crate::audit::log_audit(
        &state.pool,
        Some(user.admin_id),
        "product_create",
        Some("products"),
        Some(json!({ "product_id": saved.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(saved),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let model = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|m| !m.is_deleted)
        .ok_or(AppError::NotFound)?;

    if let Some(handle) = payload.handle.as_deref() {
        if handle != model.handle && handle_taken(state, handle, Some(id)).await? {
            return Err(AppError::Conflict(format!(
                "Product handle '{handle}' already exists"
            )));
        }
    }

    let mut active: products::ActiveModel = model.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(handle) = payload.handle {
        active.handle = Set(handle);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(compare_at_price) = payload.compare_at_price {
        active.compare_at_price = Set(Some(compare_at_price));
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(variants) = payload.variants {
        active.variants = Set(to_json(&variants)?);
    }
    if let Some(images) = payload.images {
        active.images = Set(to_json(&images)?);
    }
    if let Some(reviews) = payload.reviews {
        active.reviews = Set(to_json(&reviews)?);
    }
    if let Some(tags) = payload.tags {
        active.tags = Set(to_json(&tags)?);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    active.updated_at = Set(Utc::now().into());
    let saved = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Product updated",
        product_from_entity(saved),
        Some(Meta::empty()),
    ))
}

/// Soft delete; the row stays for order-item references.
pub async fn delete_product(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let model = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|m| !m.is_deleted)
        .ok_or(AppError::NotFound)?;

    let mut active: products::ActiveModel = model.into();
    active.is_deleted = Set(true);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    if let Err(err) = crate::audit::log_audit(
        &state.pool,
        Some(user.admin_id),
        "product_delete",
        Some("products"),
        Some(json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product deleted",
        json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

/// Import a batch atomically; one bad handle rolls the whole batch back.
pub async fn bulk_create(
    state: &AppState,
    user: &AdminUser,
    payload: BulkProductsRequest,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;

    if payload.products.is_empty() {
        return Err(AppError::BadRequest("products must not be empty".to_string()));
    }

    let txn = state.orm.begin().await?;
    let mut created = Vec::with_capacity(payload.products.len());
    for item in &payload.products {
        let handle = item
            .handle
            .clone()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| slugify(&item.title));
        let existing = Products::find()
            .filter(products::Column::Handle.eq(handle.clone()))
            .filter(products::Column::IsDeleted.eq(false))
            .one(&txn)
            .await?;
        if existing.is_some() || created.iter().any(|p: &products::Model| p.handle == handle) {
            return Err(AppError::Conflict(format!(
                "Product handle '{handle}' already exists"
            )));
        }
        let saved = active_from_request(item, handle)?.insert(&txn).await?;
        created.push(saved);
    }
    txn.commit().await?;

    tracing::info!(count = created.len(), "bulk product import committed");

    Ok(ApiResponse::success(
        "Products created",
        ProductList {
            items: created.into_iter().map(product_from_entity).collect(),
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Whey Protein 1kg"), "whey-protein-1kg");
        assert_eq!(slugify("  Omega-3 (Fish Oil)! "), "omega-3-fish-oil");
        assert_eq!(slugify("ALL CAPS"), "all-caps");
    }

    #[test]
    fn slugify_handles_empty_input() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn embedded_reviews_surface_on_the_product() {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        let model = products::Model {
            id: Uuid::new_v4(),
            title: "Whey Protein".to_string(),
            handle: "whey-protein".to_string(),
            description: None,
            price: 100_000,
            compare_at_price: None,
            stock: 10,
            variants: json!([]),
            images: json!([]),
            reviews: json!([{
                "id": "rev_1",
                "customer_name": "Asha Rao",
                "customer_email": "asha@example.com",
                "rating": 5,
                "title": "Mixes well",
                "content": "No clumps even in cold water.",
                "is_approved": true,
                "created_at": "2026-08-01T00:00:00Z"
            }]),
            tags: json!([]),
            status: "active".to_string(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        let product = product_from_entity(model);
        assert_eq!(product.reviews.len(), 1);
        assert_eq!(product.reviews[0].customer_name, "Asha Rao");
        assert_eq!(product.reviews[0].rating, 5);
        assert!(product.reviews[0].is_approved);
        assert!(!product.reviews[0].is_verified_purchase);
    }
}
