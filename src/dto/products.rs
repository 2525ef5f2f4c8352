use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Product, ProductImage, ProductReview, ProductVariant};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub title: String,
    pub handle: Option<String>,
    pub description: Option<String>,
    pub price: i64,
    pub compare_at_price: Option<i64>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub handle: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub compare_at_price: Option<i64>,
    pub stock: Option<i32>,
    pub variants: Option<Vec<ProductVariant>>,
    pub images: Option<Vec<ProductImage>>,
    /// Full replacement list; the admin console sends it back when
    /// approving or removing a review.
    pub reviews: Option<Vec<ProductReview>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkProductsRequest {
    pub products: Vec<CreateProductRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}
