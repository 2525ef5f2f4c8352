use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{AdminOrderDetail, OrderCommand, SettingsPayload},
        auth::{LoginRequest, LoginResponse},
        orders::{CreateOrderRequest, OrderList, OrderSummary},
        payments::{
            CreatePayuOrderRequest, CreateRazorpayOrderRequest, PayuFormData, PayuOrderResponse,
            RazorpayOrderResponse, VerifyRazorpayRequest, VerifyRazorpayResponse,
        },
        products::{BulkProductsRequest, CreateProductRequest, ProductList, UpdateProductRequest},
        shipments::{AwbResponse, CreateShipmentRequest, GenerateAwbRequest},
    },
    models::{AdminUser, Order, Payment, Product, Shipment, StoreSettings},
    response::{ApiResponse, Meta},
    routes::{admin, auth, health, health::HealthData, orders, payments, products, shipping},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::logout,
        auth::me,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        payments::create_razorpay_order,
        payments::verify_razorpay,
        payments::create_payu_order,
        shipping::create_shipment,
        shipping::generate_awb,
        shipping::track,
        shipping::serviceability,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::bulk_create,
        admin::list_orders,
        admin::get_order,
        admin::update_order,
        admin::list_products,
        admin::get_settings,
        admin::update_settings
    ),
    components(
        schemas(
            AdminUser,
            Order,
            Payment,
            Product,
            Shipment,
            StoreSettings,
            OrderCommand,
            AdminOrderDetail,
            SettingsPayload,
            LoginRequest,
            LoginResponse,
            CreateOrderRequest,
            OrderSummary,
            OrderList,
            CreateRazorpayOrderRequest,
            RazorpayOrderResponse,
            VerifyRazorpayRequest,
            VerifyRazorpayResponse,
            CreatePayuOrderRequest,
            PayuFormData,
            PayuOrderResponse,
            CreateShipmentRequest,
            GenerateAwbRequest,
            AwbResponse,
            CreateProductRequest,
            UpdateProductRequest,
            BulkProductsRequest,
            ProductList,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderSummary>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Shipment>,
            ApiResponse<AdminOrderDetail>,
            ApiResponse<StoreSettings>,
            ApiResponse<LoginResponse>,
            ApiResponse<RazorpayOrderResponse>,
            ApiResponse<VerifyRazorpayResponse>,
            ApiResponse<PayuOrderResponse>,
            ApiResponse<AwbResponse>,
            ApiResponse<HealthData>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Admin session endpoints"),
        (name = "Orders", description = "Storefront order endpoints"),
        (name = "Payments", description = "Payment gateway sessions and verification"),
        (name = "Shipping", description = "Shiprocket fulfillment endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Admin", description = "Admin console endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Every ApiResponse<T> referenced from a path annotation must also be
    // a registered component, otherwise the document carries dangling refs.
    #[test]
    fn response_envelopes_are_registered_components() {
        let doc = ApiDoc::openapi().to_json().unwrap();
        for schema in [
            "ApiResponse_VerifyRazorpayResponse",
            "ApiResponse_RazorpayOrderResponse",
            "ApiResponse_PayuOrderResponse",
            "ApiResponse_AwbResponse",
            "ApiResponse_HealthData",
        ] {
            assert!(doc.contains(schema), "missing schema {schema}");
        }
    }
}
