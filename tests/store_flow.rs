use nutristore_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::admin::{OrderCommand, SettingsPayload},
    dto::orders::{CreateOrderRequest, CustomerInfoInput, OrderItemInput},
    dto::payments::VerifyRazorpayRequest,
    dto::products::{BulkProductsRequest, CreateProductRequest},
    entity::payments,
    middleware::auth::AdminUser,
    models::{Address, OrderPaymentStatus, OrderStatus, RazorpaySettings},
    routes::params::{AdminOrderListQuery, Pagination, ProductListQuery},
    services::{admin_service, order_service, payment_service, product_service, settings_service},
    state::AppState,
};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Statement,
};
use serde_json::json;
use uuid::Uuid;

// Allow skipping when no DB is configured in the environment.
fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .or_else(|| {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests."
            );
            None
        })
}

async fn setup_state(database_url: &str, tables: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        format!("TRUNCATE TABLE {tables} RESTART IDENTITY CASCADE"),
    ))
    .await?;

    let pool = create_pool(database_url).await?;
    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        app_url: "http://localhost:3000".to_string(),
        jwt_secret: "test-secret".to_string(),
    };
    Ok(AppState::new(pool, orm, config))
}

fn admin() -> AdminUser {
    AdminUser {
        admin_id: Uuid::new_v4(),
        role: "admin".to_string(),
    }
}

fn order_request() -> CreateOrderRequest {
    CreateOrderRequest {
        items: vec![OrderItemInput {
            product_id: Uuid::new_v4(),
            variant_id: None,
            title: "Whey Protein Isolate 1kg".to_string(),
            variant_title: None,
            sku: Some("WPI-1KG".to_string()),
            quantity: 2,
            price: 50_000,
            compare_at_price: None,
            image: None,
            weight: Some(1.0),
        }],
        shipping_address: Some(Address {
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            company: None,
            address1: "12 MG Road".to_string(),
            address2: None,
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            country: "India".to_string(),
            zip_code: "560001".to_string(),
            phone: Some("9999988888".to_string()),
        }),
        billing_address: None,
        customer_info: Some(CustomerInfoInput {
            email: "asha@example.com".to_string(),
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            phone: Some("9999988888".to_string()),
            user_id: None,
            accepts_marketing: false,
        }),
        payment_method: Some("cod".to_string()),
        subtotal: None,
        discount: Some(10_000),
        discount_code: None,
        shipping_cost: Some(5_000),
        tax: None,
        total_amount: None,
        notes: None,
    }
}

// Storefront order creation, history lookup and admin mutation in one pass.
#[tokio::test]
async fn order_lifecycle_flow() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(
        &url,
        "orders, payments, shipments, customers, audit_logs, store_settings",
    )
    .await?;
    let admin = admin();

    // Computed totals: 2 x 50000 - 10000 + 5000 = 95000 paise.
    let created = order_service::create_order(&state, order_request())
        .await?
        .data
        .unwrap();
    assert_eq!(created.total_amount, 95_000);
    assert_eq!(created.status, OrderStatus::Confirmed); // COD confirms immediately
    assert!(created.order_number.starts_with("GN"));

    // A client-provided total wins over the computed one.
    let mut with_total = order_request();
    with_total.total_amount = Some(75_000);
    let overridden = order_service::create_order(&state, with_total)
        .await?
        .data
        .unwrap();
    assert_eq!(overridden.total_amount, 75_000);

    // Lookup by public order number.
    let fetched = order_service::get_order(&state, &created.order_number)
        .await?
        .data
        .unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.payment_details.amount, 95_000);
    assert!(fetched.timeline.iter().any(|e| e.event == "order_created"));

    // History is scoped to the customer email.
    let history = order_service::list_orders(
        &state,
        "asha@example.com",
        &Pagination {
            page: 1,
            per_page: 20,
        },
    )
    .await?;
    assert_eq!(history.meta.unwrap().total, Some(2));

    let none = order_service::list_orders(
        &state,
        "someone-else@example.com",
        &Pagination {
            page: 1,
            per_page: 20,
        },
    )
    .await?;
    assert!(none.data.unwrap().items.is_empty());

    // An empty email is rejected rather than listing everything.
    let unscoped = order_service::list_orders(
        &state,
        "",
        &Pagination {
            page: 1,
            per_page: 20,
        },
    )
    .await;
    assert!(unscoped.is_err());

    // Admin tagging and cancellation.
    admin_service::update_order(
        &state,
        &admin,
        created.id,
        OrderCommand::AddTag {
            tag: "priority".to_string(),
        },
    )
    .await?;
    let cancelled = admin_service::update_order(
        &state,
        &admin,
        created.id,
        OrderCommand::Cancel {
            reason: Some("Customer request".to_string()),
            user: Some("ops".to_string()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(
        cancelled
            .timeline
            .iter()
            .filter(|e| e.event == "order_cancelled")
            .count(),
        1
    );
    assert!(cancelled.tags.contains(&"priority".to_string()));

    // Cancelling again is refused and changes nothing.
    let again = admin_service::update_order(
        &state,
        &admin,
        created.id,
        OrderCommand::Cancel {
            reason: None,
            user: None,
        },
    )
    .await;
    assert!(again.is_err());
    let detail = admin_service::get_order(&state, &admin, created.id)
        .await?
        .data
        .unwrap();
    assert_eq!(detail.order.status, OrderStatus::Cancelled);
    assert_eq!(
        detail
            .order
            .timeline
            .iter()
            .filter(|e| e.event == "order_cancelled")
            .count(),
        1
    );

    // Admin listing filters by status.
    let listed = admin_service::list_orders(
        &state,
        &admin,
        AdminOrderListQuery {
            page: 1,
            per_page: 20,
            status: Some("cancelled".to_string()),
            payment_status: None,
            q: None,
        },
    )
    .await?;
    assert_eq!(listed.data.unwrap().items.len(), 1);

    // A forged checkout signature fails the payment record but leaves the
    // order document untouched.
    settings_service::update_settings(
        &state,
        &admin,
        SettingsPayload {
            razorpay: Some(RazorpaySettings {
                enabled: true,
                key_id: "rzp_test_key".to_string(),
                key_secret: "checkout-secret".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        },
    )
    .await?;

    payments::ActiveModel {
        id: Set(Uuid::new_v4()),
        payment_ref: Set("PAY-20260827-0F0F0F0F".to_string()),
        order_id: Set(overridden.id),
        provider: Set("razorpay".to_string()),
        amount: Set(overridden.total_amount),
        currency: Set("INR".to_string()),
        amount_refunded: Set(0),
        provider_payment_id: Set(None),
        provider_order_id: Set(Some("order_local123".to_string())),
        provider_signature: Set(None),
        status: Set("pending".to_string()),
        status_history: Set(json!([])),
        payment_method: Set(None),
        refunds: Set(json!([])),
        webhook_events: Set(json!([])),
        customer_email: Set("asha@example.com".to_string()),
        customer_phone: Set(String::new()),
        customer_name: Set("Asha Rao".to_string()),
        error_code: Set(None),
        error_message: Set(None),
        authorized_at: Set(None),
        captured_at: Set(None),
        failed_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let rejected = payment_service::verify_razorpay_payment(
        &state,
        VerifyRazorpayRequest {
            razorpay_order_id: Some("order_local123".to_string()),
            razorpay_payment_id: Some("pay_local123".to_string()),
            razorpay_signature: Some("not-a-real-signature".to_string()),
        },
    )
    .await;
    assert!(rejected.is_err());

    let failed = payments::Entity::find()
        .filter(payments::Column::ProviderOrderId.eq("order_local123"))
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(failed.status, "failed");
    assert!(failed.failed_at.is_some());

    let untouched = order_service::get_order(&state, &overridden.order_number)
        .await?
        .data
        .unwrap();
    assert_eq!(untouched.payment_details.status, OrderPaymentStatus::Pending);
    assert!(!untouched
        .timeline
        .iter()
        .any(|e| e.event == "payment_failed"));

    Ok(())
}

#[tokio::test]
async fn catalog_flow() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, "products").await?;
    let admin = admin();

    let created = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            title: "Creatine Monohydrate 250g".to_string(),
            handle: None,
            description: None,
            price: 89_900,
            compare_at_price: None,
            stock: 50,
            variants: vec![],
            images: vec![],
            tags: vec![],
            status: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(created.handle, "creatine-monohydrate-250g");

    // Same title slugs to the same handle.
    let duplicate = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            title: "Creatine Monohydrate 250g".to_string(),
            handle: None,
            description: None,
            price: 79_900,
            compare_at_price: None,
            stock: 10,
            variants: vec![],
            images: vec![],
            tags: vec![],
            status: None,
        },
    )
    .await;
    assert!(duplicate.is_err());

    // A duplicate inside a bulk batch rolls the whole batch back.
    let bulk = product_service::bulk_create(
        &state,
        &admin,
        BulkProductsRequest {
            products: vec![
                CreateProductRequest {
                    title: "Omega-3 Fish Oil".to_string(),
                    handle: None,
                    description: None,
                    price: 64_900,
                    compare_at_price: None,
                    stock: 20,
                    variants: vec![],
                    images: vec![],
                    tags: vec![],
                    status: None,
                },
                CreateProductRequest {
                    title: "Creatine Monohydrate 250g".to_string(),
                    handle: None,
                    description: None,
                    price: 1,
                    compare_at_price: None,
                    stock: 1,
                    variants: vec![],
                    images: vec![],
                    tags: vec![],
                    status: None,
                },
            ],
        },
    )
    .await;
    assert!(bulk.is_err());

    let query = ProductListQuery {
        page: 1,
        per_page: 20,
        q: None,
    };
    let listed = product_service::list_products(&state, &query, false).await?;
    assert_eq!(listed.data.unwrap().items.len(), 1);

    // Lookup by handle, then soft delete hides it from the storefront.
    let by_handle = product_service::get_product(&state, "creatine-monohydrate-250g").await?;
    let id = by_handle.data.unwrap().id;
    product_service::delete_product(&state, &admin, id).await?;
    assert!(product_service::get_product(&state, "creatine-monohydrate-250g")
        .await
        .is_err());
    let after = product_service::list_products(&state, &query, true).await?;
    assert!(after.data.unwrap().items.is_empty());

    Ok(())
}
