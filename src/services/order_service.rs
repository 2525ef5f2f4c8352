use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, OrderSummary},
    entity::customers,
    entity::orders::{self, Entity as Orders},
    error::{AppError, AppResult},
    models::{
        Address, FulfillmentStatus, Order, OrderCustomer, OrderItem, OrderNote,
        OrderPaymentStatus, OrderStatus, PaymentDetails, TimelineEvent,
    },
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Monetary breakdown for an order, in paise.
#[derive(Debug, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: i64,
    pub discount: i64,
    pub shipping_cost: i64,
    pub tax: i64,
    pub total_amount: i64,
}

/// Client-provided figures always win over the computed ones; the computed
/// values only fill the gaps.
pub fn compute_totals(payload: &CreateOrderRequest) -> Totals {
    let computed_subtotal: i64 = payload
        .items
        .iter()
        .map(|item| item.price * i64::from(item.quantity))
        .sum();
    let subtotal = payload.subtotal.unwrap_or(computed_subtotal);
    let discount = payload.discount.unwrap_or(0);
    let shipping_cost = payload.shipping_cost.unwrap_or(0);
    let tax = payload.tax.unwrap_or(0);
    let total_amount = payload
        .total_amount
        .unwrap_or(subtotal - discount + shipping_cost + tax);
    Totals {
        subtotal,
        discount,
        shipping_cost,
        tax,
        total_amount,
    }
}

fn new_order_number() -> String {
    let stamp = Utc::now().format("%y%m");
    let suffix: String = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("GN{stamp}{suffix}")
}

pub(crate) fn order_from_entity(m: orders::Model) -> Order {
    Order {
        id: m.id,
        order_number: m.order_number,
        customer: serde_json::from_value(m.customer).unwrap_or_default(),
        items: serde_json::from_value(m.items).unwrap_or_default(),
        shipping_address: serde_json::from_value(m.shipping_address).unwrap_or_default(),
        billing_address: m
            .billing_address
            .and_then(|v| serde_json::from_value(v).ok()),
        subtotal: m.subtotal,
        discount: m.discount,
        discount_code: m.discount_code,
        shipping_cost: m.shipping_cost,
        tax: m.tax,
        total_amount: m.total_amount,
        currency: m.currency,
        status: OrderStatus::parse(&m.status).unwrap_or(OrderStatus::Pending),
        payment_details: serde_json::from_value(m.payment_details).unwrap_or_default(),
        shipping_details: m
            .shipping_details
            .and_then(|v| serde_json::from_value(v).ok()),
        fulfillment_status: FulfillmentStatus::parse(&m.fulfillment_status).unwrap_or_default(),
        notes: serde_json::from_value(m.notes).unwrap_or_default(),
        timeline: serde_json::from_value(m.timeline).unwrap_or_default(),
        tags: serde_json::from_value(m.tags).unwrap_or_default(),
        assigned_to: m.assigned_to,
        is_archived: m.is_archived,
        requires_shipping: m.requires_shipping,
        source: m.source,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

async fn upsert_customer(state: &AppState, customer: &OrderCustomer) -> AppResult<()> {
    let existing = customers::Entity::find()
        .filter(customers::Column::Email.eq(customer.email.clone()))
        .one(&state.orm)
        .await?;

    match existing {
        Some(row) => {
            let mut active: customers::ActiveModel = row.into();
            active.first_name = Set(Some(customer.first_name.clone()));
            active.last_name = Set(Some(customer.last_name.clone()));
            active.updated_at = Set(Utc::now().into());
            active.update(&state.orm).await?;
        }
        None => {
            let external_id = customer
                .user_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| customer.email.clone());
            customers::ActiveModel {
                id: Set(Uuid::new_v4()),
                external_id: Set(external_id),
                email: Set(customer.email.clone()),
                first_name: Set(Some(customer.first_name.clone())),
                last_name: Set(Some(customer.last_name.clone())),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&state.orm)
            .await?;
        }
    }
    Ok(())
}

pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderSummary>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order must contain items".to_string()));
    }
    let shipping_address: Address = payload
        .shipping_address
        .clone()
        .ok_or_else(|| AppError::BadRequest("Shipping address is required".to_string()))?;
    let customer_info = payload
        .customer_info
        .clone()
        .ok_or_else(|| AppError::BadRequest("Customer info is required".to_string()))?;
    if customer_info.email.trim().is_empty() {
        return Err(AppError::BadRequest("Customer email is required".to_string()));
    }

    let totals = compute_totals(&payload);
    let payment_method = payload
        .payment_method
        .clone()
        .unwrap_or_else(|| "cod".to_string());

    // COD needs no gateway round trip, so those orders confirm immediately.
    let status = if payment_method == "cod" {
        OrderStatus::Confirmed
    } else {
        OrderStatus::Pending
    };

    let customer = OrderCustomer {
        email: customer_info.email,
        first_name: customer_info.first_name,
        last_name: customer_info.last_name,
        phone: customer_info.phone,
        user_id: customer_info.user_id,
        accepts_marketing: customer_info.accepts_marketing,
    };

    let items: Vec<OrderItem> = payload
        .items
        .iter()
        .map(|input| OrderItem {
            product_id: input.product_id,
            variant_id: input.variant_id.clone(),
            title: input.title.clone(),
            variant_title: input.variant_title.clone(),
            sku: input.sku.clone(),
            quantity: input.quantity,
            price: input.price,
            compare_at_price: input.compare_at_price,
            image: input.image.clone(),
            weight: input.weight,
        })
        .collect();

    let payment_details = PaymentDetails {
        method: payment_method.clone(),
        status: OrderPaymentStatus::Pending,
        transaction_id: None,
        gateway: None,
        amount: totals.total_amount,
        paid_at: None,
    };

    let mut timeline = vec![TimelineEvent::new(
        "order_created",
        "Order placed via storefront",
        None,
    )];
    if status == OrderStatus::Confirmed {
        timeline.push(TimelineEvent::new(
            "order_confirmed",
            "Order confirmed (cash on delivery)",
            None,
        ));
    }

    let notes: Vec<OrderNote> = payload
        .notes
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .map(|content| {
            vec![OrderNote {
                id: Uuid::new_v4().to_string(),
                content: content.to_string(),
                author: "customer".to_string(),
                is_internal: false,
                created_at: Utc::now(),
            }]
        })
        .unwrap_or_default();

    let id = Uuid::new_v4();
    let order_number = new_order_number();

    let active = orders::ActiveModel {
        id: Set(id),
        order_number: Set(order_number.clone()),
        customer: Set(to_json(&customer)?),
        items: Set(to_json(&items)?),
        shipping_address: Set(to_json(&shipping_address)?),
        billing_address: Set(match &payload.billing_address {
            Some(address) => Some(to_json(address)?),
            None => None,
        }),
        subtotal: Set(totals.subtotal),
        discount: Set(totals.discount),
        discount_code: Set(payload.discount_code.clone()),
        shipping_cost: Set(totals.shipping_cost),
        tax: Set(totals.tax),
        total_amount: Set(totals.total_amount),
        currency: Set("INR".to_string()),
        status: Set(status.as_str().to_string()),
        payment_details: Set(to_json(&payment_details)?),
        shipping_details: Set(None),
        fulfillment_status: Set(FulfillmentStatus::Unfulfilled.as_str().to_string()),
        notes: Set(to_json(&notes)?),
        timeline: Set(to_json(&timeline)?),
        tags: Set(json!([])),
        assigned_to: Set(None),
        is_archived: Set(false),
        requires_shipping: Set(true),
        source: Set("web".to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    };
    active.insert(&state.orm).await?;

    if let Err(err) = upsert_customer(state, &customer).await {
        tracing::warn!(error = %err, %order_number, "customer upsert failed");
    }

    if let Err(err) = crate::audit::log_audit(
        &state.pool,
        None,
        "order_create",
        Some("orders"),
        Some(json!({ "order_number": order_number, "total_amount": totals.total_amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    tracing::info!(%order_number, total = totals.total_amount, "order created");

    Ok(ApiResponse::success(
        "Order created",
        OrderSummary {
            id,
            order_number,
            status,
            total_amount: totals.total_amount,
            payment_method,
        },
        Some(Meta::empty()),
    ))
}

/// Look the order up by UUID first, falling back to the public order number.
pub async fn find_order(state: &AppState, key: &str) -> AppResult<orders::Model> {
    let found = match Uuid::parse_str(key) {
        Ok(id) => Orders::find_by_id(id).one(&state.orm).await?,
        Err(_) => {
            Orders::find()
                .filter(orders::Column::OrderNumber.eq(key))
                .one(&state.orm)
                .await?
        }
    };
    found.ok_or(AppError::NotFound)
}

pub async fn get_order(state: &AppState, key: &str) -> AppResult<ApiResponse<Order>> {
    let model = find_order(state, key).await?;
    Ok(ApiResponse::success(
        "Order",
        order_from_entity(model),
        Some(Meta::empty()),
    ))
}

/// Storefront order history, scoped to one customer email.
pub async fn list_orders(
    state: &AppState,
    email: &str,
    pagination: &Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    if email.trim().is_empty() {
        return Err(AppError::BadRequest("email is required".to_string()));
    }

    let base = Orders::find()
        .filter(sea_orm::prelude::Expr::cust_with_values(
            "customer->>'email' = ?",
            [email.to_string()],
        ))
        .order_by_desc(orders::Column::CreatedAt);

    let total = base.clone().count(&state.orm).await? as i64;
    let models = base
        .paginate(&state.orm, pagination.limit())
        .fetch_page(pagination.zero_based_page())
        .await?;

    let items = models.into_iter().map(order_from_entity).collect();
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(pagination.page, pagination.per_page, total)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::orders::OrderItemInput;

    fn item(price: i64, quantity: i32) -> OrderItemInput {
        OrderItemInput {
            product_id: Uuid::new_v4(),
            variant_id: None,
            title: "Whey Protein 1kg".to_string(),
            variant_title: None,
            sku: None,
            quantity,
            price,
            compare_at_price: None,
            image: None,
            weight: None,
        }
    }

    fn request(items: Vec<OrderItemInput>) -> CreateOrderRequest {
        CreateOrderRequest {
            items,
            shipping_address: None,
            billing_address: None,
            customer_info: None,
            payment_method: None,
            subtotal: None,
            discount: None,
            discount_code: None,
            shipping_cost: None,
            tax: None,
            total_amount: None,
            notes: None,
        }
    }

    #[test]
    fn totals_computed_from_items_when_absent() {
        let mut req = request(vec![item(50_000, 2)]);
        req.discount = Some(10_000);
        req.shipping_cost = Some(5_000);

        let totals = compute_totals(&req);
        assert_eq!(totals.subtotal, 100_000);
        assert_eq!(totals.total_amount, 95_000);
    }

    #[test]
    fn provided_totals_override_computed() {
        let mut req = request(vec![item(50_000, 2)]);
        req.subtotal = Some(80_000);
        req.total_amount = Some(75_000);

        let totals = compute_totals(&req);
        assert_eq!(totals.subtotal, 80_000);
        assert_eq!(totals.total_amount, 75_000);
    }

    #[test]
    fn order_number_has_recognizable_prefix() {
        let n = new_order_number();
        assert!(n.starts_with("GN"));
        assert_eq!(n.len(), 12);
    }
}
