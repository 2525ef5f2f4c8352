//! Admin console order operations. Mutations go through a closed command
//! set applied to the in-memory order document, then written back whole.

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::admin::{AdminOrderDetail, OrderCommand},
    dto::orders::OrderList,
    entity::orders::{self, Entity as Orders},
    entity::payments::{self, Entity as Payments},
    entity::shipments::{self, Entity as Shipments},
    error::{AppError, AppResult},
    middleware::auth::{AdminUser, ensure_admin},
    models::{Order, OrderNote, OrderStatus, TimelineEvent},
    response::{ApiResponse, Meta},
    routes::params::AdminOrderListQuery,
    services::{order_service, payment_service, shipment_service},
    state::AppState,
};

use order_service::{order_from_entity, to_json};

pub async fn list_orders(
    state: &AppState,
    user: &AdminUser,
    query: AdminOrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;

    let mut select = Orders::find().order_by_desc(orders::Column::CreatedAt);
    if let Some(status) = &query.status {
        select = select.filter(orders::Column::Status.eq(status.clone()));
    }
    if let Some(payment_status) = &query.payment_status {
        select = select.filter(sea_orm::prelude::Expr::cust_with_values(
            "payment_details->>'status' = ?",
            [payment_status.clone()],
        ));
    }
    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let like = format!("%{}%", q.trim());
        select = select.filter(sea_orm::prelude::Expr::cust_with_values(
            "(order_number ILIKE ? OR customer->>'email' ILIKE ?)",
            [like.clone(), like],
        ));
    }

    let pagination = query.pagination();
    let total = select.clone().count(&state.orm).await? as i64;
    let models = select
        .paginate(&state.orm, pagination.limit())
        .fetch_page(pagination.zero_based_page())
        .await?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList {
            items: models.into_iter().map(order_from_entity).collect(),
        },
        Some(Meta::new(pagination.page, pagination.per_page, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<AdminOrderDetail>> {
    ensure_admin(user)?;

    let model = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let shipment = Shipments::find()
        .filter(shipments::Column::OrderId.eq(id))
        .one(&state.orm)
        .await?
        .map(shipment_service::shipment_from_entity);

    let payment_models = Payments::find()
        .filter(payments::Column::OrderId.eq(id))
        .order_by_desc(payments::Column::CreatedAt)
        .all(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Order",
        AdminOrderDetail {
            order: order_from_entity(model),
            shipment,
            payments: payment_models
                .into_iter()
                .map(payment_service::payment_from_entity)
                .collect(),
        },
        Some(Meta::empty()),
    ))
}

/// Statuses from which cancellation is refused.
fn cancellable(status: OrderStatus) -> bool {
    !matches!(
        status,
        OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
    )
}

/// Apply one command to the order document. Returns an error without
/// touching the document when the command is not valid for its state.
pub fn apply_command(order: &mut Order, command: OrderCommand) -> AppResult<()> {
    match command {
        OrderCommand::UpdateStatus { status, user } => {
            let from = order.status;
            order.status = status;
            order.timeline.push(TimelineEvent::new(
                "status_changed",
                format!("Status changed from {} to {}", from.as_str(), status.as_str()),
                user.as_deref(),
            ));
        }
        OrderCommand::AddNote {
            content,
            author,
            is_internal,
        } => {
            order.notes.push(OrderNote {
                id: Uuid::new_v4().to_string(),
                content,
                author: author.unwrap_or_else(|| "admin".to_string()),
                is_internal,
                created_at: Utc::now(),
            });
        }
        OrderCommand::AddTag { tag } => {
            if !order.tags.contains(&tag) {
                order.tags.push(tag);
            }
        }
        OrderCommand::RemoveTag { tag } => {
            order.tags.retain(|t| t != &tag);
        }
        OrderCommand::Assign { assigned_to, user } => {
            order.timeline.push(TimelineEvent::new(
                "assigned",
                format!("Order assigned to {assigned_to}"),
                user.as_deref(),
            ));
            order.assigned_to = Some(assigned_to);
        }
        OrderCommand::Cancel { reason, user } => {
            if !cancellable(order.status) {
                return Err(AppError::BadRequest(format!(
                    "Cannot cancel an order in status {}",
                    order.status.as_str()
                )));
            }
            order.status = OrderStatus::Cancelled;
            order.timeline.push(TimelineEvent::new(
                "order_cancelled",
                reason.unwrap_or_else(|| "Order cancelled".to_string()),
                user.as_deref(),
            ));
        }
        OrderCommand::UpdateShippingAddress {
            shipping_address,
            user,
        } => {
            order.shipping_address = shipping_address;
            order.timeline.push(TimelineEvent::new(
                "shipping_address_updated",
                "Shipping address updated",
                user.as_deref(),
            ));
        }
    }
    Ok(())
}

pub async fn update_order(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
    command: OrderCommand,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let model = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let mut order = order_from_entity(model.clone());

    apply_command(&mut order, command)?;

    let mut active: orders::ActiveModel = model.into();
    active.status = Set(order.status.as_str().to_string());
    active.shipping_address = Set(to_json(&order.shipping_address)?);
    active.notes = Set(to_json(&order.notes)?);
    active.timeline = Set(to_json(&order.timeline)?);
    active.tags = Set(to_json(&order.tags)?);
    active.assigned_to = Set(order.assigned_to.clone());
    active.updated_at = Set(Utc::now().into());
    let saved = active.update(&state.orm).await?;

    if let Err(err) = crate::audit::log_audit(
        &state.pool,
        Some(user.admin_id),
        "order_update",
        Some("orders"),
        Some(json!({ "order_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(saved),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Address, FulfillmentStatus, OrderCustomer, OrderPaymentStatus, PaymentDetails,
    };

    fn order(status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            order_number: "GN2608ABCDEF".to_string(),
            customer: OrderCustomer {
                email: "asha@example.com".to_string(),
                first_name: "Asha".to_string(),
                last_name: "Rao".to_string(),
                phone: None,
                user_id: None,
                accepts_marketing: false,
            },
            items: vec![],
            shipping_address: Address::default(),
            billing_address: None,
            subtotal: 95_000,
            discount: 0,
            discount_code: None,
            shipping_cost: 0,
            tax: 0,
            total_amount: 95_000,
            currency: "INR".to_string(),
            status,
            payment_details: PaymentDetails {
                method: "cod".to_string(),
                status: OrderPaymentStatus::Pending,
                transaction_id: None,
                gateway: None,
                amount: 95_000,
                paid_at: None,
            },
            shipping_details: None,
            fulfillment_status: FulfillmentStatus::Unfulfilled,
            notes: vec![],
            timeline: vec![],
            tags: vec![],
            assigned_to: None,
            is_archived: false,
            requires_shipping: true,
            source: "web".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn cancel_refused_for_terminal_states() {
        for status in [
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            let mut o = order(status);
            let result = apply_command(
                &mut o,
                OrderCommand::Cancel {
                    reason: None,
                    user: None,
                },
            );
            assert!(result.is_err());
            assert_eq!(o.status, status);
            assert!(o.timeline.is_empty());
        }
    }

    #[test]
    fn cancel_records_exactly_one_timeline_event() {
        let mut o = order(OrderStatus::Pending);
        apply_command(
            &mut o,
            OrderCommand::Cancel {
                reason: Some("Customer request".to_string()),
                user: Some("ops".to_string()),
            },
        )
        .unwrap();
        assert_eq!(o.status, OrderStatus::Cancelled);
        assert_eq!(o.timeline.len(), 1);
        assert_eq!(o.timeline[0].event, "order_cancelled");
        assert_eq!(o.timeline[0].description, "Customer request");
    }

    #[test]
    fn status_change_is_recorded() {
        let mut o = order(OrderStatus::Confirmed);
        apply_command(
            &mut o,
            OrderCommand::UpdateStatus {
                status: OrderStatus::Processing,
                user: None,
            },
        )
        .unwrap();
        assert_eq!(o.status, OrderStatus::Processing);
        assert_eq!(o.timeline.len(), 1);
        assert!(o.timeline[0].description.contains("confirmed"));
        assert!(o.timeline[0].description.contains("processing"));
    }

    #[test]
    fn tags_do_not_duplicate() {
        let mut o = order(OrderStatus::Pending);
        apply_command(&mut o, OrderCommand::AddTag { tag: "vip".to_string() }).unwrap();
        apply_command(&mut o, OrderCommand::AddTag { tag: "vip".to_string() }).unwrap();
        assert_eq!(o.tags, vec!["vip".to_string()]);
        apply_command(&mut o, OrderCommand::RemoveTag { tag: "vip".to_string() }).unwrap();
        assert!(o.tags.is_empty());
    }

    #[test]
    fn note_defaults_to_internal_admin_author() {
        let mut o = order(OrderStatus::Pending);
        apply_command(
            &mut o,
            OrderCommand::AddNote {
                content: "Call before delivery".to_string(),
                author: None,
                is_internal: true,
            },
        )
        .unwrap();
        assert_eq!(o.notes.len(), 1);
        assert_eq!(o.notes[0].author, "admin");
        assert!(o.notes[0].is_internal);
    }
}
