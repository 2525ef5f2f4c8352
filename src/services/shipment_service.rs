//! Shiprocket-backed fulfillment: shipment creation, AWB assignment and
//! tracking, with select fields mirrored back onto the order document.

use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    dto::shipments::{AwbResponse, CreateShipmentRequest, GenerateAwbRequest, ServiceabilityQuery, TrackQuery},
    entity::orders,
    entity::shipments::{self, Entity as Shipments},
    error::{AppError, AppResult},
    gateways::shiprocket::{ShiprocketClient, map_carrier_status},
    middleware::auth::{AdminUser, ensure_admin},
    models::{
        FulfillmentStatus, Order, OrderStatus, Package, Shipment, ShipmentAddress, ShipmentItem,
        ShipmentStatus, ShipmentStatusEntry, ShippingDetails, StoreSettings, TimelineEvent,
        TrackingEvent,
    },
    response::{ApiResponse, Meta},
    services::{order_service, settings_service},
    state::AppState,
};

use order_service::{order_from_entity, to_json};

fn new_shipment_ref() -> String {
    let stamp = Utc::now().format("%Y%m%d");
    let suffix: String = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("SHP-{stamp}-{suffix}")
}

pub(crate) fn shipment_from_entity(m: shipments::Model) -> Shipment {
    Shipment {
        id: m.id,
        shipment_ref: m.shipment_ref,
        order_id: m.order_id,
        provider: m.provider,
        provider_shipment_id: m.provider_shipment_id,
        provider_order_id: m.provider_order_id,
        awb_number: m.awb_number,
        courier_name: m.courier_name,
        courier_id: m.courier_id,
        package: serde_json::from_value(m.package).unwrap_or_default(),
        pickup_address: serde_json::from_value(m.pickup_address).unwrap_or_default(),
        delivery_address: serde_json::from_value(m.delivery_address).unwrap_or_default(),
        status: ShipmentStatus::parse(&m.status).unwrap_or_default(),
        status_history: serde_json::from_value(m.status_history).unwrap_or_default(),
        tracking_history: serde_json::from_value(m.tracking_history).unwrap_or_default(),
        delivery_attempts: serde_json::from_value(m.delivery_attempts).unwrap_or_default(),
        items: serde_json::from_value(m.items).unwrap_or_default(),
        shipping_cost: m.shipping_cost,
        is_cod: m.is_cod,
        cod_amount: m.cod_amount,
        tracking_url: m.tracking_url,
        last_tracked_at: m.last_tracked_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

/// AWB assignment requires the carrier-side shipment id from creation.
/// Fails before any network call when it is missing.
pub fn carrier_shipment_id(model: &shipments::Model) -> AppResult<i64> {
    model
        .provider_shipment_id
        .as_deref()
        .and_then(|id| id.parse::<i64>().ok())
        .ok_or_else(|| {
            AppError::BadRequest("Shiprocket shipment ID not found for this shipment".to_string())
        })
}

fn shiprocket_ready(settings: &StoreSettings) -> AppResult<()> {
    let sr = &settings.shiprocket;
    if !sr.enabled || sr.email.is_empty() || sr.password.is_empty() {
        return Err(AppError::BadRequest(
            "Shiprocket is not configured".to_string(),
        ));
    }
    Ok(())
}

fn client(state: &AppState, settings: &StoreSettings) -> ShiprocketClient {
    ShiprocketClient::new(
        state.http.clone(),
        &settings.shiprocket,
        state.shiprocket_token.clone(),
    )
}

fn delivery_address(order: &Order) -> ShipmentAddress {
    let addr = &order.shipping_address;
    ShipmentAddress {
        name: format!("{} {}", addr.first_name, addr.last_name)
            .trim()
            .to_string(),
        phone: addr
            .phone
            .clone()
            .or_else(|| order.customer.phone.clone())
            .unwrap_or_default(),
        email: Some(order.customer.email.clone()),
        address: addr.address1.clone(),
        address2: addr.address2.clone(),
        city: addr.city.clone(),
        state: addr.state.clone(),
        pincode: addr.zip_code.clone(),
        country: addr.country.clone(),
    }
}

fn rupees(paise: i64) -> f64 {
    paise as f64 / 100.0
}

/// Payload for Shiprocket's adhoc order-create endpoint. Amounts go out in
/// rupees, which is the only place the paise convention leaves the system.
fn carrier_order_payload(
    order: &Order,
    package: &Package,
    settings: &StoreSettings,
    is_cod: bool,
) -> Value {
    let addr = &order.shipping_address;
    let items: Vec<Value> = order
        .items
        .iter()
        .map(|item| {
            json!({
                "name": item.title,
                "sku": item.sku.clone().unwrap_or_else(|| item.product_id.to_string()),
                "units": item.quantity,
                "selling_price": rupees(item.price),
            })
        })
        .collect();

    json!({
        "order_id": order.order_number,
        "order_date": order.created_at.format("%Y-%m-%d %H:%M").to_string(),
        "pickup_location": settings
            .shiprocket
            .pickup_location
            .clone()
            .unwrap_or_else(|| "Primary".to_string()),
        "channel_id": settings.shiprocket.channel_id,
        "billing_customer_name": addr.first_name,
        "billing_last_name": addr.last_name,
        "billing_address": addr.address1,
        "billing_address_2": addr.address2,
        "billing_city": addr.city,
        "billing_pincode": addr.zip_code,
        "billing_state": addr.state,
        "billing_country": addr.country,
        "billing_email": order.customer.email,
        "billing_phone": addr.phone.clone().or_else(|| order.customer.phone.clone()),
        "shipping_is_billing": true,
        "order_items": items,
        "payment_method": if is_cod { "COD" } else { "Prepaid" },
        "sub_total": rupees(order.total_amount),
        "weight": package.weight,
        "length": package.length,
        "breadth": package.width,
        "height": package.height,
    })
}

async fn load_order(state: &AppState, order_id: Uuid) -> AppResult<orders::Model> {
    orders::Entity::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn create_shipment(
    state: &AppState,
    user: &AdminUser,
    payload: CreateShipmentRequest,
) -> AppResult<ApiResponse<Shipment>> {
    ensure_admin(user)?;

    let settings = settings_service::load_settings(&state.orm).await?;
    shiprocket_ready(&settings)?;

    let order_model = load_order(state, payload.order_id).await?;
    let order = order_from_entity(order_model.clone());

    let existing = Shipments::find()
        .filter(shipments::Column::OrderId.eq(payload.order_id))
        .one(&state.orm)
        .await?;
    if existing
        .as_ref()
        .is_some_and(|s| s.provider_shipment_id.is_some())
    {
        return Err(AppError::Conflict(
            "Shipment already created for this order".to_string(),
        ));
    }

    let package = payload.package.unwrap_or(Package {
        weight: 0.5,
        length: 10.0,
        width: 10.0,
        height: 10.0,
    });
    let is_cod = order.payment_details.method == "cod";
    let items: Vec<ShipmentItem> = order
        .items
        .iter()
        .map(|item| ShipmentItem {
            product_id: item.product_id.to_string(),
            product_name: item.title.clone(),
            sku: item.sku.clone(),
            quantity: item.quantity,
            price: item.price,
        })
        .collect();

    let id = Uuid::new_v4();
    let shipment_ref = new_shipment_ref();
    let history = vec![ShipmentStatusEntry::new(ShipmentStatus::Pending)];

    // Record locally before calling out so an upstream failure still
    // leaves a pending shipment to retry.
    shipments::ActiveModel {
        id: Set(id),
        shipment_ref: Set(shipment_ref.clone()),
        order_id: Set(payload.order_id),
        provider: Set("shiprocket".to_string()),
        provider_shipment_id: Set(None),
        provider_order_id: Set(None),
        awb_number: Set(None),
        courier_name: Set(None),
        courier_id: Set(None),
        package: Set(to_json(&package)?),
        pickup_address: Set(to_json(&settings.pickup_address)?),
        delivery_address: Set(to_json(&delivery_address(&order))?),
        status: Set(ShipmentStatus::Pending.as_str().to_string()),
        status_history: Set(to_json(&history)?),
        tracking_history: Set(json!([])),
        delivery_attempts: Set(json!([])),
        items: Set(to_json(&items)?),
        shipping_cost: Set(order.shipping_cost),
        is_cod: Set(is_cod),
        cod_amount: Set(is_cod.then_some(order.total_amount)),
        tracking_url: Set(None),
        last_tracked_at: Set(None),
        estimated_delivery_date: Set(None),
        actual_delivery_date: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let response = client(state, &settings)
        .create_order(carrier_order_payload(&order, &package, &settings, is_cod))
        .await?;

    let provider_shipment_id = response
        .get("shipment_id")
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .filter(|s| !s.is_empty() && s != "null");
    let provider_order_id = response
        .get("order_id")
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .filter(|s| !s.is_empty() && s != "null");

    let model = Shipments::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let mut updated_history: Vec<ShipmentStatusEntry> =
        serde_json::from_value(model.status_history.clone()).unwrap_or_default();
    updated_history.push(ShipmentStatusEntry::new(ShipmentStatus::Processing));
    let mut active: shipments::ActiveModel = model.into();
    active.provider_shipment_id = Set(provider_shipment_id);
    active.provider_order_id = Set(provider_order_id);
    active.status = Set(ShipmentStatus::Processing.as_str().to_string());
    active.status_history = Set(to_json(&updated_history)?);
    active.updated_at = Set(Utc::now().into());
    let saved = active.update(&state.orm).await?;

    let mut order = order_from_entity(order_model.clone());
    if order.status == OrderStatus::Confirmed {
        order.status = OrderStatus::Processing;
    }
    order.timeline.push(TimelineEvent::new(
        "shipment_created",
        format!("Shipment {shipment_ref} created on Shiprocket"),
        Some(&user.admin_id.to_string()),
    ));
    let mut order_active: orders::ActiveModel = order_model.into();
    order_active.status = Set(order.status.as_str().to_string());
    order_active.timeline = Set(to_json(&order.timeline)?);
    order_active.updated_at = Set(Utc::now().into());
    order_active.update(&state.orm).await?;

    tracing::info!(%shipment_ref, order_number = %order.order_number, "shipment created");

    Ok(ApiResponse::success(
        "Shipment created",
        shipment_from_entity(saved),
        Some(Meta::empty()),
    ))
}

pub async fn generate_awb(
    state: &AppState,
    user: &AdminUser,
    payload: GenerateAwbRequest,
) -> AppResult<ApiResponse<AwbResponse>> {
    ensure_admin(user)?;

    let shipment_ref = payload
        .shipment_ref
        .ok_or_else(|| AppError::BadRequest("shipment_ref is required".to_string()))?;

    let settings = settings_service::load_settings(&state.orm).await?;
    shiprocket_ready(&settings)?;

    let model = Shipments::find()
        .filter(shipments::Column::ShipmentRef.eq(shipment_ref.clone()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let carrier_id = carrier_shipment_id(&model)?;
    let courier_id = payload
        .courier_id
        .or(settings.shiprocket.default_courier_id);

    let response = client(state, &settings)
        .assign_awb(carrier_id, courier_id)
        .await?;

    let data = response
        .pointer("/response/data")
        .cloned()
        .unwrap_or(Value::Null);
    let awb = data
        .get("awb_code")
        .and_then(Value::as_str)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::Upstream("AWB assignment returned no AWB code".to_string()))?
        .to_string();
    let courier_name = data
        .get("courier_name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let courier_company_id = data
        .get("courier_company_id")
        .and_then(Value::as_i64)
        .map(|id| id as i32);

    let order_id = model.order_id;
    let mut history: Vec<ShipmentStatusEntry> =
        serde_json::from_value(model.status_history.clone()).unwrap_or_default();
    history.push(ShipmentStatusEntry::new(ShipmentStatus::ReadyToShip));
    let mut active: shipments::ActiveModel = model.into();
    active.awb_number = Set(Some(awb.clone()));
    active.courier_name = Set(courier_name.clone());
    active.courier_id = Set(courier_company_id);
    active.status = Set(ShipmentStatus::ReadyToShip.as_str().to_string());
    active.status_history = Set(to_json(&history)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    let order_model = load_order(state, order_id).await?;
    let mut order = order_from_entity(order_model.clone());
    let mut shipping = order.shipping_details.take().unwrap_or_default();
    shipping.awb_number = Some(awb.clone());
    shipping.carrier = courier_name.clone();
    order.shipping_details = Some(shipping);
    order.timeline.push(TimelineEvent::new(
        "awb_generated",
        format!("AWB {awb} assigned"),
        Some(&user.admin_id.to_string()),
    ));
    let mut order_active: orders::ActiveModel = order_model.into();
    order_active.shipping_details = Set(Some(to_json(&order.shipping_details)?));
    order_active.timeline = Set(to_json(&order.timeline)?);
    order_active.updated_at = Set(Utc::now().into());
    order_active.update(&state.orm).await?;

    tracing::info!(%shipment_ref, %awb, "awb assigned");

    Ok(ApiResponse::success(
        "AWB generated",
        AwbResponse {
            awb_number: awb,
            courier_name,
        },
        Some(Meta::empty()),
    ))
}

/// Track by AWB or shipment reference. Refreshes the stored shipment and
/// mirrors carrier state onto the order when the AWB is known locally.
pub async fn track(state: &AppState, query: TrackQuery) -> AppResult<ApiResponse<Value>> {
    let settings = settings_service::load_settings(&state.orm).await?;
    shiprocket_ready(&settings)?;

    let model = match (&query.awb, &query.shipment_ref) {
        (Some(awb), _) => {
            Shipments::find()
                .filter(shipments::Column::AwbNumber.eq(awb.clone()))
                .one(&state.orm)
                .await?
        }
        (None, Some(shipment_ref)) => Some(
            Shipments::find()
                .filter(shipments::Column::ShipmentRef.eq(shipment_ref.clone()))
                .one(&state.orm)
                .await?
                .ok_or(AppError::NotFound)?,
        ),
        (None, None) => {
            return Err(AppError::BadRequest(
                "awb or shipment_ref is required".to_string(),
            ));
        }
    };

    let awb = match (&query.awb, &model) {
        (Some(awb), _) => awb.clone(),
        (None, Some(m)) => m.awb_number.clone().ok_or_else(|| {
            AppError::BadRequest("AWB not yet assigned for this shipment".to_string())
        })?,
        (None, None) => unreachable!(),
    };

    let data = client(state, &settings).track_awb(&awb).await?;

    if let Some(model) = model {
        let tracking = data
            .pointer("/tracking_data/shipment_track/0")
            .cloned()
            .unwrap_or(Value::Null);
        let carrier_status = tracking
            .get("current_status")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let status = map_carrier_status(&carrier_status);
        let tracking_url = data
            .pointer("/tracking_data/track_url")
            .and_then(Value::as_str)
            .map(str::to_string);

        let order_id = model.order_id;
        let mut history: Vec<ShipmentStatusEntry> =
            serde_json::from_value(model.status_history.clone()).unwrap_or_default();
        let mut events: Vec<TrackingEvent> =
            serde_json::from_value(model.tracking_history.clone()).unwrap_or_default();
        if model.status != status.as_str() {
            history.push(ShipmentStatusEntry {
                status,
                location: tracking
                    .get("current_status_location")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                timestamp: Utc::now(),
                description: None,
                provider_status: Some(carrier_status.clone()),
            });
        }
        events.push(TrackingEvent {
            timestamp: Utc::now(),
            location: tracking
                .get("current_status_location")
                .and_then(Value::as_str)
                .map(str::to_string),
            status: carrier_status.clone(),
            description: None,
        });

        let mut active: shipments::ActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.status_history = Set(to_json(&history)?);
        active.tracking_history = Set(to_json(&events)?);
        active.tracking_url = Set(tracking_url.clone());
        active.last_tracked_at = Set(Some(Utc::now().into()));
        if status == ShipmentStatus::Delivered {
            active.actual_delivery_date = Set(Some(Utc::now().into()));
        }
        active.updated_at = Set(Utc::now().into());
        active.update(&state.orm).await?;

        mirror_tracking_to_order(state, order_id, &awb, status, tracking_url).await?;
    }

    Ok(ApiResponse::success("Tracking", data, Some(Meta::empty())))
}

async fn mirror_tracking_to_order(
    state: &AppState,
    order_id: Uuid,
    awb: &str,
    status: ShipmentStatus,
    tracking_url: Option<String>,
) -> AppResult<()> {
    let order_model = load_order(state, order_id).await?;
    let mut order = order_from_entity(order_model.clone());

    let mut shipping = order.shipping_details.take().unwrap_or(ShippingDetails::default());
    shipping.awb_number = Some(awb.to_string());
    if tracking_url.is_some() {
        shipping.tracking_url = tracking_url;
    }

    match status {
        ShipmentStatus::PickedUp | ShipmentStatus::InTransit | ShipmentStatus::OutForDelivery => {
            if shipping.shipped_at.is_none() {
                shipping.shipped_at = Some(Utc::now());
            }
            if order.status == OrderStatus::Confirmed || order.status == OrderStatus::Processing {
                order.status = OrderStatus::Shipped;
                order.timeline.push(TimelineEvent::new(
                    "order_shipped",
                    format!("Shipment picked up by carrier (AWB {awb})"),
                    None,
                ));
            }
        }
        ShipmentStatus::Delivered => {
            shipping.delivered_at = Some(Utc::now());
            if order.status != OrderStatus::Delivered {
                order.status = OrderStatus::Delivered;
                order.fulfillment_status = FulfillmentStatus::Fulfilled;
                order.timeline.push(TimelineEvent::new(
                    "order_delivered",
                    "Carrier reported delivery",
                    None,
                ));
            }
        }
        _ => {}
    }
    order.shipping_details = Some(shipping);

    let mut active: orders::ActiveModel = order_model.into();
    active.status = Set(order.status.as_str().to_string());
    active.fulfillment_status = Set(order.fulfillment_status.as_str().to_string());
    active.shipping_details = Set(Some(to_json(&order.shipping_details)?));
    active.timeline = Set(to_json(&order.timeline)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;
    Ok(())
}

pub async fn serviceability(
    state: &AppState,
    query: ServiceabilityQuery,
) -> AppResult<ApiResponse<Value>> {
    let settings = settings_service::load_settings(&state.orm).await?;
    shiprocket_ready(&settings)?;

    let data = client(state, &settings)
        .serviceability(
            &query.pickup_postcode,
            &query.delivery_postcode,
            query.weight,
            query.cod,
        )
        .await?;

    Ok(ApiResponse::success(
        "Serviceability",
        data,
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::prelude::DateTimeWithTimeZone;

    fn model(provider_shipment_id: Option<&str>) -> shipments::Model {
        let now: DateTimeWithTimeZone = Utc::now().into();
        shipments::Model {
            id: Uuid::new_v4(),
            shipment_ref: "SHP-20260827-ABCD1234".to_string(),
            order_id: Uuid::new_v4(),
            provider: "shiprocket".to_string(),
            provider_shipment_id: provider_shipment_id.map(str::to_string),
            provider_order_id: None,
            awb_number: None,
            courier_name: None,
            courier_id: None,
            package: json!({}),
            pickup_address: json!({}),
            delivery_address: json!({}),
            status: "pending".to_string(),
            status_history: json!([]),
            tracking_history: json!([]),
            delivery_attempts: json!([]),
            items: json!([]),
            shipping_cost: 0,
            is_cod: false,
            cod_amount: None,
            tracking_url: None,
            last_tracked_at: None,
            estimated_delivery_date: None,
            actual_delivery_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn awb_requires_carrier_shipment_id() {
        assert!(matches!(
            carrier_shipment_id(&model(None)),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(carrier_shipment_id(&model(Some("4521"))).ok(), Some(4521));
    }

    #[test]
    fn non_numeric_carrier_id_is_rejected() {
        assert!(carrier_shipment_id(&model(Some("not-a-number"))).is_err());
    }
}
