//! Payment sessions, gateway callbacks and webhook effects.
//!
//! All gateway-side writes funnel through the Payment record first, then
//! mirror a summary onto the order document. Webhook deliveries are
//! deduplicated by provider event id before any effect is applied.

use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    dto::payments::{
        CreatePayuOrderRequest, CreateRazorpayOrderRequest, PayuCallback, PayuFormData,
        PayuOrderResponse, RazorpayOrderResponse, VerifyRazorpayRequest, VerifyRazorpayResponse,
    },
    entity::orders,
    entity::payments::{self, Entity as Payments},
    error::{AppError, AppResult},
    gateways::{payu, razorpay},
    models::{
        OrderPaymentStatus, OrderStatus, Payment, PaymentMethodInfo, PaymentProvider,
        PaymentStatus, PaymentStatusEntry, RefundEntry, TimelineEvent, WebhookEvent,
        refund_status,
    },
    response::{ApiResponse, Meta},
    services::{order_service, settings_service},
    state::AppState,
};

use order_service::to_json;

fn new_payment_ref() -> String {
    let stamp = Utc::now().format("%Y%m%d");
    let suffix: String = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("PAY-{stamp}-{suffix}")
}

fn new_txn_id() -> String {
    let stamp = Utc::now().format("%Y%m%d");
    let suffix: String = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("TXN-{stamp}-{suffix}")
}

pub(crate) fn payment_from_entity(m: payments::Model) -> Payment {
    Payment {
        id: m.id,
        payment_ref: m.payment_ref,
        order_id: m.order_id,
        provider: PaymentProvider::parse(&m.provider).unwrap_or(PaymentProvider::Razorpay),
        amount: m.amount,
        currency: m.currency,
        amount_refunded: m.amount_refunded,
        provider_payment_id: m.provider_payment_id,
        provider_order_id: m.provider_order_id,
        status: PaymentStatus::parse(&m.status).unwrap_or(PaymentStatus::Pending),
        status_history: serde_json::from_value(m.status_history).unwrap_or_default(),
        payment_method: m.payment_method.and_then(|v| serde_json::from_value(v).ok()),
        refunds: serde_json::from_value(m.refunds).unwrap_or_default(),
        webhook_events: serde_json::from_value(m.webhook_events).unwrap_or_default(),
        customer_email: m.customer_email,
        customer_phone: m.customer_phone,
        customer_name: m.customer_name,
        error_code: m.error_code,
        error_message: m.error_message,
        captured_at: m.captured_at.map(|t| t.with_timezone(&Utc)),
        failed_at: m.failed_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

/// True when this provider event id has already been applied to the payment.
pub fn is_duplicate_event(events: &[WebhookEvent], event_id: &str) -> bool {
    !event_id.is_empty() && events.iter().any(|e| e.event_id == event_id)
}

async fn find_payment_by_provider_order(
    state: &AppState,
    provider_order_id: &str,
) -> AppResult<Option<payments::Model>> {
    Ok(Payments::find()
        .filter(payments::Column::ProviderOrderId.eq(provider_order_id))
        .one(&state.orm)
        .await?)
}

async fn find_payment_by_provider_payment(
    state: &AppState,
    provider_payment_id: &str,
) -> AppResult<Option<payments::Model>> {
    Ok(Payments::find()
        .filter(payments::Column::ProviderPaymentId.eq(provider_payment_id))
        .one(&state.orm)
        .await?)
}

// ---------------------------------------------------------------------------
// Order mirroring.
// ---------------------------------------------------------------------------

async fn load_order(state: &AppState, order_id: Uuid) -> AppResult<orders::Model> {
    orders::Entity::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

async fn mark_order_paid(
    state: &AppState,
    order_id: Uuid,
    gateway: &str,
    transaction_id: &str,
) -> AppResult<()> {
    let model = load_order(state, order_id).await?;
    let mut order = order_service::order_from_entity(model.clone());

    if order.payment_details.status == OrderPaymentStatus::Paid {
        return Ok(());
    }

    order.payment_details.status = OrderPaymentStatus::Paid;
    order.payment_details.gateway = Some(gateway.to_string());
    order.payment_details.transaction_id = Some(transaction_id.to_string());
    order.payment_details.paid_at = Some(Utc::now());
    if order.status == OrderStatus::Pending {
        order.status = OrderStatus::Confirmed;
    }
    order.timeline.push(TimelineEvent::new(
        "payment_captured",
        format!("Payment captured via {gateway}"),
        None,
    ));

    let mut active: orders::ActiveModel = model.into();
    active.status = Set(order.status.as_str().to_string());
    active.payment_details = Set(to_json(&order.payment_details)?);
    active.timeline = Set(to_json(&order.timeline)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;
    Ok(())
}

async fn mark_order_payment_failed(
    state: &AppState,
    order_id: Uuid,
    reason: &str,
) -> AppResult<()> {
    let model = load_order(state, order_id).await?;
    let mut order = order_service::order_from_entity(model.clone());

    order.payment_details.status = OrderPaymentStatus::Failed;
    order.timeline.push(TimelineEvent::new(
        "payment_failed",
        format!("Payment failed: {reason}"),
        None,
    ));

    let mut active: orders::ActiveModel = model.into();
    active.payment_details = Set(to_json(&order.payment_details)?);
    active.timeline = Set(to_json(&order.timeline)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;
    Ok(())
}

async fn mark_order_refunded(state: &AppState, order_id: Uuid, fully: bool) -> AppResult<()> {
    let model = load_order(state, order_id).await?;
    let mut order = order_service::order_from_entity(model.clone());

    order.payment_details.status = if fully {
        OrderPaymentStatus::Refunded
    } else {
        OrderPaymentStatus::PartiallyRefunded
    };
    if fully {
        order.status = OrderStatus::Refunded;
    }
    order.timeline.push(TimelineEvent::new(
        "refund_processed",
        if fully {
            "Payment fully refunded".to_string()
        } else {
            "Payment partially refunded".to_string()
        },
        None,
    ));

    let mut active: orders::ActiveModel = model.into();
    active.status = Set(order.status.as_str().to_string());
    active.payment_details = Set(to_json(&order.payment_details)?);
    active.timeline = Set(to_json(&order.timeline)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Razorpay.
// ---------------------------------------------------------------------------

pub async fn create_razorpay_order(
    state: &AppState,
    payload: CreateRazorpayOrderRequest,
) -> AppResult<ApiResponse<RazorpayOrderResponse>> {
    let order_id = payload
        .order_id
        .ok_or_else(|| AppError::BadRequest("order_id is required".to_string()))?;
    let amount = payload
        .amount
        .ok_or_else(|| AppError::BadRequest("amount is required".to_string()))?;
    if amount <= 0 {
        return Err(AppError::BadRequest("amount must be positive".to_string()));
    }

    let settings = settings_service::load_settings(&state.orm).await?;
    let rz = &settings.razorpay;
    if !rz.enabled || rz.key_id.is_empty() || rz.key_secret.is_empty() {
        return Err(AppError::BadRequest(
            "Razorpay is not configured".to_string(),
        ));
    }

    let order = load_order(state, order_id).await?;
    let currency = payload.currency.clone().unwrap_or_else(|| "INR".to_string());

    let provider_order = razorpay::create_provider_order(
        &state.http,
        &rz.key_id,
        &rz.key_secret,
        amount,
        &currency,
        &order.order_number,
        rz.auto_capture,
    )
    .await?;

    let customer = payload.customer_info.unwrap_or_else(|| {
        crate::dto::payments::PaymentCustomerInfo {
            email: None,
            first_name: None,
            last_name: None,
            phone: None,
        }
    });

    let payment_ref = new_payment_ref();
    let history = vec![PaymentStatusEntry::new(PaymentStatus::Pending, None)];
    payments::ActiveModel {
        id: Set(Uuid::new_v4()),
        payment_ref: Set(payment_ref.clone()),
        order_id: Set(order_id),
        provider: Set(PaymentProvider::Razorpay.as_str().to_string()),
        amount: Set(amount),
        currency: Set(currency.clone()),
        amount_refunded: Set(0),
        provider_payment_id: Set(None),
        provider_order_id: Set(Some(provider_order.id.clone())),
        provider_signature: Set(None),
        status: Set(PaymentStatus::Pending.as_str().to_string()),
        status_history: Set(to_json(&history)?),
        payment_method: Set(None),
        refunds: Set(json!([])),
        webhook_events: Set(json!([])),
        customer_email: Set(customer.email.unwrap_or_default()),
        customer_phone: Set(customer.phone.unwrap_or_default()),
        customer_name: Set(format!(
            "{} {}",
            customer.first_name.unwrap_or_default(),
            customer.last_name.unwrap_or_default()
        )
        .trim()
        .to_string()),
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

    tracing::info!(%payment_ref, provider_order_id = %provider_order.id, "razorpay session created");

    Ok(ApiResponse::success(
        "Razorpay order created",
        RazorpayOrderResponse {
            razorpay_order_id: provider_order.id,
            razorpay_key_id: rz.key_id.clone(),
            amount,
            currency,
            payment_ref,
            order_id,
        },
        Some(Meta::empty()),
    ))
}

pub async fn verify_razorpay_payment(
    state: &AppState,
    payload: VerifyRazorpayRequest,
) -> AppResult<ApiResponse<VerifyRazorpayResponse>> {
    let (provider_order_id, provider_payment_id, signature) = match (
        payload.razorpay_order_id,
        payload.razorpay_payment_id,
        payload.razorpay_signature,
    ) {
        (Some(o), Some(p), Some(s)) => (o, p, s),
        _ => {
            return Err(AppError::BadRequest(
                "Missing payment verification parameters".to_string(),
            ));
        }
    };

    let settings = settings_service::load_settings(&state.orm).await?;
    if settings.razorpay.key_secret.is_empty() {
        return Err(AppError::BadRequest(
            "Razorpay is not configured".to_string(),
        ));
    }

    let model = find_payment_by_provider_order(state, &provider_order_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let payment = payment_from_entity(model.clone());

    let valid = razorpay::verify_checkout_signature(
        &settings.razorpay.key_secret,
        &provider_order_id,
        &provider_payment_id,
        &signature,
    );

    if !valid {
        let mut history = payment.status_history.clone();
        history.push(PaymentStatusEntry::new(
            PaymentStatus::Failed,
            Some("Invalid checkout signature"),
        ));
        let mut active: payments::ActiveModel = model.into();
        active.status = Set(PaymentStatus::Failed.as_str().to_string());
        active.status_history = Set(to_json(&history)?);
        active.error_message = Set(Some("Invalid checkout signature".to_string()));
        active.failed_at = Set(Some(Utc::now().into()));
        active.updated_at = Set(Utc::now().into());
        active.update(&state.orm).await?;

        // The order document stays untouched; only the Payment records the
        // failure, so a forged signature cannot pollute the order timeline.
        return Err(AppError::BadRequest(
            "Invalid payment signature".to_string(),
        ));
    }

    let mut history = payment.status_history.clone();
    history.push(PaymentStatusEntry::new(PaymentStatus::Captured, None));
    let mut active: payments::ActiveModel = model.into();
    active.status = Set(PaymentStatus::Captured.as_str().to_string());
    active.status_history = Set(to_json(&history)?);
    active.provider_payment_id = Set(Some(provider_payment_id.clone()));
    active.provider_signature = Set(Some(signature));
    active.captured_at = Set(Some(Utc::now().into()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    mark_order_paid(state, payment.order_id, "razorpay", &provider_payment_id).await?;

    Ok(ApiResponse::success(
        "Payment verified",
        VerifyRazorpayResponse {
            order_id: payment.order_id,
            payment_ref: payment.payment_ref,
        },
        Some(Meta::empty()),
    ))
}

// ---------------------------------------------------------------------------
// PayU.
// ---------------------------------------------------------------------------

pub async fn create_payu_order(
    state: &AppState,
    payload: CreatePayuOrderRequest,
) -> AppResult<ApiResponse<PayuOrderResponse>> {
    let order_id = payload
        .order_id
        .ok_or_else(|| AppError::BadRequest("order_id is required".to_string()))?;
    let amount = payload
        .amount
        .ok_or_else(|| AppError::BadRequest("amount is required".to_string()))?;
    if amount <= 0 {
        return Err(AppError::BadRequest("amount must be positive".to_string()));
    }
    let customer = payload
        .customer_info
        .ok_or_else(|| AppError::BadRequest("customer_info is required".to_string()))?;
    let email = customer
        .email
        .clone()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("customer email is required".to_string()))?;
    let first_name = customer.first_name.clone().unwrap_or_default();
    if first_name.is_empty() {
        return Err(AppError::BadRequest(
            "customer first name is required".to_string(),
        ));
    }

    let settings = settings_service::load_settings(&state.orm).await?;
    let payu_settings = &settings.payu;
    if !payu_settings.enabled
        || payu_settings.merchant_key.is_empty()
        || payu_settings.merchant_salt.is_empty()
    {
        return Err(AppError::BadRequest("PayU is not configured".to_string()));
    }

    load_order(state, order_id).await?;

    let txnid = new_txn_id();
    let amount_str = payu::format_amount(amount);
    let product_info = payload
        .product_info
        .clone()
        .unwrap_or_else(|| "Order Payment".to_string());
    let hash = payu::forward_hash(
        &payu_settings.merchant_key,
        &txnid,
        &amount_str,
        &product_info,
        &first_name,
        &email,
        &payu_settings.merchant_salt,
    );

    let callback = format!("{}/api/payments/payu/callback", state.config.app_url);
    let form = PayuFormData {
        key: payu_settings.merchant_key.clone(),
        txnid: txnid.clone(),
        amount: amount_str,
        productinfo: product_info,
        firstname: first_name.clone(),
        lastname: customer.last_name.clone().unwrap_or_default(),
        email: email.clone(),
        phone: customer.phone.clone().unwrap_or_default(),
        surl: payload.surl.clone().unwrap_or_else(|| callback.clone()),
        furl: payload.furl.clone().unwrap_or(callback),
        hash,
        payu_url: if payu_settings.test_mode {
            payu::PAYU_URL_TEST.to_string()
        } else {
            payu::PAYU_URL_LIVE.to_string()
        },
    };

    let payment_ref = new_payment_ref();
    let history = vec![PaymentStatusEntry::new(PaymentStatus::Pending, None)];
    payments::ActiveModel {
        id: Set(Uuid::new_v4()),
        payment_ref: Set(payment_ref.clone()),
        order_id: Set(order_id),
        provider: Set(PaymentProvider::Payu.as_str().to_string()),
        amount: Set(amount),
        currency: Set("INR".to_string()),
        amount_refunded: Set(0),
        provider_payment_id: Set(None),
        provider_order_id: Set(Some(txnid.clone())),
        provider_signature: Set(None),
        status: Set(PaymentStatus::Pending.as_str().to_string()),
        status_history: Set(to_json(&history)?),
        payment_method: Set(None),
        refunds: Set(json!([])),
        webhook_events: Set(json!([])),
        customer_email: Set(email),
        customer_phone: Set(customer.phone.unwrap_or_default()),
        customer_name: Set(format!(
            "{first_name} {}",
            customer.last_name.unwrap_or_default()
        )
        .trim()
        .to_string()),
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

    tracing::info!(%payment_ref, %txnid, "payu session created");

    Ok(ApiResponse::success(
        "PayU order created",
        PayuOrderResponse {
            payu_data: form,
            payment_ref,
            order_id,
        },
        Some(Meta::empty()),
    ))
}

/// GET on the callback means the gateway's form POST never arrived; there
/// is no body to verify, so the shopper goes straight to the failure page.
pub fn payu_invalid_method_redirect(base: &str, txnid: Option<&str>) -> String {
    match txnid {
        Some(txnid) if !txnid.is_empty() => {
            format!("{base}/payment/failure/{txnid}?error=invalid_method")
        }
        _ => format!("{base}/payment/failure/unknown"),
    }
}

/// PayU posts the result to this callback; the response is a redirect to
/// the storefront result page. Fixed error codes avoid URL-encoding
/// free-text gateway messages.
pub async fn handle_payu_callback(state: &AppState, form: PayuCallback) -> AppResult<String> {
    let base = &state.config.app_url;
    let txnid = form.txnid.clone().unwrap_or_else(|| "unknown".to_string());

    let settings = settings_service::load_settings(&state.orm).await?;
    let payu_settings = &settings.payu;
    if payu_settings.merchant_key.is_empty() || payu_settings.merchant_salt.is_empty() {
        tracing::error!(%txnid, "payu callback received but gateway unconfigured");
        return Ok(format!("{base}/payment/failure/{txnid}?error=not_configured"));
    }

    let Some(model) = find_payment_by_provider_order(state, &txnid).await? else {
        tracing::warn!(%txnid, "payu callback for unknown transaction");
        return Ok(format!("{base}/payment/failure/{txnid}?error=unknown_transaction"));
    };
    let payment = payment_from_entity(model.clone());

    let status = form.status.clone().unwrap_or_default();
    let expected = payu::reverse_hash(
        &payu_settings.merchant_salt,
        &status,
        form.email.as_deref().unwrap_or(""),
        form.firstname.as_deref().unwrap_or(""),
        form.productinfo.as_deref().unwrap_or(""),
        form.amount.as_deref().unwrap_or(""),
        &txnid,
        &payu_settings.merchant_key,
    );
    let hash_ok = form.hash.as_deref() == Some(expected.as_str());

    if status == "success" && hash_ok {
        let mut history = payment.status_history.clone();
        history.push(PaymentStatusEntry::new(PaymentStatus::Captured, None));
        let method = PaymentMethodInfo {
            kind: form.mode.clone(),
            bank_code: form.bankcode.clone(),
            ..Default::default()
        };
        let mut active: payments::ActiveModel = model.into();
        active.status = Set(PaymentStatus::Captured.as_str().to_string());
        active.status_history = Set(to_json(&history)?);
        active.provider_payment_id = Set(form.mihpayid.clone());
        active.payment_method = Set(Some(to_json(&method)?));
        active.captured_at = Set(Some(Utc::now().into()));
        active.updated_at = Set(Utc::now().into());
        active.update(&state.orm).await?;

        let transaction_id = form.mihpayid.unwrap_or_else(|| txnid.clone());
        mark_order_paid(state, payment.order_id, "payu", &transaction_id).await?;

        tracing::info!(%txnid, "payu payment captured");
        return Ok(format!("{base}/payment/success/{txnid}"));
    }

    let (reason, code) = if !hash_ok {
        ("Hash verification failed", "hash_mismatch")
    } else {
        (
            form.error_message.as_deref().unwrap_or("Payment failed"),
            "payment_failed",
        )
    };

    let mut history = payment.status_history.clone();
    history.push(PaymentStatusEntry::new(PaymentStatus::Failed, Some(reason)));
    let mut active: payments::ActiveModel = model.into();
    active.status = Set(PaymentStatus::Failed.as_str().to_string());
    active.status_history = Set(to_json(&history)?);
    active.error_message = Set(Some(reason.to_string()));
    active.failed_at = Set(Some(Utc::now().into()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    mark_order_payment_failed(state, payment.order_id, reason).await?;

    tracing::warn!(%txnid, reason, "payu payment failed");
    Ok(format!("{base}/payment/failure/{txnid}?error={code}"))
}

// ---------------------------------------------------------------------------
// Razorpay webhooks.
// ---------------------------------------------------------------------------

pub async fn handle_razorpay_webhook(
    state: &AppState,
    signature: Option<&str>,
    body: &[u8],
) -> AppResult<ApiResponse<Value>> {
    let signature =
        signature.ok_or_else(|| AppError::BadRequest("Missing webhook signature".to_string()))?;

    let settings = settings_service::load_settings(&state.orm).await?;
    let secret = &settings.razorpay.webhook_secret;
    if secret.is_empty() {
        // The source system processed unsigned deliveries when no secret was
        // configured; keep that behavior but make it loud.
        tracing::warn!("razorpay webhook secret not configured, skipping verification");
    } else if !razorpay::verify_webhook_signature(secret, body, signature) {
        return Err(AppError::BadRequest(
            "Invalid webhook signature".to_string(),
        ));
    }

    let event: Value = serde_json::from_slice(body)
        .map_err(|_| AppError::BadRequest("Malformed webhook payload".to_string()))?;
    let event_type = event
        .get("event")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let event_id = event
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    match event_type.as_str() {
        "payment.captured" => {
            apply_payment_captured(state, &event, &event_type, &event_id).await?;
        }
        "payment.failed" => {
            apply_payment_failed(state, &event, &event_type, &event_id).await?;
        }
        "refund.processed" => {
            apply_refund_processed(state, &event, &event_type, &event_id).await?;
        }
        other => {
            tracing::debug!(event = other, "unhandled razorpay webhook event");
        }
    }

    Ok(ApiResponse::success(
        "Webhook processed",
        json!({ "event": event_type }),
        Some(Meta::empty()),
    ))
}

fn payment_entity<'a>(event: &'a Value) -> Option<&'a Value> {
    event.pointer("/payload/payment/entity")
}

async fn apply_payment_captured(
    state: &AppState,
    event: &Value,
    event_type: &str,
    event_id: &str,
) -> AppResult<()> {
    let Some(entity) = payment_entity(event) else {
        return Ok(());
    };
    let Some(provider_order_id) = entity.get("order_id").and_then(Value::as_str) else {
        return Ok(());
    };
    let Some(model) = find_payment_by_provider_order(state, provider_order_id).await? else {
        tracing::warn!(provider_order_id, "webhook for unknown payment");
        return Ok(());
    };
    let payment = payment_from_entity(model.clone());

    if is_duplicate_event(&payment.webhook_events, event_id) {
        tracing::info!(event_id, "duplicate webhook delivery ignored");
        return Ok(());
    }

    let provider_payment_id = entity
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let method = PaymentMethodInfo {
        kind: entity.get("method").and_then(Value::as_str).map(str::to_string),
        card_network: entity
            .pointer("/card/network")
            .and_then(Value::as_str)
            .map(str::to_string),
        card_last4: entity
            .pointer("/card/last4")
            .and_then(Value::as_str)
            .map(str::to_string),
        bank_code: entity.get("bank").and_then(Value::as_str).map(str::to_string),
        bank_name: None,
        wallet_name: entity.get("wallet").and_then(Value::as_str).map(str::to_string),
        upi_id: entity.get("vpa").and_then(Value::as_str).map(str::to_string),
    };

    let mut history = payment.status_history.clone();
    history.push(PaymentStatusEntry::new(PaymentStatus::Captured, None));
    let mut events = payment.webhook_events.clone();
    events.push(WebhookEvent {
        event_type: event_type.to_string(),
        event_id: event_id.to_string(),
        received_at: Utc::now(),
        payload: event.clone(),
    });

    let mut active: payments::ActiveModel = model.into();
    active.status = Set(PaymentStatus::Captured.as_str().to_string());
    active.status_history = Set(to_json(&history)?);
    active.webhook_events = Set(to_json(&events)?);
    active.provider_payment_id = Set(Some(provider_payment_id.clone()));
    active.payment_method = Set(Some(to_json(&method)?));
    active.captured_at = Set(Some(Utc::now().into()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    mark_order_paid(state, payment.order_id, "razorpay", &provider_payment_id).await?;
    tracing::info!(event_id, provider_order_id, "payment captured via webhook");
    Ok(())
}

async fn apply_payment_failed(
    state: &AppState,
    event: &Value,
    event_type: &str,
    event_id: &str,
) -> AppResult<()> {
    let Some(entity) = payment_entity(event) else {
        return Ok(());
    };
    let Some(provider_order_id) = entity.get("order_id").and_then(Value::as_str) else {
        return Ok(());
    };
    let Some(model) = find_payment_by_provider_order(state, provider_order_id).await? else {
        return Ok(());
    };
    let payment = payment_from_entity(model.clone());

    if is_duplicate_event(&payment.webhook_events, event_id) {
        return Ok(());
    }

    let error_code = entity
        .get("error_code")
        .and_then(Value::as_str)
        .map(str::to_string);
    let error_message = entity
        .get("error_description")
        .and_then(Value::as_str)
        .unwrap_or("Payment failed")
        .to_string();

    let mut history = payment.status_history.clone();
    history.push(PaymentStatusEntry::new(
        PaymentStatus::Failed,
        Some(&error_message),
    ));
    let mut events = payment.webhook_events.clone();
    events.push(WebhookEvent {
        event_type: event_type.to_string(),
        event_id: event_id.to_string(),
        received_at: Utc::now(),
        payload: event.clone(),
    });

    let mut active: payments::ActiveModel = model.into();
    active.status = Set(PaymentStatus::Failed.as_str().to_string());
    active.status_history = Set(to_json(&history)?);
    active.webhook_events = Set(to_json(&events)?);
    active.error_code = Set(error_code);
    active.error_message = Set(Some(error_message.clone()));
    active.failed_at = Set(Some(Utc::now().into()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    mark_order_payment_failed(state, payment.order_id, &error_message).await?;
    tracing::warn!(event_id, provider_order_id, "payment failed via webhook");
    Ok(())
}

async fn apply_refund_processed(
    state: &AppState,
    event: &Value,
    event_type: &str,
    event_id: &str,
) -> AppResult<()> {
    let Some(entity) = event.pointer("/payload/refund/entity") else {
        return Ok(());
    };
    let Some(provider_payment_id) = entity.get("payment_id").and_then(Value::as_str) else {
        return Ok(());
    };
    let Some(model) = find_payment_by_provider_payment(state, provider_payment_id).await? else {
        tracing::warn!(provider_payment_id, "refund webhook for unknown payment");
        return Ok(());
    };
    let payment = payment_from_entity(model.clone());

    if is_duplicate_event(&payment.webhook_events, event_id) {
        return Ok(());
    }

    let refund_amount = entity.get("amount").and_then(Value::as_i64).unwrap_or(0);
    let total_refunded = payment.amount_refunded + refund_amount;
    let status = refund_status(payment.amount, total_refunded);

    let mut refunds = payment.refunds.clone();
    refunds.push(RefundEntry {
        refund_id: entity
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        amount: refund_amount,
        status: "processed".to_string(),
        reason: entity
            .pointer("/notes/reason")
            .and_then(Value::as_str)
            .unwrap_or("requested_by_customer")
            .to_string(),
        created_at: Utc::now(),
        processed_at: Some(Utc::now()),
    });
    let mut history = payment.status_history.clone();
    history.push(PaymentStatusEntry::new(status, Some("refund processed")));
    let mut events = payment.webhook_events.clone();
    events.push(WebhookEvent {
        event_type: event_type.to_string(),
        event_id: event_id.to_string(),
        received_at: Utc::now(),
        payload: event.clone(),
    });

    let mut active: payments::ActiveModel = model.into();
    active.status = Set(status.as_str().to_string());
    active.amount_refunded = Set(total_refunded);
    active.refunds = Set(to_json(&refunds)?);
    active.status_history = Set(to_json(&history)?);
    active.webhook_events = Set(to_json(&events)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    mark_order_refunded(
        state,
        payment.order_id,
        status == PaymentStatus::Refunded,
    )
    .await?;
    tracing::info!(event_id, provider_payment_id, refund_amount, "refund applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str) -> WebhookEvent {
        WebhookEvent {
            event_type: "payment.captured".to_string(),
            event_id: id.to_string(),
            received_at: Utc::now(),
            payload: json!({}),
        }
    }

    #[test]
    fn duplicate_event_detection() {
        let events = vec![event("evt_1"), event("evt_2")];
        assert!(is_duplicate_event(&events, "evt_1"));
        assert!(!is_duplicate_event(&events, "evt_3"));
    }

    #[test]
    fn empty_event_id_is_never_a_duplicate() {
        let events = vec![event("")];
        assert!(!is_duplicate_event(&events, ""));
    }

    #[test]
    fn get_on_payu_callback_redirects_to_failure_page() {
        assert_eq!(
            payu_invalid_method_redirect("https://shop.example", Some("TXN-1")),
            "https://shop.example/payment/failure/TXN-1?error=invalid_method"
        );
        assert_eq!(
            payu_invalid_method_redirect("https://shop.example", None),
            "https://shop.example/payment/failure/unknown"
        );
        assert_eq!(
            payu_invalid_method_redirect("https://shop.example", Some("")),
            "https://shop.example/payment/failure/unknown"
        );
    }

    #[test]
    fn refund_ref_formats() {
        let p = new_payment_ref();
        assert!(p.starts_with("PAY-"));
        let t = new_txn_id();
        assert!(t.starts_with("TXN-"));
    }
}
