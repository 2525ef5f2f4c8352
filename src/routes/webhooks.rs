//! Inbound webhook endpoints. These verify signatures over the raw body,
//! so handlers take `Bytes` rather than typed JSON extractors.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    entity::customers,
    error::{AppError, AppResult},
    gateways::clerk,
    response::{ApiResponse, Meta},
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/razorpay", post(razorpay_webhook))
        .route("/clerk", post(clerk_webhook))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Value>>> {
    let signature = header(&headers, "x-razorpay-signature");
    Ok(Json(
        payment_service::handle_razorpay_webhook(&state, signature, &body).await?,
    ))
}

/// Identity-provider user sync: keeps the customers table in step with
/// sign-ups, profile edits and deletions.
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Value>>> {
    let secret = std::env::var("CLERK_WEBHOOK_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("CLERK_WEBHOOK_SECRET is not set")))?;

    let (Some(msg_id), Some(timestamp), Some(signature)) = (
        header(&headers, "svix-id"),
        header(&headers, "svix-timestamp"),
        header(&headers, "svix-signature"),
    ) else {
        return Err(AppError::BadRequest(
            "Missing webhook signature headers".to_string(),
        ));
    };

    if !clerk::verify_signature(&secret, msg_id, timestamp, &body, signature) {
        return Err(AppError::BadRequest(
            "Invalid webhook signature".to_string(),
        ));
    }

    let event: Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Malformed webhook payload".to_string()))?;
    let event_type = event.get("type").and_then(Value::as_str).unwrap_or("");
    let data = event.get("data").cloned().unwrap_or(Value::Null);
    let external_id = data
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if external_id.is_empty() {
        return Err(AppError::BadRequest("Missing user id".to_string()));
    }

    match event_type {
        "user.created" | "user.updated" => {
            let email = data
                .pointer("/email_addresses/0/email_address")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let first_name = data
                .get("first_name")
                .and_then(Value::as_str)
                .map(str::to_string);
            let last_name = data
                .get("last_name")
                .and_then(Value::as_str)
                .map(str::to_string);

            let existing = customers::Entity::find()
                .filter(customers::Column::ExternalId.eq(external_id.clone()))
                .one(&state.orm)
                .await?;
            match existing {
                Some(row) => {
                    let mut active: customers::ActiveModel = row.into();
                    if !email.is_empty() {
                        active.email = Set(email);
                    }
                    active.first_name = Set(first_name);
                    active.last_name = Set(last_name);
                    active.updated_at = Set(Utc::now().into());
                    active.update(&state.orm).await?;
                }
                None => {
                    customers::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        external_id: Set(external_id.clone()),
                        email: Set(email),
                        first_name: Set(first_name),
                        last_name: Set(last_name),
                        created_at: NotSet,
                        updated_at: NotSet,
                    }
                    .insert(&state.orm)
                    .await?;
                }
            }
            tracing::info!(%external_id, event_type, "customer synced");
        }
        "user.deleted" => {
            if let Some(row) = customers::Entity::find()
                .filter(customers::Column::ExternalId.eq(external_id.clone()))
                .one(&state.orm)
                .await?
            {
                row.delete(&state.orm).await?;
            }
            tracing::info!(%external_id, "customer removed");
        }
        other => {
            tracing::debug!(event = other, "unhandled identity webhook event");
        }
    }

    Ok(Json(ApiResponse::success(
        "Webhook processed",
        json!({ "event": event_type }),
        Some(Meta::empty()),
    )))
}
