use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, EntityTrait};

use crate::{
    db::OrmConn,
    dto::admin::SettingsPayload,
    entity::store_settings::{ActiveModel as SettingsActive, Entity as SettingsRow},
    error::{AppError, AppResult},
    middleware::auth::{AdminUser, ensure_admin},
    models::{STORE_ID, StoreSettings, mask_secret},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Load the singleton settings row, falling back to defaults when the store
/// has never been configured.
pub async fn load_settings(orm: &OrmConn) -> AppResult<StoreSettings> {
    let row = SettingsRow::find_by_id(STORE_ID.to_string()).one(orm).await?;
    let Some(row) = row else {
        return Ok(StoreSettings::default());
    };
    Ok(StoreSettings {
        razorpay: serde_json::from_value(row.razorpay).unwrap_or_default(),
        payu: serde_json::from_value(row.payu).unwrap_or_default(),
        shiprocket: serde_json::from_value(row.shiprocket).unwrap_or_default(),
        cod: serde_json::from_value(row.cod).unwrap_or_default(),
        defaults: serde_json::from_value(row.defaults).unwrap_or_default(),
        pickup_address: serde_json::from_value(row.pickup_address).unwrap_or_default(),
    })
}

/// Settings as shown to the admin console: gateway secrets reduced to a
/// recognizable tail.
pub fn masked(settings: &StoreSettings) -> StoreSettings {
    let mut out = settings.clone();
    out.razorpay.key_secret = mask_secret(&out.razorpay.key_secret);
    out.razorpay.webhook_secret = mask_secret(&out.razorpay.webhook_secret);
    out.payu.merchant_salt = mask_secret(&out.payu.merchant_salt);
    out.shiprocket.password = mask_secret(&out.shiprocket.password);
    out
}

pub async fn get_settings(
    state: &AppState,
    user: &AdminUser,
) -> AppResult<ApiResponse<StoreSettings>> {
    ensure_admin(user)?;
    let settings = load_settings(&state.orm).await?;
    Ok(ApiResponse::success(
        "Settings",
        masked(&settings),
        Some(Meta::empty()),
    ))
}

pub async fn update_settings(
    state: &AppState,
    user: &AdminUser,
    payload: SettingsPayload,
) -> AppResult<ApiResponse<StoreSettings>> {
    ensure_admin(user)?;
    let mut settings = load_settings(&state.orm).await?;

    if let Some(razorpay) = payload.razorpay {
        settings.razorpay = razorpay;
    }
    if let Some(payu) = payload.payu {
        settings.payu = payu;
    }
    if let Some(shiprocket) = payload.shiprocket {
        settings.shiprocket = shiprocket;
    }
    if let Some(cod) = payload.cod {
        settings.cod = cod;
    }
    if let Some(defaults) = payload.defaults {
        settings.defaults = defaults;
    }
    if let Some(pickup_address) = payload.pickup_address {
        settings.pickup_address = pickup_address;
    }

    let active = SettingsActive {
        store_id: Set(STORE_ID.to_string()),
        razorpay: Set(json(&settings.razorpay)?),
        payu: Set(json(&settings.payu)?),
        shiprocket: Set(json(&settings.shiprocket)?),
        cod: Set(json(&settings.cod)?),
        defaults: Set(json(&settings.defaults)?),
        pickup_address: Set(json(&settings.pickup_address)?),
        updated_at: Set(Utc::now().into()),
    };

    let existing = SettingsRow::find_by_id(STORE_ID.to_string())
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        active.update(&state.orm).await?;
    } else {
        active.insert(&state.orm).await?;
    }

    if let Err(err) = crate::audit::log_audit(
        &state.pool,
        Some(user.admin_id),
        "settings_update",
        Some("store_settings"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Settings updated",
        masked(&settings),
        Some(Meta::empty()),
    ))
}

fn json<T: serde::Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoreSettings;

    #[test]
    fn masking_hides_all_gateway_secrets() {
        let mut settings = StoreSettings::default();
        settings.razorpay.key_id = "rzp_live_key".into();
        settings.razorpay.key_secret = "supersecretvalue".into();
        settings.razorpay.webhook_secret = "whsec_123456".into();
        settings.payu.merchant_salt = "saltsalt".into();
        settings.shiprocket.password = "hunter22".into();

        let masked = masked(&settings);
        assert_eq!(masked.razorpay.key_id, "rzp_live_key");
        assert_eq!(masked.razorpay.key_secret, "****alue");
        assert_eq!(masked.razorpay.webhook_secret, "****3456");
        assert_eq!(masked.payu.merchant_salt, "****salt");
        assert_eq!(masked.shiprocket.password, "****er22");
    }
}
