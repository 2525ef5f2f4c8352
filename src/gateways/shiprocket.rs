//! Shiprocket HTTP adapter: authenticated client with a shared cached
//! bearer token, plus the carrier-status lookup table.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{ShipmentStatus, ShiprocketSettings},
};

const BASE_URL: &str = "https://apiv2.shiprocket.in/v1/external";

/// Shiprocket tokens are valid for 10 days; refresh a day early.
const TOKEN_TTL_DAYS: i64 = 9;

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct ShiprocketClient {
    http: reqwest::Client,
    email: String,
    password: String,
    cache: Arc<Mutex<Option<CachedToken>>>,
}

impl ShiprocketClient {
    pub fn new(
        http: reqwest::Client,
        settings: &ShiprocketSettings,
        cache: Arc<Mutex<Option<CachedToken>>>,
    ) -> Self {
        Self {
            http,
            email: settings.email.clone(),
            password: settings.password.clone(),
            cache,
        }
    }

    async fn authenticate(&self) -> AppResult<String> {
        {
            let cache = self.cache.lock().await;
            if let Some(cached) = cache.as_ref() {
                if Utc::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        let response = self
            .http
            .post(format!("{BASE_URL}/auth/login"))
            .json(&json!({ "email": self.email, "password": self.password }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("shiprocket login failed: {e}")))?;

        if !response.status().is_success() {
            let detail = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "Shiprocket authentication failed".to_string());
            return Err(AppError::Upstream(detail));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Upstream(format!("shiprocket login decode failed: {e}")))?;
        let token = body
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Upstream("Shiprocket login returned no token".to_string()))?
            .to_string();

        let mut cache = self.cache.lock().await;
        *cache = Some(CachedToken {
            token: token.clone(),
            expires_at: Utc::now() + Duration::days(TOKEN_TTL_DAYS),
        });

        Ok(token)
    }

    async fn request(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> AppResult<Value> {
        let token = self.authenticate().await?;

        let mut builder = self
            .http
            .request(method, format!("{BASE_URL}{endpoint}"))
            .bearer_auth(token);
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("shiprocket request failed: {e}")))?;

        let status = response.status();
        let data = response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Upstream(format!("shiprocket response decode failed: {e}")))?;

        if !status.is_success() {
            let detail = data
                .get("message")
                .or_else(|| data.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("Shiprocket API request failed");
            return Err(AppError::Upstream(detail.to_string()));
        }

        Ok(data)
    }

    pub async fn create_order(&self, order_data: Value) -> AppResult<Value> {
        self.request(reqwest::Method::POST, "/orders/create/adhoc", Some(order_data))
            .await
    }

    pub async fn assign_awb(&self, shipment_id: i64, courier_id: Option<i64>) -> AppResult<Value> {
        self.request(
            reqwest::Method::POST,
            "/courier/assign/awb",
            Some(json!({ "shipment_id": shipment_id, "courier_id": courier_id })),
        )
        .await
    }

    pub async fn track_awb(&self, awb: &str) -> AppResult<Value> {
        self.request(reqwest::Method::GET, &format!("/courier/track/awb/{awb}"), None)
            .await
    }

    pub async fn serviceability(
        &self,
        pickup_postcode: &str,
        delivery_postcode: &str,
        weight: f64,
        cod: bool,
    ) -> AppResult<Value> {
        let endpoint = format!(
            "/courier/serviceability?pickup_postcode={pickup_postcode}&delivery_postcode={delivery_postcode}&weight={weight}&cod={}",
            if cod { 1 } else { 0 }
        );
        self.request(reqwest::Method::GET, &endpoint, None).await
    }
}

/// Map the carrier's free-text status to the internal enum. Unknown strings
/// fall back to `pending`, which swallows statuses the table has never seen
/// (a known gap carried over from the source system).
pub fn map_carrier_status(carrier_status: &str) -> ShipmentStatus {
    match carrier_status.to_uppercase().as_str() {
        "PENDING" => ShipmentStatus::Pending,
        "NEW" => ShipmentStatus::Processing,
        "READY TO SHIP" => ShipmentStatus::ReadyToShip,
        "PICKUP SCHEDULED" => ShipmentStatus::ReadyToShip,
        "PICKED UP" => ShipmentStatus::PickedUp,
        "IN TRANSIT" => ShipmentStatus::InTransit,
        "OUT FOR DELIVERY" => ShipmentStatus::OutForDelivery,
        "DELIVERED" => ShipmentStatus::Delivered,
        "CANCELLED" => ShipmentStatus::Cancelled,
        "RTO INITIATED" => ShipmentStatus::Returned,
        "RTO DELIVERED" => ShipmentStatus::Returned,
        "UNDELIVERED" => ShipmentStatus::Failed,
        _ => ShipmentStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_map_to_internal_enum() {
        assert_eq!(
            map_carrier_status("OUT FOR DELIVERY"),
            ShipmentStatus::OutForDelivery
        );
        assert_eq!(map_carrier_status("picked up"), ShipmentStatus::PickedUp);
        assert_eq!(map_carrier_status("RTO INITIATED"), ShipmentStatus::Returned);
    }

    #[test]
    fn unknown_status_defaults_to_pending() {
        assert_eq!(map_carrier_status("CUSTOMS HOLD"), ShipmentStatus::Pending);
        assert_eq!(map_carrier_status(""), ShipmentStatus::Pending);
    }
}
