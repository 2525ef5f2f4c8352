use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError};

pub const ADMIN_COOKIE: &str = "admin_token";

#[derive(Debug, Clone)]
pub struct AdminUser {
    pub admin_id: Uuid,
    pub role: String,
}

pub fn ensure_role(user: &AdminUser, role: &str) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AdminUser) -> Result<(), AppError> {
    ensure_role(user, "admin")
}

/// Pull the admin JWT from the `admin_token` cookie, falling back to a
/// standard `Authorization: Bearer` header.
fn extract_token(parts: &axum::http::request::Parts) -> Option<String> {
    if let Some(cookie_header) = parts
        .headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
    {
        for pair in cookie_header.split(';') {
            let pair = pair.trim();
            if let Some(value) = pair.strip_prefix(&format!("{ADMIN_COOKIE}=")) {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    let auth_str = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;
    auth_str
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts).ok_or(AppError::Unauthorized)?;

        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized)?;

        let admin_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::Unauthorized)?;

        Ok(AdminUser {
            admin_id,
            role: decoded.claims.role.clone(),
        })
    }
}
