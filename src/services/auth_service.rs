use argon2::{Argon2, PasswordHash, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use crate::{
    dto::auth::{Claims, LoginRequest, LoginResponse},
    error::{AppError, AppResult},
    middleware::auth::{ADMIN_COOKIE, AdminUser as AuthedAdmin},
    models::AdminUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

const SESSION_DAYS: i64 = 7;

fn issue_token(config_secret: &str, user: &AdminUser) -> AppResult<String> {
    let exp = (Utc::now() + Duration::days(SESSION_DAYS)).timestamp() as usize;
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

pub fn session_cookie(token: &str) -> String {
    let max_age = SESSION_DAYS * 24 * 60 * 60;
    format!("{ADMIN_COOKIE}={token}; HttpOnly; Path=/; Max-Age={max_age}; SameSite=Lax")
}

pub fn clear_session_cookie() -> String {
    format!("{ADMIN_COOKIE}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax")
}

/// Verify credentials and mint a session token. Wrong email and wrong
/// password are indistinguishable to the caller.
pub async fn login(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<(ApiResponse<LoginResponse>, String)> {
    let user = sqlx::query_as::<_, AdminUser>(
        "SELECT id, email, password_hash, name, role, created_at FROM admin_users WHERE email = $1",
    )
    .bind(&payload.email)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    let parsed = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("stored password hash is invalid")))?;
    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed)
        .map_err(|_| AppError::Unauthorized)?;

    let token = issue_token(&state.config.jwt_secret, &user)?;

    if let Err(err) = crate::audit::log_audit(
        &state.pool,
        Some(user.id),
        "admin_login",
        Some("admin_users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    tracing::info!(email = %user.email, "admin logged in");

    Ok((
        ApiResponse::success(
            "Logged in",
            LoginResponse {
                token: token.clone(),
            },
            Some(Meta::empty()),
        ),
        session_cookie(&token),
    ))
}

pub async fn me(state: &AppState, authed: &AuthedAdmin) -> AppResult<ApiResponse<AdminUser>> {
    let user = sqlx::query_as::<_, AdminUser>(
        "SELECT id, email, password_hash, name, role, created_at FROM admin_users WHERE id = $1",
    )
    .bind(authed.admin_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    Ok(ApiResponse::success("Me", user, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("abc");
        assert!(cookie.starts_with("admin_token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn clearing_cookie_expires_immediately() {
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
