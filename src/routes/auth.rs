use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};

use crate::{
    dto::auth::{LoginRequest, LoginResponse},
    error::AppResult,
    middleware::auth::AdminUser as AuthedAdmin,
    models::AdminUser,
    response::{ApiResponse, Meta},
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Issues the session both ways: an httpOnly cookie for the admin console
/// and the raw token for API clients.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let (body, cookie) = auth_service::login(&state, payload).await?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(body),
    ))
}

#[utoipa::path(post, path = "/api/auth/logout", tag = "Auth")]
pub async fn logout() -> impl IntoResponse {
    let body: ApiResponse<serde_json::Value> = ApiResponse::success(
        "Logged out",
        serde_json::json!({}),
        Some(Meta::empty()),
    );
    (
        AppendHeaders([(header::SET_COOKIE, auth_service::clear_session_cookie())]),
        Json(body),
    )
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthedAdmin,
) -> AppResult<Json<ApiResponse<AdminUser>>> {
    Ok(Json(auth_service::me(&state, &user).await?))
}
