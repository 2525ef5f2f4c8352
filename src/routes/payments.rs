use axum::{
    Form, Json, Router,
    extract::{Query, State},
    response::Redirect,
    routing::post,
};
use serde::Deserialize;

use crate::{
    dto::payments::{
        CreatePayuOrderRequest, CreateRazorpayOrderRequest, PayuCallback, PayuOrderResponse,
        RazorpayOrderResponse, VerifyRazorpayRequest, VerifyRazorpayResponse,
    },
    error::AppResult,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/razorpay/create-order", post(create_razorpay_order))
        .route("/razorpay/verify", post(verify_razorpay))
        .route("/payu/create-order", post(create_payu_order))
        .route(
            "/payu/callback",
            post(payu_callback).get(payu_callback_get),
        )
}

#[utoipa::path(
    post,
    path = "/api/payments/razorpay/create-order",
    request_body = CreateRazorpayOrderRequest,
    responses(
        (status = 200, description = "Checkout session", body = ApiResponse<RazorpayOrderResponse>),
        (status = 400, description = "Gateway not configured or invalid input"),
        (status = 502, description = "Razorpay rejected the order"),
    ),
    tag = "Payments"
)]
pub async fn create_razorpay_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateRazorpayOrderRequest>,
) -> AppResult<Json<ApiResponse<RazorpayOrderResponse>>> {
    Ok(Json(
        payment_service::create_razorpay_order(&state, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/payments/razorpay/verify",
    request_body = VerifyRazorpayRequest,
    responses(
        (status = 200, description = "Payment captured", body = ApiResponse<VerifyRazorpayResponse>),
        (status = 400, description = "Signature mismatch"),
    ),
    tag = "Payments"
)]
pub async fn verify_razorpay(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRazorpayRequest>,
) -> AppResult<Json<ApiResponse<VerifyRazorpayResponse>>> {
    Ok(Json(
        payment_service::verify_razorpay_payment(&state, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/payments/payu/create-order",
    request_body = CreatePayuOrderRequest,
    responses((status = 200, description = "Hosted checkout form data", body = ApiResponse<PayuOrderResponse>)),
    tag = "Payments"
)]
pub async fn create_payu_order(
    State(state): State<AppState>,
    Json(payload): Json<CreatePayuOrderRequest>,
) -> AppResult<Json<ApiResponse<PayuOrderResponse>>> {
    Ok(Json(
        payment_service::create_payu_order(&state, payload).await?,
    ))
}

// PayU posts form data here and the shopper's browser follows the redirect,
// so this endpoint answers with a Location instead of a JSON envelope.
pub async fn payu_callback(
    State(state): State<AppState>,
    Form(form): Form<PayuCallback>,
) -> AppResult<Redirect> {
    let target = payment_service::handle_payu_callback(&state, form).await?;
    Ok(Redirect::to(&target))
}

#[derive(Debug, Deserialize)]
pub struct PayuCallbackQuery {
    pub txnid: Option<String>,
}

// Some browsers replay the callback as a GET after the gateway redirect
// chain; there is no form body to verify, so send the shopper to the
// failure page instead of answering 405.
pub async fn payu_callback_get(
    State(state): State<AppState>,
    Query(query): Query<PayuCallbackQuery>,
) -> Redirect {
    let target = payment_service::payu_invalid_method_redirect(
        &state.config.app_url,
        query.txnid.as_deref(),
    );
    Redirect::to(&target)
}
