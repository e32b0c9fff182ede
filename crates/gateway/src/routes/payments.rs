use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use medflow_clinic::models::{
    ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentRequest, PaymentIntentResponse,
};
use medflow_clinic::services::billing::{self, WebhookOutcome};
use tracing::{error, info, warn};

use crate::extract::ApiJson;
use crate::{ApiError, AppState, Caller};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[utoipa::path(
    post,
    path = "/api/payments",
    tag = "Payments",
    security(("bearerAuth" = [])),
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Payment intent created and a pending payment stored", body = PaymentIntentResponse),
        (status = 400, description = "invoiceId required", body = crate::error::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::error::ErrorResponse),
        (status = 502, description = "Payment provider error", body = crate::error::ErrorResponse),
        (status = 503, description = "Payments are not configured", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_payment(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<CreatePaymentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let response =
        billing::create_payment_intent(&caller.scope, state.payments().as_ref(), req).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/payments/confirm",
    tag = "Payments",
    security(("bearerAuth" = [])),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment completed and invoice paid", body = ConfirmPaymentResponse),
        (status = 404, description = "Payment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn confirm_payment(
    caller: Caller,
    ApiJson(req): ApiJson<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, ApiError> {
    Ok(Json(billing::confirm_payment(&caller.scope, req).await?))
}

/// Provider callback. Authenticated by the `Stripe-Signature` header over the raw body.
#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    tag = "Payments",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged", body = String),
        (status = 400, description = "Invalid signature", body = String),
        (status = 500, description = "Webhook handler error", body = String)
    )
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let event = match state.webhooks().verify(&body, signature) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "rejected webhook delivery");
            return (StatusCode::BAD_REQUEST, "Invalid signature").into_response();
        }
    };

    match billing::handle_webhook(state.tenancy(), &event).await {
        Ok(outcome) => {
            match &outcome {
                WebhookOutcome::Ignored => {
                    info!(event_type = %event.event_type, "webhook event ignored")
                }
                WebhookOutcome::UnknownIntent => {
                    warn!(event_type = %event.event_type, "webhook for unknown payment intent")
                }
                _ => info!(event_type = %event.event_type, ?outcome, "webhook event applied"),
            }
            (StatusCode::OK, "ok").into_response()
        }
        Err(err) => {
            error!(event_type = %event.event_type, error = %err, "webhook handler failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Webhook handler error").into_response()
        }
    }
}
