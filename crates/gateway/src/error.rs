use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use medflow_auth::AuthError;
use medflow_clinic::ClinicError;
use medflow_database::DatabaseError;
use medflow_payments::PaymentError;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

pub const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

/// Cause of a 500, attached to the response so the router can choose to reveal it.
#[derive(Debug, Clone)]
pub struct InternalCause(pub String);

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<BTreeMap<String, String>>,
    cause: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            cause: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn validation(details: BTreeMap<String, String>) -> Self {
        Self {
            details: Some(details),
            ..Self::bad_request("Validation failed")
        }
    }

    /// A 500 whose body says only [`INTERNAL_MESSAGE`]; `cause` is logged.
    pub fn internal(cause: impl Into<String>) -> Self {
        let cause = cause.into();
        error!(error = %cause, "internal error");
        Self {
            cause: Some(cause),
            ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
        }
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            details: self.details,
        });
        let mut response = (self.status, body).into_response();
        if let Some(cause) = self.cause {
            response.extensions_mut().insert(InternalCause(cause));
        }
        response
    }
}

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        match err {
            ClinicError::NotFound(_) => Self::not_found(err.to_string()),
            ClinicError::BadRequest(message) => Self::bad_request(message),
            ClinicError::Validation(details) => Self::validation(details),
            ClinicError::Conflict(message) => Self::new(StatusCode::CONFLICT, message),
            ClinicError::Forbidden => Self::forbidden(),
            ClinicError::Database(err) => err.into(),
            ClinicError::Auth(err) => err.into(),
            ClinicError::Payment(err) => err.into(),
            ClinicError::Email(_)
            | ClinicError::Storage(_)
            | ClinicError::Pdf(_)
            | ClinicError::Internal(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            AuthError::AccountDisabled => Self::unauthorized("Account is disabled"),
            AuthError::SessionNotFound | AuthError::SessionExpired | AuthError::InvalidSession => {
                Self::unauthorized("Unauthorized")
            }
            AuthError::Forbidden => Self::forbidden(),
            AuthError::Database(_) | AuthError::PasswordHash(_) => Self::internal(err.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotConfigured => {
                warn!("payment request while payments are not configured");
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Payments are not configured")
            }
            PaymentError::InvalidSignature | PaymentError::MalformedEvent(_) => {
                Self::bad_request("Invalid signature")
            }
            PaymentError::Http(_) | PaymentError::Provider { .. } => {
                error!(error = %err, "payment provider error");
                Self::new(StatusCode::BAD_GATEWAY, "Payment provider error")
            }
        }
    }
}
