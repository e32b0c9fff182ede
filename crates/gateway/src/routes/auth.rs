use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use medflow_auth::{AuthSession, Principal};
use medflow_clinic::models::{
    AcceptInviteRequest, AcceptInviteResponse, InviteRequest, OkResponse, PasswordResetConfirm,
    PasswordResetRequest, RegisterRequest, RegisterResponse,
};
use medflow_clinic::services::onboarding;
use medflow_database::Role;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::extract::ApiJson;
use crate::util::ADMIN;
use crate::{ApiError, AppState, Caller};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub clinic_id: String,
    pub clinic_name: String,
}

impl From<Principal> for SessionUser {
    fn from(principal: Principal) -> Self {
        Self {
            id: principal.user_id,
            email: principal.email,
            first_name: principal.first_name,
            last_name: principal.last_name,
            role: principal.role,
            clinic_id: principal.clinic_id.to_string(),
            clinic_name: principal.clinic_name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Bearer token for the `Authorization` header. Only returned on login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub expires_at: String,
    pub user: SessionUser,
}

impl SessionResponse {
    fn new(principal: Principal, session: AuthSession, include_token: bool) -> Self {
        Self {
            token: include_token.then_some(session.token),
            expires_at: session.expires_at.to_rfc3339(),
            user: principal.into(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Clinic and administrator created", body = RegisterResponse),
        (status = 400, description = "Missing fields or email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let response = onboarding::register(state.tenancy(), req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }
    let (principal, session) = state.authenticator().login(&req.email, &req.password).await?;
    Ok(Json(SessionResponse::new(principal, session, true)))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Session closed", body = OkResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<OkResponse>, ApiError> {
    let (principal, session) = state.session(&headers).await?;
    state.authenticator().logout(&session.token).await?;
    info!(user = %principal.user_id, "user logged out");
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current caller", body = SessionResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let (principal, session) = state.session(&headers).await?;
    Ok(Json(SessionResponse::new(principal, session, false)))
}

#[utoipa::path(
    post,
    path = "/api/auth/invite",
    tag = "Auth",
    security(("bearerAuth" = [])),
    request_body = InviteRequest,
    responses(
        (status = 200, description = "Invite stored and emailed", body = OkResponse),
        (status = 400, description = "Invalid email or role", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_invite(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<InviteRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let caller = caller.require(ADMIN)?;
    onboarding::create_invite(
        &caller.scope,
        &caller.principal,
        state.mailer().as_ref(),
        state.public_url(),
        req,
    )
    .await?;
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/auth/invite/accept",
    tag = "Auth",
    request_body = AcceptInviteRequest,
    responses(
        (status = 200, description = "Account created in the inviting clinic", body = AcceptInviteResponse),
        (status = 400, description = "Invalid or expired invite", body = crate::error::ErrorResponse)
    )
)]
pub async fn accept_invite(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AcceptInviteRequest>,
) -> Result<Json<AcceptInviteResponse>, ApiError> {
    Ok(Json(onboarding::accept_invite(state.tenancy(), req).await?))
}

#[utoipa::path(
    post,
    path = "/api/auth/password-reset/request",
    tag = "Auth",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Always succeeds; mail is sent when the account exists", body = OkResponse)
    )
)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PasswordResetRequest>,
) -> Json<OkResponse> {
    onboarding::request_password_reset(
        state.tenancy(),
        state.mailer().as_ref(),
        state.public_url(),
        req.email.as_deref(),
    )
    .await;
    Json(OkResponse::ok())
}

#[utoipa::path(
    post,
    path = "/api/auth/password-reset/confirm",
    tag = "Auth",
    request_body = PasswordResetConfirm,
    responses(
        (status = 200, description = "Password replaced", body = OkResponse),
        (status = 400, description = "Invalid or expired token", body = crate::error::ErrorResponse)
    )
)]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PasswordResetConfirm>,
) -> Result<Json<OkResponse>, ApiError> {
    onboarding::confirm_password_reset(state.tenancy(), req).await?;
    Ok(Json(OkResponse::ok()))
}
