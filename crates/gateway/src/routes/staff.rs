use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use medflow_clinic::models::{InviteRequest, OkResponse, StaffInviteResponse, UpdateStaffRequest};
use medflow_clinic::services::staff;
use medflow_database::User;

use crate::extract::ApiJson;
use crate::util::ADMIN;
use crate::{ApiError, AppState, Caller};

#[utoipa::path(
    get,
    path = "/api/staff",
    tag = "Staff",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Users of the clinic", body = Vec<User>),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_staff(caller: Caller) -> Result<Json<Vec<User>>, ApiError> {
    let caller = caller.require(ADMIN)?;
    Ok(Json(staff::list(&caller.scope).await?))
}

#[utoipa::path(
    post,
    path = "/api/staff",
    tag = "Staff",
    security(("bearerAuth" = [])),
    request_body = InviteRequest,
    responses(
        (status = 201, description = "Invitation sent", body = StaffInviteResponse),
        (status = 400, description = "Invalid email or role", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already belongs to this clinic", body = crate::error::ErrorResponse)
    )
)]
pub async fn invite_staff(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<InviteRequest>,
) -> Result<(StatusCode, Json<StaffInviteResponse>), ApiError> {
    let caller = caller.require(ADMIN)?;
    let response = staff::invite(
        &caller.scope,
        &caller.principal,
        state.mailer().as_ref(),
        state.public_url(),
        req,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/staff/{id}",
    tag = "Staff",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_staff(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let caller = caller.require(ADMIN)?;
    Ok(Json(staff::get(&caller.scope, &id).await?))
}

#[utoipa::path(
    put,
    path = "/api/staff/{id}",
    tag = "Staff",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateStaffRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_staff(
    caller: Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateStaffRequest>,
) -> Result<Json<User>, ApiError> {
    let caller = caller.require(ADMIN)?;
    Ok(Json(staff::update(&caller.scope, &id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/staff/{id}",
    tag = "Staff",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User removed", body = OkResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_staff(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    let caller = caller.require(ADMIN)?;
    staff::delete(&caller.scope, &id).await?;
    Ok(Json(OkResponse::ok()))
}
