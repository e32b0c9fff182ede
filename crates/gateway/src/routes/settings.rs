//! Profile and clinic settings. The clinic routes are served under both
//! `/api/settings/clinic` and `/api/clinic`.

use axum::Json;
use medflow_clinic::models::{UpdateClinicRequest, UpdateProfileRequest};
use medflow_clinic::services::settings;
use medflow_database::{Clinic, User};

use crate::extract::ApiJson;
use crate::util::{ADMIN, STAFF};
use crate::{ApiError, Caller};

#[utoipa::path(
    get,
    path = "/api/settings/profile",
    tag = "Settings",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Caller's own user record", body = User)
    )
)]
pub async fn get_profile(caller: Caller) -> Result<Json<User>, ApiError> {
    Ok(Json(settings::profile(&caller.scope, &caller.principal).await?))
}

#[utoipa::path(
    put,
    path = "/api/settings/profile",
    tag = "Settings",
    security(("bearerAuth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 400, description = "Invalid payload or wrong current password", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_profile(
    caller: Caller,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(
        settings::update_profile(&caller.scope, &caller.principal, req).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/settings/clinic",
    tag = "Settings",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Clinic of the caller", body = Clinic),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_clinic(caller: Caller) -> Result<Json<Clinic>, ApiError> {
    let caller = caller.require(STAFF)?;
    Ok(Json(settings::clinic(&caller.scope).await?))
}

#[utoipa::path(
    put,
    path = "/api/settings/clinic",
    tag = "Settings",
    security(("bearerAuth" = [])),
    request_body = UpdateClinicRequest,
    responses(
        (status = 200, description = "Updated clinic", body = Clinic),
        (status = 400, description = "Invalid payload", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_clinic(
    caller: Caller,
    ApiJson(req): ApiJson<UpdateClinicRequest>,
) -> Result<Json<Clinic>, ApiError> {
    let caller = caller.require(ADMIN)?;
    Ok(Json(settings::update_clinic(&caller.scope, req).await?))
}
