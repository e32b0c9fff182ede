use axum::{extract::Path, http::StatusCode, Json};
use medflow_clinic::models::{CreatePatientRequest, OkResponse, UpdatePatientRequest};
use medflow_clinic::services::patients;
use medflow_database::Patient;

use crate::extract::ApiJson;
use crate::util::{FRONT_DESK, STAFF};
use crate::{ApiError, Caller};

#[utoipa::path(
    get,
    path = "/api/patients",
    tag = "Patients",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Patients of the caller's clinic", body = Vec<Patient>),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_patients(caller: Caller) -> Result<Json<Vec<Patient>>, ApiError> {
    let caller = caller.require(STAFF)?;
    Ok(Json(patients::list(&caller.scope).await?))
}

#[utoipa::path(
    post,
    path = "/api/patients",
    tag = "Patients",
    security(("bearerAuth" = [])),
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient and login created", body = Patient),
        (status = 400, description = "Invalid payload or email in use", body = crate::error::ErrorResponse),
        (status = 403, description = "Front desk only", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_patient(
    caller: Caller,
    ApiJson(req): ApiJson<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let caller = caller.require(FRONT_DESK)?;
    let patient = patients::create(&caller.scope, req).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    tag = "Patients",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = Patient),
        (status = 404, description = "Patient not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_patient(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let caller = caller.require(STAFF)?;
    Ok(Json(patients::get(&caller.scope, &id).await?))
}

#[utoipa::path(
    put,
    path = "/api/patients/{id}",
    tag = "Patients",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Patient id")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Updated patient", body = Patient),
        (status = 400, description = "Invalid payload", body = crate::error::ErrorResponse),
        (status = 404, description = "Patient not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_patient(
    caller: Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePatientRequest>,
) -> Result<Json<Patient>, ApiError> {
    let caller = caller.require(FRONT_DESK)?;
    Ok(Json(patients::update(&caller.scope, &id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/patients/{id}",
    tag = "Patients",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient and login removed", body = OkResponse),
        (status = 404, description = "Patient not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_patient(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    let caller = caller.require(FRONT_DESK)?;
    patients::delete(&caller.scope, &id).await?;
    Ok(Json(OkResponse::ok()))
}
