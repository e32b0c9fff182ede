use axum::{extract::Path, http::StatusCode, Json};
use medflow_clinic::models::{CreateAppointmentRequest, UpdateAppointmentRequest};
use medflow_clinic::services::appointments;
use medflow_database::Appointment;
use serde::Serialize;
use utoipa::ToSchema;

use crate::extract::ApiJson;
use crate::util::{BOOKERS, SCHEDULERS};
use crate::{ApiError, Caller};

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelledAppointment {
    pub ok: bool,
    pub appointment: Appointment,
}

#[utoipa::path(
    get,
    path = "/api/appointments",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Appointments, newest date first; patients see their own", body = Vec<Appointment>)
    )
)]
pub async fn list_appointments(caller: Caller) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(appointments::list(&caller.scope, &caller.principal).await?))
}

#[utoipa::path(
    post,
    path = "/api/appointments",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = Appointment),
        (status = 400, description = "Invalid payload or unknown patient, doctor or service", body = crate::error::ErrorResponse),
        (status = 409, description = "Overlaps another booking of the doctor", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_appointment(
    caller: Caller,
    ApiJson(req): ApiJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let caller = caller.require(BOOKERS)?;
    let appointment = appointments::create(&caller.scope, &caller.principal, req).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment", body = Appointment),
        (status = 404, description = "Appointment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_appointment(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(appointments::get(&caller.scope, &caller.principal, &id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/appointments/{id}",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Appointment id")),
    request_body = UpdateAppointmentRequest,
    responses(
        (status = 200, description = "Updated appointment", body = Appointment),
        (status = 404, description = "Appointment not found", body = crate::error::ErrorResponse),
        (status = 409, description = "The new slot overlaps another booking", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_appointment(
    caller: Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let caller = caller.require(SCHEDULERS)?;
    Ok(Json(appointments::update(&caller.scope, &id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/appointments/{id}",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment cancelled; the row is kept", body = CancelledAppointment),
        (status = 404, description = "Appointment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_appointment(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<CancelledAppointment>, ApiError> {
    let caller = caller.require(SCHEDULERS)?;
    let appointment = appointments::cancel(&caller.scope, &id).await?;
    Ok(Json(CancelledAppointment {
        ok: true,
        appointment,
    }))
}
