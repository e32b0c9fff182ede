//! Read-only views for signed-in patients.

use axum::Json;
use medflow_clinic::services::portal;
use medflow_database::{Appointment, Invoice, Prescription};

use crate::util::PATIENTS;
use crate::{ApiError, Caller};

#[utoipa::path(
    get,
    path = "/api/portal/appointments",
    tag = "Portal",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "The patient's appointments", body = Vec<Appointment>),
        (status = 403, description = "Patients only", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_appointments(caller: Caller) -> Result<Json<Vec<Appointment>>, ApiError> {
    let caller = caller.require(PATIENTS)?;
    Ok(Json(portal::appointments(&caller.scope, &caller.principal).await?))
}

#[utoipa::path(
    get,
    path = "/api/portal/prescriptions",
    tag = "Portal",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "The patient's prescriptions", body = Vec<Prescription>)
    )
)]
pub async fn my_prescriptions(caller: Caller) -> Result<Json<Vec<Prescription>>, ApiError> {
    let caller = caller.require(PATIENTS)?;
    Ok(Json(portal::prescriptions(&caller.scope, &caller.principal).await?))
}

#[utoipa::path(
    get,
    path = "/api/portal/invoices",
    tag = "Portal",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "The patient's invoices", body = Vec<Invoice>)
    )
)]
pub async fn my_invoices(caller: Caller) -> Result<Json<Vec<Invoice>>, ApiError> {
    let caller = caller.require(PATIENTS)?;
    Ok(Json(portal::invoices(&caller.scope, &caller.principal).await?))
}
