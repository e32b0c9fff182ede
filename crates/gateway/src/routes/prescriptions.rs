use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use medflow_clinic::models::{CreatePrescriptionRequest, OkResponse, UpdatePrescriptionRequest};
use medflow_clinic::services::prescriptions::{self, PrescriptionQuery, PDF_CONTENT_TYPE};
use medflow_database::Prescription;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::extract::ApiJson;
use crate::util::{CLINICIANS, STAFF};
use crate::{ApiError, AppState, Caller};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionParams {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/prescriptions",
    tag = "Prescriptions",
    security(("bearerAuth" = [])),
    params(PrescriptionParams),
    responses(
        (status = 200, description = "Prescriptions, newest first", body = Vec<Prescription>)
    )
)]
pub async fn list_prescriptions(
    caller: Caller,
    Query(params): Query<PrescriptionParams>,
) -> Result<Json<Vec<Prescription>>, ApiError> {
    let caller = caller.require(STAFF)?;
    let query = PrescriptionQuery {
        patient_id: params.patient_id,
        doctor_id: params.doctor_id,
    };
    Ok(Json(prescriptions::list(&caller.scope, query).await?))
}

#[utoipa::path(
    post,
    path = "/api/prescriptions",
    tag = "Prescriptions",
    security(("bearerAuth" = [])),
    request_body = CreatePrescriptionRequest,
    responses(
        (status = 201, description = "Prescription written; the PDF is attached when rendering succeeds", body = Prescription),
        (status = 400, description = "Invalid payload or unknown consultation, patient or doctor", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_prescription(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Prescription>), ApiError> {
    let caller = caller.require(CLINICIANS)?;
    let prescription =
        prescriptions::create(&caller.scope, &caller.principal, state.store().as_ref(), req).await?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

#[utoipa::path(
    get,
    path = "/api/prescriptions/{id}",
    tag = "Prescriptions",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Prescription id")),
    responses(
        (status = 200, description = "Prescription", body = Prescription),
        (status = 404, description = "Prescription not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_prescription(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Prescription>, ApiError> {
    Ok(Json(prescriptions::get(&caller.scope, &caller.principal, &id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/prescriptions/{id}",
    tag = "Prescriptions",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Prescription id")),
    request_body = UpdatePrescriptionRequest,
    responses(
        (status = 200, description = "Updated prescription", body = Prescription),
        (status = 404, description = "Prescription not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_prescription(
    caller: Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePrescriptionRequest>,
) -> Result<Json<Prescription>, ApiError> {
    let caller = caller.require(CLINICIANS)?;
    Ok(Json(prescriptions::update(&caller.scope, &id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/prescriptions/{id}",
    tag = "Prescriptions",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Prescription id")),
    responses(
        (status = 200, description = "Prescription removed", body = OkResponse),
        (status = 404, description = "Prescription not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_prescription(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    let caller = caller.require(CLINICIANS)?;
    prescriptions::delete(&caller.scope, &id).await?;
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    get,
    path = "/api/prescriptions/{id}/pdf",
    tag = "Prescriptions",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Prescription id")),
    responses(
        (status = 200, description = "Stored PDF", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Prescription or PDF not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn prescription_pdf(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let document =
        prescriptions::pdf(&caller.scope, &caller.principal, state.store().as_ref(), &id).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, PDF_CONTENT_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", document.filename),
        )
        .body(Body::from(document.body))
        .map_err(|err| ApiError::internal(err.to_string()))
}
