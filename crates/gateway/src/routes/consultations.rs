//! Consultation endpoints answer with a `{success, data, message?}` envelope.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use medflow_clinic::models::{CreateConsultationRequest, UpdateConsultationRequest};
use medflow_clinic::services::consultations::{self, ConsultationQuery};
use medflow_database::{Consultation, ConsultationDetail};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::extract::ApiJson;
use crate::util::{ADMIN, CLINICIANS, STAFF};
use crate::{ApiError, Caller};

#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    ConsultationList = Envelope<Vec<Consultation>>,
    ConsultationEnvelope = Envelope<Consultation>,
    ConsultationDetailEnvelope = Envelope<ConsultationDetail>
)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationParams {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/consultations",
    tag = "Consultations",
    security(("bearerAuth" = [])),
    params(ConsultationParams),
    responses(
        (status = 200, description = "Consultations, newest first", body = ConsultationList),
        (status = 400, description = "Unknown status filter", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_consultations(
    caller: Caller,
    Query(params): Query<ConsultationParams>,
) -> Result<Json<Envelope<Vec<Consultation>>>, ApiError> {
    let caller = caller.require(STAFF)?;
    let query = ConsultationQuery {
        patient_id: params.patient_id,
        doctor_id: params.doctor_id,
        status: params.status,
    };
    let consultations = consultations::list(&caller.scope, query).await?;
    Ok(Json(Envelope::data(consultations)))
}

#[utoipa::path(
    post,
    path = "/api/consultations",
    tag = "Consultations",
    security(("bearerAuth" = [])),
    request_body = CreateConsultationRequest,
    responses(
        (status = 201, description = "Consultation recorded", body = ConsultationEnvelope),
        (status = 400, description = "Invalid payload or appointment already has a consultation", body = crate::error::ErrorResponse),
        (status = 404, description = "Appointment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_consultation(
    caller: Caller,
    ApiJson(req): ApiJson<CreateConsultationRequest>,
) -> Result<(StatusCode, Json<Envelope<Consultation>>), ApiError> {
    let caller = caller.require(CLINICIANS)?;
    let consultation = consultations::create(&caller.scope, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::data(consultation).with_message("Consultation created successfully")),
    ))
}

#[utoipa::path(
    get,
    path = "/api/consultations/{id}",
    tag = "Consultations",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Consultation id")),
    responses(
        (status = 200, description = "Consultation with its prescriptions", body = ConsultationDetailEnvelope),
        (status = 404, description = "Consultation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_consultation(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Envelope<ConsultationDetail>>, ApiError> {
    Ok(Json(Envelope::data(consultations::get(&caller.scope, &id).await?)))
}

#[utoipa::path(
    patch,
    path = "/api/consultations/{id}",
    tag = "Consultations",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Consultation id")),
    request_body = UpdateConsultationRequest,
    responses(
        (status = 200, description = "Updated consultation", body = ConsultationEnvelope),
        (status = 404, description = "Consultation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_consultation(
    caller: Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateConsultationRequest>,
) -> Result<Json<Envelope<Consultation>>, ApiError> {
    let caller = caller.require(CLINICIANS)?;
    let consultation = consultations::update(&caller.scope, &id, req).await?;
    Ok(Json(
        Envelope::data(consultation).with_message("Consultation updated successfully"),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/consultations/{id}",
    tag = "Consultations",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Consultation id")),
    responses(
        (status = 200, description = "Consultation and its prescriptions removed", body = ConsultationEnvelope),
        (status = 404, description = "Consultation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_consultation(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let caller = caller.require(ADMIN)?;
    consultations::delete(&caller.scope, &id).await?;
    Ok(Json(Envelope {
        success: true,
        data: None,
        message: Some("Consultation deleted successfully".to_string()),
    }))
}
