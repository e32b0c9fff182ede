use axum::{extract::Path, http::StatusCode, Json};
use medflow_clinic::models::{CreateInvoiceRequest, UpdateInvoiceRequest};
use medflow_clinic::services::invoices;
use medflow_database::Invoice;

use crate::extract::ApiJson;
use crate::util::{FRONT_DESK, STAFF};
use crate::{ApiError, Caller};

#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "Invoices",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Invoices with their payments", body = Vec<Invoice>)
    )
)]
pub async fn list_invoices(caller: Caller) -> Result<Json<Vec<Invoice>>, ApiError> {
    let caller = caller.require(STAFF)?;
    Ok(Json(invoices::list(&caller.scope).await?))
}

#[utoipa::path(
    post,
    path = "/api/invoices",
    tag = "Invoices",
    security(("bearerAuth" = [])),
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice numbered and totalled", body = Invoice),
        (status = 400, description = "Invalid payload or unknown patient", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_invoice(
    caller: Caller,
    ApiJson(req): ApiJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    let caller = caller.require(FRONT_DESK)?;
    let invoice = invoices::create(&caller.scope, req).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice", body = Invoice),
        (status = 404, description = "Invoice not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_invoice(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, ApiError> {
    let caller = caller.require(STAFF)?;
    Ok(Json(invoices::get(&caller.scope, &id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Invoice id")),
    request_body = UpdateInvoiceRequest,
    responses(
        (status = 200, description = "Updated invoice", body = Invoice),
        (status = 400, description = "Unknown status", body = crate::error::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_invoice(
    caller: Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateInvoiceRequest>,
) -> Result<Json<Invoice>, ApiError> {
    let caller = caller.require(FRONT_DESK)?;
    Ok(Json(invoices::update(&caller.scope, &id, req).await?))
}
